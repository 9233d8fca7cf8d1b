//! Frame composition in two passes.
//!
//! The static pass owns everything below the layer split (grid plus
//! committed content); the overlay pass owns the split-and-above range
//! with previews, derived connector annotations, selection chrome, and
//! the box-selection marquee. Each pass re-derives its render key per
//! frame and paints only when the key changed.

mod base;
mod overlay;

pub use base::StaticPass;
pub use overlay::OverlayPass;

use std::sync::Arc;

use vellum_model::{
    Camera, DocumentSnapshot, ElementId, InteractionState, PreviewOverrides, Selection,
    StyleConfig,
};

use crate::coords::{Rect, Viewport};
use crate::dlist::DisplayList;
use crate::key::GpuCaps;
use crate::raster::{CpuRenderer, Pixmap};
use crate::render::{GpuRenderer, RenderCtx, RenderTarget};
use crate::text::FontSystem;

/// Per-frame inputs shared by both passes.
pub struct FrameInput<'a> {
    pub snapshot: &'a DocumentSnapshot,
    pub overrides: &'a PreviewOverrides,
    pub camera: Camera,
    pub viewport: Viewport,
    pub scale_factor: f32,
    pub style: &'a Arc<StyleConfig>,
    pub locale: Option<&'a str>,
    pub selection: &'a Selection,
    pub interaction: InteractionState,
    pub hover: Option<ElementId>,
    /// Marquee rect in screen space while box-selecting.
    pub box_selection: Option<Rect>,
    pub fonts: &'a FontSystem,
    pub gpu_caps: GpuCaps,
}

/// Where a pass paints: a CPU pixmap or a GPU target.
pub enum Surface<'a, 'b> {
    Cpu {
        pixmap: &'a mut Pixmap,
    },
    Gpu {
        ctx: &'a RenderCtx<'b>,
        target: &'a mut RenderTarget<'b>,
        renderer: &'a mut GpuRenderer,
    },
}

impl Surface<'_, '_> {
    fn replay(&mut self, list: &DisplayList, fonts: &FontSystem, scale_factor: f32) {
        match self {
            Surface::Cpu { pixmap } => {
                CpuRenderer::new(fonts, scale_factor).render(list, pixmap);
            }
            Surface::Gpu { ctx, target, renderer } => {
                renderer.render(ctx, target, list, fonts);
            }
        }
    }
}
