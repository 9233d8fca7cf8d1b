//! Render keys: value objects capturing exactly the inputs that affect
//! one layer's pixels.
//!
//! Equality gates repaint: two equal keys MUST imply pixel-identical
//! output. Building a key is the single place allowed to decide "does
//! this input affect my pixels" — omitting a field that does is a
//! correctness bug (a stale frame), not a performance one.
//!
//! Keys are compared structurally except for the shared immutable style
//! config, where `Arc` pointer identity is an intentional fast path:
//! the store publishes style changes by building a new `Arc`.

use std::sync::Arc;

use vellum_model::{
    Camera, DocVersion, ElementId, InteractionState, PreviewOverrides, SceneElement, Selection,
    StyleConfig,
};

use crate::coords::{Rect, Viewport};

/// Readiness of the GPU effect programs; a program flipping between
/// ready and fallback changes which code draws the pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct GpuCaps {
    pub grid: bool,
    pub shape: bool,
    pub mask: bool,
    pub mosaic: bool,
}

/// Value snapshot of the preview-override map, sorted by id so equality
/// is order-independent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewStamp(Vec<(ElementId, SceneElement)>);

impl PreviewStamp {
    pub fn of(overrides: &PreviewOverrides) -> Self {
        let mut entries: Vec<(ElementId, SceneElement)> =
            overrides.iter().map(|(id, el)| (*id, el.clone())).collect();
        entries.sort_by_key(|(id, _)| *id);
        Self(entries)
    }
}

/// Key for the persistent (static) pass.
#[derive(Debug, Clone)]
pub struct StaticPassKey {
    pub doc_version: DocVersion,
    pub camera: Camera,
    pub scale_factor: f32,
    pub viewport: Viewport,
    /// Layer-split boundary; elements below it belong to this pass.
    pub split: Option<usize>,
    pub previews: PreviewStamp,
    pub style: Arc<StyleConfig>,
    pub locale: Option<String>,
    pub gpu_caps: GpuCaps,
}

impl PartialEq for StaticPassKey {
    fn eq(&self, other: &Self) -> bool {
        self.doc_version == other.doc_version
            && self.camera == other.camera
            && self.scale_factor == other.scale_factor
            && self.viewport == other.viewport
            && self.split == other.split
            && self.previews == other.previews
            && Arc::ptr_eq(&self.style, &other.style)
            && self.locale == other.locale
            && self.gpu_caps == other.gpu_caps
    }
}

/// Key for the interactive (overlay) pass. Extends the static key's
/// inputs with everything only this pass draws: selection chrome,
/// hover, the interaction state, and the box-selection marquee.
#[derive(Debug, Clone)]
pub struct OverlayPassKey {
    pub doc_version: DocVersion,
    pub camera: Camera,
    pub scale_factor: f32,
    pub viewport: Viewport,
    pub split: Option<usize>,
    pub previews: PreviewStamp,
    pub style: Arc<StyleConfig>,
    pub locale: Option<String>,
    pub gpu_caps: GpuCaps,
    pub selection: Selection,
    pub hover: Option<ElementId>,
    pub interaction: InteractionState,
    pub box_selection: Option<Rect>,
}

impl PartialEq for OverlayPassKey {
    fn eq(&self, other: &Self) -> bool {
        self.doc_version == other.doc_version
            && self.camera == other.camera
            && self.scale_factor == other.scale_factor
            && self.viewport == other.viewport
            && self.split == other.split
            && self.previews == other.previews
            && Arc::ptr_eq(&self.style, &other.style)
            && self.locale == other.locale
            && self.gpu_caps == other.gpu_caps
            && self.selection == other.selection
            && self.hover == other.hover
            && self.interaction == other.interaction
            && self.box_selection == other.box_selection
    }
}

/// The repaint gate: repaint exactly when the key changed (or there is
/// no previous key).
#[inline]
pub fn should_repaint<K: PartialEq>(old: Option<&K>, new: &K) -> bool {
    old.is_none_or(|o| o != new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::Vec2;

    fn base_key(style: &Arc<StyleConfig>) -> StaticPassKey {
        StaticPassKey {
            doc_version: DocVersion(1),
            camera: Camera::default(),
            scale_factor: 1.0,
            viewport: Viewport::new(800.0, 600.0),
            split: None,
            previews: PreviewStamp::default(),
            style: style.clone(),
            locale: None,
            gpu_caps: GpuCaps::default(),
        }
    }

    // ── gate ──────────────────────────────────────────────────────────────

    #[test]
    fn first_frame_always_repaints() {
        let style = Arc::new(StyleConfig::default());
        assert!(should_repaint(None, &base_key(&style)));
    }

    #[test]
    fn equal_keys_skip_repaint() {
        let style = Arc::new(StyleConfig::default());
        let a = base_key(&style);
        let b = base_key(&style);
        assert!(!should_repaint(Some(&a), &b));
    }

    // ── each field is pixel-relevant ──────────────────────────────────────

    #[test]
    fn every_field_gates_repaint() {
        let style = Arc::new(StyleConfig::default());
        let old = base_key(&style);

        let mut k = base_key(&style);
        k.doc_version = DocVersion(2);
        assert!(should_repaint(Some(&old), &k), "doc version");

        let mut k = base_key(&style);
        k.camera = Camera::new(Vec2::new(10.0, 0.0), 1.0);
        assert!(should_repaint(Some(&old), &k), "camera pan");

        let mut k = base_key(&style);
        k.camera = Camera::new(Vec2::zero(), 2.0);
        assert!(should_repaint(Some(&old), &k), "camera zoom");

        let mut k = base_key(&style);
        k.scale_factor = 2.0;
        assert!(should_repaint(Some(&old), &k), "scale factor");

        let mut k = base_key(&style);
        k.split = Some(0);
        assert!(should_repaint(Some(&old), &k), "layer split");

        let mut k = base_key(&style);
        k.locale = Some("de-DE".into());
        assert!(should_repaint(Some(&old), &k), "locale");

        let mut k = base_key(&style);
        k.gpu_caps = GpuCaps { mosaic: true, ..GpuCaps::default() };
        assert!(should_repaint(Some(&old), &k), "gpu caps");
    }

    #[test]
    fn style_comparison_is_pointer_identity() {
        let style_a = Arc::new(StyleConfig::default());
        // Same field values, different allocation: treated as changed on
        // purpose — the store republishes style as a new Arc.
        let style_b = Arc::new(StyleConfig::default());
        let a = base_key(&style_a);
        let b = base_key(&style_b);
        assert!(should_repaint(Some(&a), &b));
    }

    #[test]
    fn preview_stamp_is_order_independent() {
        use vellum_model::{RectShape, VisualPayload};
        let el = |id: u64| SceneElement {
            id: ElementId(id),
            local_rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            rotation: 0.0,
            opacity: 1.0,
            z_index: id as u32,
            payload: VisualPayload::Rect(RectShape {
                fill: None,
                stroke: None,
                stroke_width: 0.0,
                corner_radius: 0.0,
            }),
        };

        let mut p1 = PreviewOverrides::new();
        p1.insert(el(1));
        p1.insert(el(2));
        let mut p2 = PreviewOverrides::new();
        p2.insert(el(2));
        p2.insert(el(1));
        assert_eq!(PreviewStamp::of(&p1), PreviewStamp::of(&p2));
    }
}
