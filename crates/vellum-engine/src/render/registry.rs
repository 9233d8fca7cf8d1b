use super::ctx::RenderCtx;
use super::grid::GridProgram;
use super::mask::MaskProgram;
use super::mosaic::MosaicProgram;
use super::shape::ShapeProgram;
use super::texquad::TexQuadProgram;
use crate::key::GpuCaps;

/// Owns the effect programs and reports their readiness.
///
/// Readiness feeds the render keys through [`GpuCaps`], so a program
/// becoming ready (or failing) forces a repaint of passes that would
/// now take a different route.
#[derive(Default)]
pub struct ShaderResourceRegistry {
    pub grid: GridProgram,
    pub shape: ShapeProgram,
    pub mask: MaskProgram,
    pub mosaic: MosaicProgram,
    pub texquad: TexQuadProgram,
}

impl ShaderResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kicks off every program load. Idempotent; loads that already ran
    /// or are in flight are skipped per program.
    pub fn load_all(&mut self, ctx: &RenderCtx<'_>) {
        self.grid.load(ctx);
        self.shape.load(ctx);
        self.mask.load(ctx);
        self.mosaic.load(ctx);
        self.texquad.load(ctx);
    }

    /// Current capability snapshot for render-key derivation.
    ///
    /// The texquad blit carries text and CPU-filtered content, so every
    /// capability also requires it.
    pub fn capabilities(&self) -> GpuCaps {
        let blit = self.texquad.cell().is_ready();
        GpuCaps {
            grid: self.grid.cell().is_ready() && blit,
            shape: self.shape.cell().is_ready() && blit,
            mask: self.mask.cell().is_ready() && blit,
            mosaic: self.mosaic.cell().is_ready() && blit,
        }
    }
}
