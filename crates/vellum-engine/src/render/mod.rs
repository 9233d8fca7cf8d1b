//! GPU effect programs and the display-list executor.
//!
//! Each effect is an independent program with its own pipeline and a
//! load-once lifecycle; a program that is not ready simply reports so
//! and the caller paints the CPU route instead. Nothing here blocks a
//! frame on shader compilation.

mod common;
mod ctx;
mod exec;
mod grid;
mod init;
mod mask;
mod mosaic;
mod program;
mod registry;
mod shape;
mod texquad;

pub use ctx::{RenderCtx, RenderTarget};
pub use exec::GpuRenderer;
pub use grid::GridProgram;
pub use init::{HeadlessGpu, OffscreenTarget};
pub use mask::{MaskProgram, MAX_MASK_REGIONS};
pub use mosaic::MosaicProgram;
pub use program::{ProgramCell, ProgramState};
pub use registry::ShaderResourceRegistry;
pub use shape::{ShapeInstance, ShapeProgram};
pub use texquad::TexQuadProgram;
