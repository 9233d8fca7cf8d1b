//! Deterministic CPU rasterizer.
//!
//! Executes a display list into an RGBA8 premultiplied [`Pixmap`]. This
//! is both the fallback tier for every GPU effect and the reference
//! implementation the pixel-level tests assert against: given the same
//! display list it always produces the same bytes.

mod exec;
mod filters;
mod pixmap;

pub use exec::CpuRenderer;
pub use filters::{apply_blur, apply_grayscale, apply_invert, apply_mosaic, blur_radius};
pub use pixmap::Pixmap;
