//! Vellum rendering engine.
//!
//! Renders a document of typed, ordered shape elements into a viewport
//! under an interactive camera, with pixel-space filter effects,
//! hover/selection overlays, and derived connector annotations.
//!
//! The engine consumes immutable state snapshots (see `vellum-model`)
//! and exposes two paint entry points — the persistent (static) pass and
//! the interactive (overlay) pass — plus a hit-test entry point and a
//! connector-cache invalidation entry point. It owns no window, surface,
//! or event loop.
//!
//! Structure, leaves first:
//! - [`coords`] / [`geom`] — rotated-rect math and pure hit primitives
//! - [`key`] — render keys; equality gates repaint
//! - [`split`] — static/dynamic layer partition
//! - [`dlist`] / [`compose`] — display list and filter-aware compositor
//! - [`raster`] — deterministic CPU rasterizer (also the fallback tier)
//! - [`render`] — GPU effect programs with load-once lifecycle
//! - [`connect`] — serial-marker ↔ text connector cache
//! - [`hit`] — pointer hit-testing and hover/cursor resolution
//! - [`passes`] — static/overlay pass orchestration

pub mod compose;
pub mod connect;
pub mod coords;
pub mod dlist;
pub mod geom;
pub mod hit;
pub mod key;
pub mod logging;
pub mod passes;
pub mod raster;
pub mod render;
pub mod split;
pub mod text;

mod error;

pub use error::{PayloadMismatch, RasterError};
