//! Document contract for the vellum drawing surface.
//!
//! The rendering engine consumes immutable snapshots of these types each
//! frame and never mutates them. Ownership of the data — action dispatch,
//! undo/redo, validation — lives in an external store outside this
//! workspace.
//!
//! Canonical CPU space:
//! - World coordinates are logical pixels at zoom 1.0
//! - Origin top-left, +X right, +Y down
//! - Rotation is radians, clockwise, about an element's rect center

mod camera;
mod element;
mod geometry;
mod id;
mod interaction;
mod preview;
mod selection;
mod snapshot;
mod style;

pub use camera::Camera;
pub use element::{
    ArrowHead, ArrowShape, FilterKind, FilterShape, FreehandShape, HighlightRegion,
    HighlightShape, RectShape, SceneElement, SerialMarkerShape, TextShape, VisualPayload,
};
pub use geometry::{Color, Rect, Vec2};
pub use id::{DocVersion, ElementId};
pub use interaction::{ElementKind, InteractionState};
pub use preview::PreviewOverrides;
pub use selection::Selection;
pub use snapshot::DocumentSnapshot;
pub use style::{
    BoxSelectionStyle, GridStyle, HighlightMaskStyle, SelectionStyle, SnapStyle, StyleConfig,
};
