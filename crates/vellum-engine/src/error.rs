use std::fmt;

use vellum_model::{ElementId, ElementKind};

/// A hit-tester or renderer was dispatched against the wrong payload
/// variant.
///
/// This indicates a type-registration bug in the caller, not a data
/// condition; it is fatal for the call that raised it and must not be
/// swallowed.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadMismatch {
    pub id: ElementId,
    pub expected: ElementKind,
    pub actual: ElementKind,
}

impl fmt::Display for PayloadMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "payload mismatch on element {:?}: expected {:?}, got {:?}",
            self.id, self.expected, self.actual
        )
    }
}

impl std::error::Error for PayloadMismatch {}

/// Transient CPU rasterization failure (degenerate region, allocation
/// limit). Callers catch this per call and degrade to the next fallback
/// tier for the current frame only.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterError {
    pub message: String,
}

impl RasterError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "raster error: {}", self.message)
    }
}

impl std::error::Error for RasterError {}
