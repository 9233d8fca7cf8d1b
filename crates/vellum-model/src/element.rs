//! Scene elements and their visual payloads.

use crate::geometry::{Color, Rect, Vec2};
use crate::id::ElementId;
use crate::interaction::ElementKind;

/// One drawable element of the document.
///
/// `local_rect` is the element's bounds in world coordinates before
/// rotation; `rotation` (radians, clockwise) applies about the rect
/// center. `z_index` is the element's position in document order — the
/// snapshot keeps elements sorted ascending by it.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneElement {
    pub id: ElementId,
    pub local_rect: Rect,
    pub rotation: f32,
    pub opacity: f32,
    pub z_index: u32,
    pub payload: VisualPayload,
}

impl SceneElement {
    /// True when this element is a pixel-space filter.
    #[inline]
    pub fn is_filter(&self) -> bool {
        matches!(self.payload, VisualPayload::Filter(_))
    }

    /// True when this element is a highlight mask region.
    #[inline]
    pub fn is_highlight(&self) -> bool {
        matches!(self.payload, VisualPayload::Highlight(_))
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.payload.kind()
    }
}

/// Closed variant over everything an element can look like.
///
/// Extending the document format means adding a variant here and a
/// matching arm in the compositor and the hit-tester; both match
/// exhaustively so the compiler flags every site.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualPayload {
    Rect(RectShape),
    Arrow(ArrowShape),
    Freehand(FreehandShape),
    Text(TextShape),
    Highlight(HighlightShape),
    Filter(FilterShape),
    SerialMarker(SerialMarkerShape),
}

impl VisualPayload {
    #[inline]
    pub fn kind(&self) -> ElementKind {
        match self {
            VisualPayload::Rect(_) => ElementKind::Rect,
            VisualPayload::Arrow(_) => ElementKind::Arrow,
            VisualPayload::Freehand(_) => ElementKind::Freehand,
            VisualPayload::Text(_) => ElementKind::Text,
            VisualPayload::Highlight(_) => ElementKind::Highlight,
            VisualPayload::Filter(_) => ElementKind::Filter,
            VisualPayload::SerialMarker(_) => ElementKind::SerialMarker,
        }
    }
}

/// Rectangle shape (optional fill, optional stroke).
#[derive(Debug, Clone, PartialEq)]
pub struct RectShape {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f32,
    pub corner_radius: f32,
}

/// Arrow head placement.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArrowHead {
    None,
    End,
    Both,
}

/// Arrow / line-like shape.
///
/// `points` are local to `local_rect.origin` and include interior
/// turning points; a plain line has exactly two.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowShape {
    pub points: Vec<Vec2>,
    pub width: f32,
    pub color: Color,
    pub head: ArrowHead,
}

/// Freehand pen stroke. Points are local to `local_rect.origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct FreehandShape {
    pub points: Vec<Vec2>,
    pub width: f32,
    pub color: Color,
}

/// Text box content. Layout happens in the engine at render/hit time.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    pub content: String,
    pub font_size: f32,
    pub color: Color,
}

/// Highlight mask region shape.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HighlightRegion {
    Rect,
    Ellipse,
}

/// A highlight cutout: the viewport is tinted and a transparent hole is
/// cut for each highlight region.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightShape {
    pub region: HighlightRegion,
    pub stroke_width: f32,
}

/// Pixel-space filter effect kinds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FilterKind {
    Blur,
    Grayscale,
    Invert,
    Mosaic,
}

/// A filter element: applies `kind` to everything accumulated below it
/// in z-order, clipped to the element's (possibly rotated) bounds.
///
/// `strength` is normalized to `[0, 1]`; its pixel meaning is
/// per-kind (blur radius, mosaic block size, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct FilterShape {
    pub kind: FilterKind,
    pub strength: f32,
}

/// Numbered marker optionally bound to a text element; the engine
/// derives a line connector between the two.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialMarkerShape {
    pub number: u32,
    pub bound_text: Option<ElementId>,
    pub color: Color,
}
