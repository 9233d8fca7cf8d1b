//! Display list: the compositor's intermediate representation.
//!
//! An ordered, replayable sequence of recorded draw operations in
//! *screen* coordinates (the camera is applied while composing).
//! Appending is O(1); wrapping the accumulated list into a filtered
//! layer is O(1) as well (the ops vec moves into the layer node), which
//! gives the "replay the running list inside a filter group" semantics
//! without copying.

use vellum_model::{Color, FilterKind, HighlightRegion};

use crate::coords::{Rect, RotatedRect, Vec2};

/// Rotated, optionally rounded rect with fill and/or stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeOp {
    pub rect: Rect,
    pub rotation: f32,
    pub corner_radius: f32,
    /// Transparent = no fill.
    pub fill: Color,
    /// Transparent or zero width = no stroke.
    pub stroke: Color,
    pub stroke_width: f32,
}

/// Stroked polyline (freehand strokes, arrow shafts, connectors).
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineOp {
    pub points: Vec<Vec2>,
    pub width: f32,
    pub color: Color,
}

/// A laid-out text run. `font_size` is already in screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOp {
    pub origin: Vec2,
    pub content: String,
    pub font_size: f32,
    pub color: Color,
    pub max_width: Option<f32>,
}

/// Grid lines across the viewport. `spacing`/`phase` are screen px.
#[derive(Debug, Clone, PartialEq)]
pub struct GridOp {
    pub spacing: f32,
    pub phase: Vec2,
    pub color: Color,
    pub line_width: f32,
}

/// One transparent hole of a highlight mask, pre-inflated by half its
/// stroke width at compose time.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskHole {
    pub rect: Rect,
    pub rotation: f32,
    pub region: HighlightRegion,
}

/// Full-viewport tint with transparent cutouts.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskOp {
    pub tint: Color,
    pub holes: Vec<MaskHole>,
}

/// A nested list whose accumulated pixels get a filter applied within
/// `clip`; content outside the clip replays untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredLayerOp {
    pub kind: FilterKind,
    /// Normalized `[0, 1]` effect strength.
    pub strength: f32,
    pub clip: RotatedRect,
    pub content: DisplayList,
}

/// One recorded draw operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Shape(ShapeOp),
    Polyline(PolylineOp),
    Text(TextOp),
    Grid(GridOp),
    Mask(MaskOp),
    FilteredLayer(FilteredLayerOp),
}

/// Recorded draw stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    ops: Vec<DrawOp>,
}

impl DisplayList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    /// Appends every op of `other`.
    pub fn extend(&mut self, other: DisplayList) {
        self.ops.extend(other.ops);
    }

    /// Wraps everything recorded so far into a filtered layer.
    ///
    /// After this call the list contains a single `FilteredLayer` op
    /// owning the previous content; later pushes accumulate on top of
    /// the filtered result, never inside it.
    pub fn wrap_in_filter(&mut self, kind: FilterKind, strength: f32, clip: RotatedRect) {
        let content = DisplayList { ops: std::mem::take(&mut self.ops) };
        self.ops.push(DrawOp::FilteredLayer(FilteredLayerOp {
            kind,
            strength,
            clip,
            content,
        }));
    }
}

/// Mosaic block edge in pixels for a given normalized strength and the
/// filtered region's shortest side.
///
/// Shared by the GPU uniform packing and the CPU downsample so both
/// paths agree on block boundaries. Clamped to `[2, 64]` px.
pub fn mosaic_block_size(strength: f32, shortest_side: f32) -> u32 {
    let strength = strength.clamp(0.0, 1.0);
    let raw = shortest_side.max(0.0) * strength / 12.0;
    (raw.round() as u32).clamp(2, 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(x: f32) -> DrawOp {
        DrawOp::Shape(ShapeOp {
            rect: Rect::new(x, 0.0, 1.0, 1.0),
            rotation: 0.0,
            corner_radius: 0.0,
            fill: Color::from_straight(1.0, 0.0, 0.0, 1.0),
            stroke: Color::transparent(),
            stroke_width: 0.0,
        })
    }

    // ── wrap_in_filter ────────────────────────────────────────────────────

    #[test]
    fn wrap_moves_prior_ops_into_layer() {
        let mut list = DisplayList::new();
        list.push(shape(0.0));
        list.push(shape(1.0));
        list.wrap_in_filter(
            FilterKind::Grayscale,
            1.0,
            RotatedRect::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0),
        );

        assert_eq!(list.len(), 1);
        let DrawOp::FilteredLayer(layer) = &list.ops()[0] else {
            panic!("expected filtered layer");
        };
        assert_eq!(layer.content.len(), 2);
    }

    #[test]
    fn ops_after_wrap_stay_outside_the_layer() {
        let mut list = DisplayList::new();
        list.push(shape(0.0));
        list.wrap_in_filter(
            FilterKind::Blur,
            0.5,
            RotatedRect::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0),
        );
        list.push(shape(1.0));

        assert_eq!(list.len(), 2);
        assert!(matches!(list.ops()[0], DrawOp::FilteredLayer(_)));
        assert!(matches!(list.ops()[1], DrawOp::Shape(_)));
    }

    #[test]
    fn nested_wraps_nest() {
        let mut list = DisplayList::new();
        list.push(shape(0.0));
        let clip = RotatedRect::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0);
        list.wrap_in_filter(FilterKind::Blur, 0.5, clip);
        list.push(shape(1.0));
        list.wrap_in_filter(FilterKind::Invert, 1.0, clip);

        assert_eq!(list.len(), 1);
        let DrawOp::FilteredLayer(outer) = &list.ops()[0] else {
            panic!("expected filtered layer");
        };
        assert_eq!(outer.kind, FilterKind::Invert);
        assert_eq!(outer.content.len(), 2);
    }

    // ── mosaic block size ─────────────────────────────────────────────────

    #[test]
    fn block_size_clamps_low_and_high() {
        assert_eq!(mosaic_block_size(0.0, 100.0), 2);
        assert_eq!(mosaic_block_size(1.0, 10_000.0), 64);
    }

    #[test]
    fn block_size_scales_with_strength() {
        let weak = mosaic_block_size(0.25, 240.0);
        let strong = mosaic_block_size(1.0, 240.0);
        assert!(strong > weak);
        assert_eq!(strong, 20);
    }
}
