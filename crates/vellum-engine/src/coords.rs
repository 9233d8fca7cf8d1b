//! Engine-side coordinate types.
//!
//! `Vec2`/`Rect` come from the document model; this module adds the
//! rotated-rect math the compositor and hit-tester share, and the
//! viewport type renderers use as their NDC basis.

pub use vellum_model::{Rect, Vec2};

/// Viewport size in logical pixels.
///
/// Renderers treat this as the coordinate basis for converting logical
/// px positions to NDC in shaders; the CPU rasterizer multiplies by the
/// scale factor to get physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// A rectangle rotated about its center.
///
/// `rect` is the unrotated bounds; `rotation` is radians, clockwise.
/// Zero rotation makes every operation degrade to the plain `Rect`
/// equivalents.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct RotatedRect {
    pub rect: Rect,
    pub rotation: f32,
}

impl RotatedRect {
    #[inline]
    pub fn new(rect: Rect, rotation: f32) -> Self {
        Self { rect: rect.normalized(), rotation }
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.rect.center()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.rect.is_empty()
    }

    /// The four corners in screen space, clockwise from top-left.
    pub fn corners(self) -> [Vec2; 4] {
        let c = self.center();
        let half = self.rect.size * 0.5;
        let local = [
            Vec2::new(-half.x, -half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(half.x, half.y),
            Vec2::new(-half.x, half.y),
        ];
        local.map(|p| c + p.rotated(self.rotation))
    }

    /// Maps a world/screen point into the rect's unrotated local frame
    /// (origin at the rect center).
    #[inline]
    pub fn to_local(self, p: Vec2) -> Vec2 {
        (p - self.center()).rotated(-self.rotation)
    }

    /// Point containment, half-open like [`Rect::contains`].
    pub fn contains(self, p: Vec2) -> bool {
        let local = self.to_local(p);
        let half = self.rect.size * 0.5;
        local.x >= -half.x && local.x < half.x && local.y >= -half.y && local.y < half.y
    }

    /// Axis-aligned bounding box of the rotated corners.
    pub fn aabb(self) -> Rect {
        if self.rotation == 0.0 {
            return self.rect;
        }
        let corners = self.corners();
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn unrotated_contains_matches_rect() {
        let rr = RotatedRect::new(Rect::new(10.0, 10.0, 20.0, 10.0), 0.0);
        assert!(rr.contains(Vec2::new(10.0, 10.0)));
        assert!(rr.contains(Vec2::new(29.9, 19.9)));
        assert!(!rr.contains(Vec2::new(30.0, 20.0)));
    }

    #[test]
    fn quarter_turn_swaps_extents() {
        // 20×10 rect rotated 90° occupies 10×20 around the same center.
        let rr = RotatedRect::new(
            Rect::new(0.0, 0.0, 20.0, 10.0),
            std::f32::consts::FRAC_PI_2,
        );
        let bb = rr.aabb();
        assert!((bb.size.x - 10.0).abs() < EPS);
        assert!((bb.size.y - 20.0).abs() < EPS);

        // A point just past the unrotated right edge is now inside.
        assert!(rr.contains(Vec2::new(10.0, 12.0)));
        // A point near the unrotated right edge is now outside.
        assert!(!rr.contains(Vec2::new(19.0, 5.0)));
    }

    #[test]
    fn aabb_of_unrotated_is_rect() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(RotatedRect::new(r, 0.0).aabb(), r);
    }

    #[test]
    fn corners_rotate_about_center() {
        let rr = RotatedRect::new(Rect::new(0.0, 0.0, 10.0, 10.0), std::f32::consts::PI);
        let corners = rr.corners();
        // 180°: top-left corner lands at the bottom-right.
        assert!((corners[0].x - 10.0).abs() < EPS);
        assert!((corners[0].y - 10.0).abs() < EPS);
    }
}
