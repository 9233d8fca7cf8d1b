//! Pure geometry predicates used by hit-testing and the rasterizer.
//!
//! Everything here is a free function over value types: no element
//! knowledge, no allocation beyond the smoothing helper.

use crate::coords::{Rect, RotatedRect, Vec2};

/// Point inside a rect rotated about its center.
#[inline]
pub fn point_in_rotated_rect(p: Vec2, rect: Rect, rotation: f32) -> bool {
    RotatedRect::new(rect, rotation).contains(p)
}

/// Point inside the ellipse inscribed in a (rotated) rect.
pub fn point_in_ellipse(p: Vec2, rect: Rect, rotation: f32) -> bool {
    let rr = RotatedRect::new(rect, rotation);
    let half = rr.rect.size * 0.5;
    if half.x <= 0.0 || half.y <= 0.0 {
        return false;
    }
    let local = rr.to_local(p);
    let nx = local.x / half.x;
    let ny = local.y / half.y;
    nx * nx + ny * ny <= 1.0
}

/// Point on the stroke band of a (rotated) rect outline.
///
/// The band spans from `inner = rect deflated by stroke/2 + tolerance`
/// to `outer = rect inflated by stroke/2 + tolerance`: inside the outer
/// rect but not inside the inner one.
pub fn point_on_rect_stroke(
    p: Vec2,
    rect: Rect,
    rotation: f32,
    stroke_width: f32,
    tolerance: f32,
) -> bool {
    let half_band = stroke_width.max(0.0) * 0.5 + tolerance.max(0.0);
    let outer = RotatedRect::new(rect.inflated(half_band), rotation);
    if !outer.contains(p) {
        return false;
    }
    let inner_rect = rect.inflated(-half_band);
    if inner_rect.is_empty() {
        // Band swallows the whole rect: everything inside outer hits.
        return true;
    }
    !RotatedRect::new(inner_rect, rotation).contains(p)
}

/// Distance from `p` to the segment `a`–`b`.
pub fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// True when `p` lies within `tolerance` of any segment of the polyline.
pub fn point_near_polyline(p: Vec2, points: &[Vec2], tolerance: f32) -> bool {
    match points {
        [] => false,
        [only] => p.distance(*only) <= tolerance,
        _ => points
            .windows(2)
            .any(|w| segment_distance(p, w[0], w[1]) <= tolerance),
    }
}

/// One round of midpoint (Chaikin) smoothing.
///
/// Freehand strokes are hit-tested and rendered against the smoothed
/// path, so the tolerance band follows what the user actually sees.
/// Endpoints are preserved.
pub fn smooth_polyline(points: &[Vec2]) -> Vec<Vec2> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(points.len() * 2);
    out.push(points[0]);
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        out.push(a + (b - a) * 0.25);
        out.push(a + (b - a) * 0.75);
    }
    out.push(points[points.len() - 1]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── rotated rect / ellipse ────────────────────────────────────────────

    #[test]
    fn ellipse_contains_center_not_corner() {
        let r = Rect::new(0.0, 0.0, 20.0, 10.0);
        assert!(point_in_ellipse(Vec2::new(10.0, 5.0), r, 0.0));
        // Rect corner is outside the inscribed ellipse.
        assert!(!point_in_ellipse(Vec2::new(0.5, 0.5), r, 0.0));
    }

    #[test]
    fn stroke_band_excludes_fill_interior() {
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        // On the edge.
        assert!(point_on_rect_stroke(Vec2::new(0.0, 50.0), r, 0.0, 4.0, 1.0));
        // Deep inside.
        assert!(!point_on_rect_stroke(Vec2::new(50.0, 50.0), r, 0.0, 4.0, 1.0));
        // Just outside the outer inflation.
        assert!(!point_on_rect_stroke(Vec2::new(-4.0, 50.0), r, 0.0, 4.0, 1.0));
    }

    #[test]
    fn stroke_band_on_thin_rect_fills_it() {
        let r = Rect::new(0.0, 0.0, 3.0, 100.0);
        assert!(point_on_rect_stroke(Vec2::new(1.5, 50.0), r, 0.0, 4.0, 1.0));
    }

    // ── segments / polylines ──────────────────────────────────────────────

    #[test]
    fn segment_distance_projects_onto_segment() {
        let d = segment_distance(Vec2::new(5.0, 3.0), Vec2::zero(), Vec2::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-6);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let d = segment_distance(Vec2::new(-4.0, 3.0), Vec2::zero(), Vec2::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn polyline_band() {
        let pts = [Vec2::zero(), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        assert!(point_near_polyline(Vec2::new(5.0, 1.0), &pts, 2.0));
        assert!(point_near_polyline(Vec2::new(11.0, 5.0), &pts, 2.0));
        assert!(!point_near_polyline(Vec2::new(5.0, 5.0), &pts, 2.0));
    }

    #[test]
    fn degenerate_segment_is_a_point() {
        let d = segment_distance(Vec2::new(3.0, 4.0), Vec2::zero(), Vec2::zero());
        assert!((d - 5.0).abs() < 1e-6);
    }

    // ── smoothing ─────────────────────────────────────────────────────────

    #[test]
    fn smoothing_preserves_endpoints() {
        let pts = [Vec2::zero(), Vec2::new(10.0, 10.0), Vec2::new(20.0, 0.0)];
        let s = smooth_polyline(&pts);
        assert_eq!(*s.first().unwrap(), pts[0]);
        assert_eq!(*s.last().unwrap(), pts[2]);
        assert!(s.len() > pts.len());
    }

    #[test]
    fn smoothing_short_paths_is_identity() {
        let pts = [Vec2::zero(), Vec2::new(5.0, 5.0)];
        assert_eq!(smooth_polyline(&pts), pts.to_vec());
    }
}
