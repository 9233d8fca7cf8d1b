//! Display-list execution on the CPU.

use vellum_model::FilterKind;

use crate::coords::{Rect, RotatedRect, Vec2};
use crate::dlist::{
    mosaic_block_size, DisplayList, DrawOp, FilteredLayerOp, GridOp, MaskOp, PolylineOp,
    ShapeOp, TextOp,
};
use crate::geom;
use crate::text::FontSystem;

use super::filters;
use super::pixmap::Pixmap;

/// Renders display lists into pixmaps.
///
/// `scale` converts logical screen pixels (the list's space) to the
/// pixmap's physical pixels.
pub struct CpuRenderer<'a> {
    fonts: &'a FontSystem,
    scale: f32,
}

impl<'a> CpuRenderer<'a> {
    pub fn new(fonts: &'a FontSystem, scale: f32) -> Self {
        Self { fonts, scale: scale.max(0.01) }
    }

    /// Executes `list` into `pixmap`, blending over existing content.
    pub fn render(&self, list: &DisplayList, pixmap: &mut Pixmap) {
        for op in list.ops() {
            match op {
                DrawOp::Shape(op) => self.draw_shape(pixmap, op),
                DrawOp::Polyline(op) => self.draw_polyline(pixmap, op),
                DrawOp::Text(op) => self.draw_text(pixmap, op),
                DrawOp::Grid(op) => self.draw_grid(pixmap, op),
                DrawOp::Mask(op) => self.draw_mask(pixmap, op),
                DrawOp::FilteredLayer(op) => self.draw_filtered_layer(pixmap, op),
            }
        }
    }

    fn scaled_rect(&self, r: Rect) -> Rect {
        Rect::from_origin_size(r.origin * self.scale, r.size * self.scale)
    }

    /// Integer pixel bounds of a physical-space rect, clamped to the pixmap.
    fn pixel_bounds(pixmap: &Pixmap, physical: Rect) -> (i64, i64, i64, i64) {
        let r = physical.normalized();
        let x0 = (r.min().x.floor() as i64).max(0);
        let y0 = (r.min().y.floor() as i64).max(0);
        let x1 = (r.max().x.ceil() as i64).min(pixmap.width() as i64);
        let y1 = (r.max().y.ceil() as i64).min(pixmap.height() as i64);
        (x0, y0, x1, y1)
    }

    // ── shapes ────────────────────────────────────────────────────────────

    fn draw_shape(&self, pixmap: &mut Pixmap, op: &ShapeOp) {
        let rect = self.scaled_rect(op.rect);
        let stroke_w = op.stroke_width * self.scale;
        let radius = op.corner_radius * self.scale;
        let has_fill = op.fill.a > 0.0;
        let has_stroke = op.stroke.a > 0.0 && stroke_w > 0.0;
        if !has_fill && !has_stroke {
            return;
        }

        let rr = RotatedRect::new(rect, op.rotation);
        let half = rr.rect.size * 0.5;
        let pad = if has_stroke { stroke_w * 0.5 } else { 0.0 };
        let (x0, y0, x1, y1) = Self::pixel_bounds(pixmap, rr.aabb().inflated(pad));

        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let local = rr.to_local(p);
                let d = rounded_rect_distance(local, half, radius);
                if has_stroke && d.abs() <= stroke_w * 0.5 {
                    pixmap.blend_pixel(x, y, op.stroke);
                } else if has_fill && d <= 0.0 {
                    pixmap.blend_pixel(x, y, op.fill);
                }
            }
        }
    }

    fn draw_polyline(&self, pixmap: &mut Pixmap, op: &PolylineOp) {
        if op.points.is_empty() || op.color.a <= 0.0 {
            return;
        }
        let pts: Vec<Vec2> = op.points.iter().map(|&p| p * self.scale).collect();
        let half_w = (op.width * self.scale * 0.5).max(0.5);

        let mut bb = Rect::from_origin_size(pts[0], Vec2::zero());
        for &p in &pts[1..] {
            bb = bb.union(Rect::from_origin_size(p, Vec2::zero()));
        }
        let (x0, y0, x1, y1) = Self::pixel_bounds(pixmap, bb.inflated(half_w + 1.0));

        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if geom::point_near_polyline(p, &pts, half_w) {
                    pixmap.blend_pixel(x, y, op.color);
                }
            }
        }
    }

    fn draw_text(&self, pixmap: &mut Pixmap, op: &TextOp) {
        if op.color.a <= 0.0 {
            return;
        }
        let glyphs = self.fonts.rasterize_run(
            &op.content,
            self.fonts.primary(),
            op.font_size * self.scale,
            op.max_width.map(|w| w * self.scale),
        );
        let origin = op.origin * self.scale;

        for glyph in glyphs {
            for gy in 0..glyph.height {
                for gx in 0..glyph.width {
                    let cov = glyph.coverage[gy * glyph.width + gx];
                    if cov == 0 {
                        continue;
                    }
                    let x = (origin.x + glyph.x) as i64 + gx as i64;
                    let y = (origin.y + glyph.y) as i64 + gy as i64;
                    pixmap.blend_pixel(x, y, op.color.scaled_alpha(cov as f32 / 255.0));
                }
            }
        }
    }

    fn draw_grid(&self, pixmap: &mut Pixmap, op: &GridOp) {
        if op.color.a <= 0.0 || op.spacing <= 0.0 {
            return;
        }
        let spacing = op.spacing * self.scale;
        let half_w = (op.line_width * self.scale * 0.5).max(0.5);
        let (w, h) = (pixmap.width() as i64, pixmap.height() as i64);

        let mut x = op.phase.x * self.scale;
        while x < w as f32 {
            let (c0, c1) = ((x - half_w).floor() as i64, (x + half_w).ceil() as i64);
            for px in c0.max(0)..c1.min(w) {
                for py in 0..h {
                    pixmap.blend_pixel(px, py, op.color);
                }
            }
            x += spacing;
        }
        let mut y = op.phase.y * self.scale;
        while y < h as f32 {
            let (r0, r1) = ((y - half_w).floor() as i64, (y + half_w).ceil() as i64);
            for py in r0.max(0)..r1.min(h) {
                for px in 0..w {
                    pixmap.blend_pixel(px, py, op.color);
                }
            }
            y += spacing;
        }
    }

    /// Full-viewport tint with transparent holes: every pixel outside a
    /// hole gets the tint blended over it, hole pixels show through.
    fn draw_mask(&self, pixmap: &mut Pixmap, op: &MaskOp) {
        if op.tint.a <= 0.0 {
            return;
        }
        let holes: Vec<(RotatedRect, vellum_model::HighlightRegion)> = op
            .holes
            .iter()
            .map(|h| (RotatedRect::new(self.scaled_rect(h.rect), h.rotation), h.region))
            .collect();

        for y in 0..pixmap.height() as i64 {
            for x in 0..pixmap.width() as i64 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let in_hole = holes.iter().any(|(rr, region)| match region {
                    vellum_model::HighlightRegion::Rect => rr.contains(p),
                    vellum_model::HighlightRegion::Ellipse => {
                        geom::point_in_ellipse(p, rr.rect, rr.rotation)
                    }
                });
                if !in_hole {
                    pixmap.blend_pixel(x, y, op.tint);
                }
            }
        }
    }

    // ── filtered layers ───────────────────────────────────────────────────

    fn draw_filtered_layer(&self, pixmap: &mut Pixmap, op: &FilteredLayerOp) {
        // Replay the wrapped content first; the filter then reworks the
        // accumulated pixels inside the clip.
        self.render(&op.content, pixmap);

        let clip = RotatedRect::new(self.scaled_rect(op.clip.rect), op.clip.rotation);
        if clip.is_empty() {
            return;
        }

        match op.kind {
            FilterKind::Grayscale => filters::apply_grayscale(pixmap, clip),
            FilterKind::Invert => filters::apply_invert(pixmap, clip),
            FilterKind::Blur => {
                filters::apply_blur(pixmap, clip, filters::blur_radius(op.strength));
            }
            FilterKind::Mosaic => self.mosaic_with_fallback(pixmap, clip, op.strength),
        }
    }

    /// Mosaic fallback ladder: two downsample attempts, then plain blur.
    /// Failures are logged and never abort the frame.
    fn mosaic_with_fallback(&self, pixmap: &mut Pixmap, clip: RotatedRect, strength: f32) {
        let shortest = clip.rect.size.x.min(clip.rect.size.y);
        let block = mosaic_block_size(strength, shortest);

        for attempt in 0..2 {
            match filters::apply_mosaic(pixmap, clip, block) {
                Ok(()) => return,
                Err(e) => {
                    log::warn!(
                        "mosaic rasterization failed (attempt {}, region {:?}): {e}",
                        attempt + 1,
                        clip.rect,
                    );
                }
            }
        }
        log::warn!("mosaic degraded to blur for region {:?}", clip.rect);
        filters::apply_blur(pixmap, clip, filters::blur_radius(strength));
    }
}

/// Signed distance from `local` (rect-center frame) to a rounded rect
/// with half extents `half` and corner radius `radius`.
fn rounded_rect_distance(local: Vec2, half: Vec2, radius: f32) -> f32 {
    let r = radius.clamp(0.0, half.x.min(half.y));
    let qx = local.x.abs() - (half.x - r);
    let qy = local.y.abs() - (half.y - r);
    let outside = Vec2::new(qx.max(0.0), qy.max(0.0)).length();
    let inside = qx.max(qy).min(0.0);
    outside + inside - r
}
