//! Pixel-space filter kernels.
//!
//! Each kernel mutates a pixmap in place, restricted to the pixels whose
//! centers fall inside a rotated clip region. Coordinates are physical
//! pixels (the executor scales logical clips before calling in).

use crate::coords::RotatedRect;
use crate::error::RasterError;

use super::pixmap::Pixmap;

/// Blur radius in physical pixels for a normalized strength.
#[inline]
pub fn blur_radius(strength: f32) -> u32 {
    ((strength.clamp(0.0, 1.0) * 16.0).round() as u32).max(1)
}

/// Integer region of interest: clip AABB clamped to the pixmap.
fn region_of(pixmap: &Pixmap, clip: RotatedRect) -> Option<(u32, u32, u32, u32)> {
    let bb = clip.aabb();
    let x0 = bb.min().x.floor().max(0.0) as u32;
    let y0 = bb.min().y.floor().max(0.0) as u32;
    let x1 = (bb.max().x.ceil() as i64).clamp(0, pixmap.width() as i64) as u32;
    let y1 = (bb.max().y.ceil() as i64).clamp(0, pixmap.height() as i64) as u32;
    if x0 >= x1 || y0 >= y1 {
        None
    } else {
        Some((x0, y0, x1, y1))
    }
}

#[inline]
fn center_inside(clip: RotatedRect, x: u32, y: u32) -> bool {
    clip.contains(crate::coords::Vec2::new(x as f32 + 0.5, y as f32 + 0.5))
}

/// Luma-weighted grayscale. Premultiplied channels share the alpha
/// factor, so the weights apply directly.
pub fn apply_grayscale(pixmap: &mut Pixmap, clip: RotatedRect) {
    let Some((x0, y0, x1, y1)) = region_of(pixmap, clip) else { return };
    for y in y0..y1 {
        for x in x0..x1 {
            if !center_inside(clip, x, y) {
                continue;
            }
            let [r, g, b, a] = pixmap.pixel(x, y);
            let luma = (r as u32 * 54 + g as u32 * 183 + b as u32 * 19) / 256;
            let l = luma as u8;
            pixmap.set_pixel(x, y, [l, l, l, a]);
        }
    }
}

/// Channel inversion. In premultiplied space the straight-alpha
/// `c → 1 - c` becomes `c → a - c`.
pub fn apply_invert(pixmap: &mut Pixmap, clip: RotatedRect) {
    let Some((x0, y0, x1, y1)) = region_of(pixmap, clip) else { return };
    for y in y0..y1 {
        for x in x0..x1 {
            if !center_inside(clip, x, y) {
                continue;
            }
            let [r, g, b, a] = pixmap.pixel(x, y);
            pixmap.set_pixel(x, y, [a - r.min(a), a - g.min(a), a - b.min(a), a]);
        }
    }
}

/// Box blur with the given radius.
///
/// Samples from a snapshot of the pixmap (clamped at its edges) and
/// writes only inside the clip, so repeated application stays
/// deterministic.
pub fn apply_blur(pixmap: &mut Pixmap, clip: RotatedRect, radius: u32) {
    let Some((x0, y0, x1, y1)) = region_of(pixmap, clip) else { return };
    let radius = radius.max(1) as i64;
    let src = pixmap.clone();
    let (w, h) = (src.width() as i64, src.height() as i64);

    for y in y0..y1 {
        for x in x0..x1 {
            if !center_inside(clip, x, y) {
                continue;
            }
            let mut sum = [0u64; 4];
            let mut n = 0u64;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let sx = (x as i64 + dx).clamp(0, w - 1) as u32;
                    let sy = (y as i64 + dy).clamp(0, h - 1) as u32;
                    let px = src.pixel(sx, sy);
                    for (acc, v) in sum.iter_mut().zip(px) {
                        *acc += v as u64;
                    }
                    n += 1;
                }
            }
            pixmap.set_pixel(x, y, sum.map(|s| (s / n) as u8));
        }
    }
}

/// Mosaic pixelation: averages `block`-sized cells anchored at the clip
/// AABB origin, then replicates each average across its cell.
///
/// Fails if the block size is degenerate; the caller downgrades to
/// blur.
pub fn apply_mosaic(pixmap: &mut Pixmap, clip: RotatedRect, block: u32) -> Result<(), RasterError> {
    if block == 0 {
        return Err(RasterError::new("mosaic block size is zero"));
    }
    let Some((x0, y0, x1, y1)) = region_of(pixmap, clip) else {
        return Ok(());
    };
    let src = pixmap.clone();
    let block = block as u64;

    let mut by = y0 as u64;
    while by < y1 as u64 {
        let mut bx = x0 as u64;
        let bh = block.min(y1 as u64 - by);
        while bx < x1 as u64 {
            let bw = block.min(x1 as u64 - bx);

            let mut sum = [0u64; 4];
            for y in by..by + bh {
                for x in bx..bx + bw {
                    let px = src.pixel(x as u32, y as u32);
                    for (acc, v) in sum.iter_mut().zip(px) {
                        *acc += v as u64;
                    }
                }
            }
            let n = bw * bh;
            let avg = sum.map(|s| (s / n) as u8);

            for y in by..by + bh {
                for x in bx..bx + bw {
                    if center_inside(clip, x as u32, y as u32) {
                        pixmap.set_pixel(x as u32, y as u32, avg);
                    }
                }
            }
            bx += block;
        }
        by += block;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;
    use vellum_model::Color;

    fn clip(x: f32, y: f32, w: f32, h: f32) -> RotatedRect {
        RotatedRect::new(Rect::new(x, y, w, h), 0.0)
    }

    fn red_green_pixmap() -> Pixmap {
        // Left half red, right half green, 8×8.
        let mut pm = Pixmap::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let c = if x < 4 {
                    Color::from_straight(1.0, 0.0, 0.0, 1.0)
                } else {
                    Color::from_straight(0.0, 1.0, 0.0, 1.0)
                };
                pm.blend_pixel(x, y, c);
            }
        }
        pm
    }

    // ── grayscale / invert ────────────────────────────────────────────────

    #[test]
    fn grayscale_flattens_channels_inside_clip_only() {
        let mut pm = red_green_pixmap();
        apply_grayscale(&mut pm, clip(0.0, 0.0, 4.0, 8.0));

        let left = pm.pixel(1, 1);
        assert_eq!(left[0], left[1]);
        assert_eq!(left[1], left[2]);
        // Right half untouched.
        assert_eq!(pm.pixel(6, 1), [0, 255, 0, 255]);
    }

    #[test]
    fn invert_round_trips() {
        let mut pm = red_green_pixmap();
        let before = pm.pixel(1, 1);
        apply_invert(&mut pm, clip(0.0, 0.0, 8.0, 8.0));
        assert_ne!(pm.pixel(1, 1), before);
        apply_invert(&mut pm, clip(0.0, 0.0, 8.0, 8.0));
        assert_eq!(pm.pixel(1, 1), before);
    }

    // ── blur / mosaic ─────────────────────────────────────────────────────

    #[test]
    fn blur_mixes_across_the_boundary() {
        let mut pm = red_green_pixmap();
        apply_blur(&mut pm, clip(0.0, 0.0, 8.0, 8.0), 2);
        let mid = pm.pixel(4, 4);
        assert!(mid[0] > 0 && mid[1] > 0, "boundary pixel should mix: {mid:?}");
    }

    #[test]
    fn mosaic_makes_blocks_uniform() {
        let mut pm = red_green_pixmap();
        apply_mosaic(&mut pm, clip(0.0, 0.0, 8.0, 8.0), 4).unwrap();
        // Every pixel of a 4×4 block equals its block's average.
        assert_eq!(pm.pixel(0, 0), pm.pixel(3, 3));
        assert_eq!(pm.pixel(4, 0), pm.pixel(7, 3));
        assert_ne!(pm.pixel(0, 0), pm.pixel(4, 0));
    }

    #[test]
    fn mosaic_zero_block_is_an_error() {
        let mut pm = red_green_pixmap();
        assert!(apply_mosaic(&mut pm, clip(0.0, 0.0, 8.0, 8.0), 0).is_err());
    }

    #[test]
    fn rotated_clip_leaves_outside_pixels_alone() {
        let mut pm = red_green_pixmap();
        // 45° square centered at (4,4): corners of the pixmap stay out.
        let rr = RotatedRect::new(Rect::new(2.0, 2.0, 4.0, 4.0), std::f32::consts::FRAC_PI_4);
        apply_grayscale(&mut pm, rr);
        assert_eq!(pm.pixel(0, 0), [255, 0, 0, 255]);
        let center = pm.pixel(4, 4);
        assert_eq!(center[0], center[1]);
    }

    #[test]
    fn blur_radius_scales_and_clamps() {
        assert_eq!(blur_radius(0.0), 1);
        assert_eq!(blur_radius(0.5), 8);
        assert_eq!(blur_radius(1.0), 16);
    }
}
