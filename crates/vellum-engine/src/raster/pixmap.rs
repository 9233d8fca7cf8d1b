use vellum_model::Color;

/// RGBA8 premultiplied pixel buffer.
///
/// Row-major, top-left origin. All compositing is source-over in
/// premultiplied space: `out = src + dst * (1 - src.a)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Transparent-black pixmap. Zero dimensions are clamped to 1.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            data: vec![0; (width * height * 4) as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 premultiplied bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Fills the whole buffer with `color`, replacing prior content.
    pub fn clear(&mut self, color: Color) {
        let px = color_to_px(color);
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Source-over blends `color` at `(x, y)`. Out-of-bounds is a no-op.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let src = color_to_px(color);
        let i = self.offset(x as u32, y as u32);
        let dst = [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]];
        let out = blend_px(src, dst);
        self.data[i..i + 4].copy_from_slice(&out);
    }

}

#[inline]
fn color_to_px(c: Color) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    [q(c.r), q(c.g), q(c.b), q(c.a)]
}

#[inline]
fn blend_px(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let inv = 255 - src[3] as u32;
    let mix = |s: u8, d: u8| (s as u32 + (d as u32 * inv + 127) / 255).min(255) as u8;
    [
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        mix(src[3], dst[3]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_blend_replaces() {
        let mut pm = Pixmap::new(2, 2);
        pm.clear(Color::from_straight(0.0, 1.0, 0.0, 1.0));
        pm.blend_pixel(0, 0, Color::from_straight(1.0, 0.0, 0.0, 1.0));
        assert_eq!(pm.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(pm.pixel(1, 1), [0, 255, 0, 255]);
    }

    #[test]
    fn half_alpha_blend_mixes() {
        let mut pm = Pixmap::new(1, 1);
        pm.clear(Color::from_straight(0.0, 0.0, 0.0, 1.0));
        pm.blend_pixel(0, 0, Color::from_straight(1.0, 1.0, 1.0, 0.5));
        let px = pm.pixel(0, 0);
        assert!(px[0] > 120 && px[0] < 136);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn out_of_bounds_blend_is_ignored() {
        let mut pm = Pixmap::new(2, 2);
        pm.blend_pixel(-1, 0, Color::from_straight(1.0, 0.0, 0.0, 1.0));
        pm.blend_pixel(2, 0, Color::from_straight(1.0, 0.0, 0.0, 1.0));
        assert_eq!(pm.pixel(0, 0), [0, 0, 0, 0]);
    }
}
