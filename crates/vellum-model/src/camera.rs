use crate::geometry::{Rect, Vec2};

/// Interactive pan/zoom camera.
///
/// `offset` is the world-space point shown at the screen origin; `zoom`
/// scales world units to screen logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub offset: Vec2,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { offset: Vec2::zero(), zoom: 1.0 }
    }
}

impl Camera {
    #[inline]
    pub fn new(offset: Vec2, zoom: f32) -> Self {
        Self { offset, zoom }
    }

    #[inline]
    pub fn world_to_screen(self, p: Vec2) -> Vec2 {
        (p - self.offset) * self.zoom
    }

    #[inline]
    pub fn screen_to_world(self, p: Vec2) -> Vec2 {
        p / self.zoom + self.offset
    }

    /// Maps a world rect to screen space. Rotation is unaffected (the
    /// camera never rotates).
    #[inline]
    pub fn rect_to_screen(self, r: Rect) -> Rect {
        Rect::from_origin_size(self.world_to_screen(r.origin), r.size * self.zoom)
    }

    /// Scales a world length to screen logical pixels.
    #[inline]
    pub fn len_to_screen(self, len: f32) -> f32 {
        len * self.zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_screen_round_trip() {
        let cam = Camera::new(Vec2::new(100.0, 50.0), 2.0);
        let p = Vec2::new(130.0, 80.0);
        let s = cam.world_to_screen(p);
        assert_eq!(s, Vec2::new(60.0, 60.0));
        assert_eq!(cam.screen_to_world(s), p);
    }
}
