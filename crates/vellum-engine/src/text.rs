//! Font loading, measurement, and glyph rasterization.
//!
//! One `FontSystem` is owned by the host and passed into the engine per
//! frame; fonts are immutable after loading. Layout and rasterization go
//! through `fontdue`.

use std::fmt;

use crate::coords::Vec2;

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// A glyph placed by layout, with its coverage bitmap.
///
/// `x`/`y` are the bitmap's top-left relative to the run origin, in the
/// same pixel scale layout ran at. `coverage` is `width * height` alpha
/// bytes.
pub struct PlacedGlyph {
    pub x: f32,
    pub y: f32,
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

/// Owns a collection of loaded fonts.
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl Default for FontSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FontSystem {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Parses and stores a TrueType or OpenType font from raw bytes.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        Ok(id)
    }

    /// The first loaded font, if any. The engine shapes all document
    /// text with this unless told otherwise.
    pub fn primary(&self) -> Option<FontId> {
        if self.fonts.is_empty() { None } else { Some(FontId(0)) }
    }

    fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    /// Computes the bounding box of a laid-out text string in the pixel
    /// scale layout runs at.
    ///
    /// With no font loaded, falls back to a width heuristic so text-box
    /// hit geometry stays usable (0.55 em per char, 1.2 em line height).
    #[must_use]
    pub fn measure_text(
        &self,
        text: &str,
        id: Option<FontId>,
        size: f32,
        max_width: Option<f32>,
    ) -> Vec2 {
        use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

        let Some(font) = id.and_then(|id| self.get(id)) else {
            let w = text.chars().count() as f32 * size * 0.55;
            let w = max_width.map_or(w, |m| w.min(m));
            return Vec2::new(w, size * 1.2);
        };

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings { max_width, ..LayoutSettings::default() });
        layout.append(std::slice::from_ref(font), &TextStyle::new(text, size, 0));

        let glyphs = layout.glyphs();
        if glyphs.is_empty() {
            return Vec2::new(0.0, size * 1.2);
        }

        let w = glyphs
            .iter()
            .map(|g| g.x + g.width as f32)
            .fold(0.0f32, f32::max);
        let h = layout.height().max(size * 1.2);
        Vec2::new(w, h)
    }

    /// Lays out and rasterizes `text`, returning placed coverage bitmaps.
    ///
    /// Returns an empty vec when no font is loaded; the caller draws
    /// nothing rather than failing the frame.
    pub fn rasterize_run(
        &self,
        text: &str,
        id: Option<FontId>,
        size: f32,
        max_width: Option<f32>,
    ) -> Vec<PlacedGlyph> {
        use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

        let Some(font) = id.and_then(|id| self.get(id)) else {
            return Vec::new();
        };

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings { max_width, ..LayoutSettings::default() });
        layout.append(std::slice::from_ref(font), &TextStyle::new(text, size, 0));

        layout
            .glyphs()
            .iter()
            .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
            .map(|g| {
                let (metrics, coverage) = font.rasterize_config(g.key);
                PlacedGlyph {
                    x: g.x,
                    y: g.y,
                    width: metrics.width,
                    height: metrics.height,
                    coverage,
                }
            })
            .collect()
    }
}
