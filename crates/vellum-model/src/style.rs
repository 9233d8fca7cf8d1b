//! Style configuration for the drawing surface.
//!
//! The document store owns one of these (usually behind an `Arc`) and
//! hands it to the engine per frame. Render keys compare the `Arc`
//! pointer as an intentional fast path, so treat instances as immutable:
//! publish changes by building a new config.

use crate::geometry::Color;

/// Grid rendering parameters for the static pass.
#[derive(Debug, Clone)]
pub struct GridStyle {
    pub enabled: bool,
    /// World-space spacing between grid lines.
    pub spacing: f32,
    pub color: Color,
    pub line_width: f32,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            spacing: 32.0,
            color: Color::from_straight(0.5, 0.5, 0.5, 0.18),
            line_width: 1.0,
        }
    }
}

/// Selection chrome parameters (outline + handles).
#[derive(Debug, Clone)]
pub struct SelectionStyle {
    pub outline_color: Color,
    pub outline_width: f32,
    /// Square handle edge length in screen logical pixels.
    pub handle_size: f32,
    /// Hit radius around a handle center, in screen logical pixels.
    pub handle_hit_radius: f32,
    /// Distance of the rotate handle above the top edge, screen px.
    pub rotate_handle_offset: f32,
    pub handle_fill: Color,
}

impl Default for SelectionStyle {
    fn default() -> Self {
        Self {
            outline_color: Color::from_srgb_u8(66, 133, 244, 255),
            outline_width: 1.5,
            handle_size: 8.0,
            handle_hit_radius: 10.0,
            rotate_handle_offset: 24.0,
            handle_fill: Color::from_srgb_u8(255, 255, 255, 255),
        }
    }
}

/// Connector binding / snapping parameters.
#[derive(Debug, Clone)]
pub struct SnapStyle {
    /// Whether drawing a connector may snap-bind to a nearby text box.
    pub binding_enabled: bool,
    /// Minimum on-screen distance before a binding candidate is offered.
    pub min_binding_distance: f32,
}

impl Default for SnapStyle {
    fn default() -> Self {
        Self { binding_enabled: true, min_binding_distance: 12.0 }
    }
}

/// Highlight mask parameters: the viewport tint that highlight regions
/// cut holes into.
#[derive(Debug, Clone)]
pub struct HighlightMaskStyle {
    pub tint: Color,
}

impl Default for HighlightMaskStyle {
    fn default() -> Self {
        Self { tint: Color::from_straight(0.0, 0.0, 0.0, 0.45) }
    }
}

/// Box-selection marquee parameters.
#[derive(Debug, Clone)]
pub struct BoxSelectionStyle {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f32,
}

impl Default for BoxSelectionStyle {
    fn default() -> Self {
        Self {
            fill: Color::from_straight(0.26, 0.52, 0.96, 0.12),
            stroke: Color::from_srgb_u8(66, 133, 244, 255),
            stroke_width: 1.0,
        }
    }
}

/// Top-level style configuration consumed by the engine.
#[derive(Debug, Clone, Default)]
pub struct StyleConfig {
    pub grid: GridStyle,
    pub selection: SelectionStyle,
    pub snap: SnapStyle,
    pub highlight: HighlightMaskStyle,
    pub box_selection: BoxSelectionStyle,
}
