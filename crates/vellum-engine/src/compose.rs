//! Filter-aware scene compositor.
//!
//! Accumulates a z-ordered element range into one display list:
//! non-filter elements append draw ops; a filter element wraps the
//! accumulated list into a filtered layer clipped to the element's
//! rotated bounds, so everything below it in z-order is affected and
//! everything above keeps accumulating on top.

use vellum_model::{
    ArrowHead, Camera, Color, PreviewOverrides, SceneElement, StyleConfig, VisualPayload,
};

use crate::coords::{Rect, RotatedRect, Vec2, Viewport};
use crate::dlist::{
    DisplayList, DrawOp, GridOp, MaskHole, MaskOp, PolylineOp, ShapeOp, TextOp,
};
use crate::text::FontSystem;

/// Everything the compositor needs for one element range.
pub struct ComposeInput<'a> {
    pub elements: &'a [SceneElement],
    pub overrides: &'a PreviewOverrides,
    pub camera: Camera,
    pub viewport: Viewport,
    pub style: &'a StyleConfig,
    pub fonts: &'a FontSystem,
}

/// Composes `input.elements` (ascending z) into a display list.
///
/// Preview overrides replace committed elements by id. Elements outside
/// the viewport are culled. Highlight elements are collected and emitted
/// as a single mask op on top of the composed range, holes pre-inflated
/// by half their stroke width.
pub fn compose_scene(input: &ComposeInput<'_>) -> DisplayList {
    let mut list = DisplayList::new();
    let mut holes: Vec<MaskHole> = Vec::new();
    let view_rect = input.viewport.rect();

    for committed in input.elements {
        let element = input.overrides.get(committed.id).unwrap_or(committed);

        if element.opacity <= 0.0 {
            continue;
        }

        let screen_rect = input.camera.rect_to_screen(element.local_rect);
        let bounds = RotatedRect::new(screen_rect, element.rotation);

        match &element.payload {
            VisualPayload::Filter(filter) => {
                // Zero-area bounds make the filter a no-op: the list is
                // left unchanged rather than wrapped.
                if bounds.is_empty() || bounds.aabb().intersect(view_rect).is_none() {
                    continue;
                }
                list.wrap_in_filter(filter.kind, filter.strength, bounds);
            }
            VisualPayload::Highlight(hl) => {
                let inflate = input.camera.len_to_screen(hl.stroke_width) * 0.5;
                let hole = MaskHole {
                    rect: screen_rect.inflated(inflate),
                    rotation: element.rotation,
                    region: hl.region,
                };
                if RotatedRect::new(hole.rect, hole.rotation)
                    .aabb()
                    .intersect(view_rect)
                    .is_some()
                {
                    holes.push(hole);
                }
            }
            _ => {
                if bounds.aabb().intersect(view_rect).is_none() {
                    continue;
                }
                emit_element(&mut list, element, screen_rect, input);
            }
        }
    }

    if !holes.is_empty() {
        list.push(DrawOp::Mask(MaskOp {
            tint: input.style.highlight.tint,
            holes,
        }));
    }

    list
}

/// Records a grid op covering the viewport, phased by the camera.
pub fn compose_grid(list: &mut DisplayList, camera: Camera, style: &StyleConfig) {
    if !style.grid.enabled {
        return;
    }
    let spacing = camera.len_to_screen(style.grid.spacing);
    if spacing < 2.0 {
        // Zoomed out far enough that lines would merge into a wash.
        return;
    }
    let phase = camera.world_to_screen(Vec2::zero());
    list.push(DrawOp::Grid(GridOp {
        spacing,
        phase: Vec2::new(phase.x.rem_euclid(spacing), phase.y.rem_euclid(spacing)),
        color: style.grid.color,
        line_width: style.grid.line_width,
    }));
}

fn emit_element(
    list: &mut DisplayList,
    element: &SceneElement,
    screen_rect: Rect,
    input: &ComposeInput<'_>,
) {
    let zoom = input.camera.zoom;
    let fade = |c: Color| c.scaled_alpha(element.opacity);

    match &element.payload {
        VisualPayload::Rect(shape) => {
            list.push(DrawOp::Shape(ShapeOp {
                rect: screen_rect,
                rotation: element.rotation,
                corner_radius: shape.corner_radius * zoom,
                fill: shape.fill.map_or(Color::transparent(), fade),
                stroke: shape.stroke.map_or(Color::transparent(), fade),
                stroke_width: shape.stroke_width * zoom,
            }));
        }
        VisualPayload::Arrow(arrow) => {
            let pts = to_screen_points(&arrow.points, element, input.camera);
            if pts.len() < 2 {
                return;
            }
            let width = (arrow.width * zoom).max(1.0);
            let color = fade(arrow.color);
            if matches!(arrow.head, ArrowHead::End | ArrowHead::Both) {
                emit_arrow_head(list, &pts, width, color, false);
            }
            if matches!(arrow.head, ArrowHead::Both) {
                emit_arrow_head(list, &pts, width, color, true);
            }
            list.push(DrawOp::Polyline(PolylineOp { points: pts, width, color }));
        }
        VisualPayload::Freehand(stroke) => {
            let pts = to_screen_points(&crate::geom::smooth_polyline(&stroke.points), element, input.camera);
            if pts.is_empty() {
                return;
            }
            list.push(DrawOp::Polyline(PolylineOp {
                points: pts,
                width: (stroke.width * zoom).max(1.0),
                color: fade(stroke.color),
            }));
        }
        VisualPayload::Text(text) => {
            list.push(DrawOp::Text(TextOp {
                origin: screen_rect.origin,
                content: text.content.clone(),
                font_size: text.font_size * zoom,
                color: fade(text.color),
                max_width: Some(screen_rect.size.x),
            }));
        }
        VisualPayload::SerialMarker(marker) => {
            let d = screen_rect.size.x.min(screen_rect.size.y);
            list.push(DrawOp::Shape(ShapeOp {
                rect: screen_rect,
                rotation: element.rotation,
                corner_radius: d * 0.5,
                fill: fade(marker.color),
                stroke: Color::transparent(),
                stroke_width: 0.0,
            }));
            let label = marker.number.to_string();
            let size = (d * 0.55).max(6.0);
            let measured = input.fonts.measure_text(&label, input.fonts.primary(), size, None);
            list.push(DrawOp::Text(TextOp {
                origin: screen_rect.center() - measured * 0.5,
                content: label,
                font_size: size,
                color: fade(Color::from_straight(1.0, 1.0, 1.0, 1.0)),
                max_width: None,
            }));
        }
        // Handled by the caller before dispatching here.
        VisualPayload::Filter(_) | VisualPayload::Highlight(_) => {}
    }
}

/// Local polyline points → screen space, honoring element rotation.
fn to_screen_points(points: &[Vec2], element: &SceneElement, camera: Camera) -> Vec<Vec2> {
    let center = element.local_rect.center();
    points
        .iter()
        .map(|&p| {
            let world = element.local_rect.origin + p;
            let rotated = center + (world - center).rotated(element.rotation);
            camera.world_to_screen(rotated)
        })
        .collect()
}

/// Two short barbs at the polyline's end (or start for `reversed`).
fn emit_arrow_head(
    list: &mut DisplayList,
    pts: &[Vec2],
    width: f32,
    color: Color,
    reversed: bool,
) {
    let (tip, prev) = if reversed {
        (pts[0], pts[1])
    } else {
        (pts[pts.len() - 1], pts[pts.len() - 2])
    };
    let dir = tip - prev;
    let len = dir.length();
    if len <= f32::EPSILON {
        return;
    }
    let dir = dir / len;
    let barb_len = (width * 3.0).max(8.0);
    let barb_angle = 0.45; // radians off the shaft

    for sign in [-1.0f32, 1.0] {
        let barb = Vec2::zero() - dir.rotated(sign * barb_angle) * barb_len;
        list.push(DrawOp::Polyline(PolylineOp {
            points: vec![tip, tip + barb],
            width,
            color,
        }));
    }
}
