//! Hit-testing and hover/cursor resolution.
//!
//! One walk resolves what the pointer is over, in priority order:
//! point handles on a single selected arrow, then selection chrome
//! handles, then element geometry topmost-first. Binding candidates are
//! a separate phase that only exists while a connector-style element is
//! being drawn.
//!
//! All geometry tests run in world space; the incoming point and the
//! style's screen-pixel tolerances are converted through the camera
//! once at the top.

use vellum_model::{
    Camera, DocumentSnapshot, ElementId, ElementKind, InteractionState, PreviewOverrides,
    SceneElement, Selection, StyleConfig, VisualPayload,
};

use crate::coords::{Rect, RotatedRect, Vec2};
use crate::error::PayloadMismatch;
use crate::geom::{point_in_ellipse, point_near_polyline, point_on_rect_stroke, smooth_polyline};
use crate::text::FontSystem;

/// Slop around exact geometry, in screen logical pixels.
pub const HIT_TOLERANCE: f32 = 4.0;

/// One of the eight resize handles on the selection frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::TopLeft,
        ResizeHandle::Top,
        ResizeHandle::TopRight,
        ResizeHandle::Right,
        ResizeHandle::BottomRight,
        ResizeHandle::Bottom,
        ResizeHandle::BottomLeft,
        ResizeHandle::Left,
    ];

    /// Handle position as a unit offset from the frame center
    /// (`-1..=1` per axis, unrotated).
    #[inline]
    pub fn anchor(self) -> Vec2 {
        match self {
            ResizeHandle::TopLeft => Vec2::new(-1.0, -1.0),
            ResizeHandle::Top => Vec2::new(0.0, -1.0),
            ResizeHandle::TopRight => Vec2::new(1.0, -1.0),
            ResizeHandle::Right => Vec2::new(1.0, 0.0),
            ResizeHandle::BottomRight => Vec2::new(1.0, 1.0),
            ResizeHandle::Bottom => Vec2::new(0.0, 1.0),
            ResizeHandle::BottomLeft => Vec2::new(-1.0, 1.0),
            ResizeHandle::Left => Vec2::new(-1.0, 0.0),
        }
    }
}

/// What kind of handle the pointer is over.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HandleKind {
    Resize(ResizeHandle),
    Rotate,
    /// An existing turning point of the selected arrow.
    ArrowPoint(usize),
    /// A segment midpoint where a new turning point can be inserted.
    ArrowInsert(usize),
}

/// Result of one hit-test walk.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HitResult {
    None,
    /// A handle on the current selection.
    Handle(HandleKind),
    /// Element geometry. `padding_only` is set when the hit landed in
    /// the grab padding (hollow rect interior, inflated text box)
    /// rather than on visible geometry.
    Element { id: ElementId, padding_only: bool },
    /// A text box the connector being drawn could bind to.
    BindingCandidate { id: ElementId },
}

/// A positioned selection-chrome handle, in the same space as the rect
/// passed to [`selection_handles`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacedHandle {
    pub kind: HandleKind,
    pub center: Vec2,
}

/// Handle centers for a selection frame: eight resize handles on the
/// rotated rect plus the rotate handle above the top edge.
///
/// The overlay pass draws these and the hit-tester probes them, so both
/// always agree on placement.
pub fn selection_handles(rect: Rect, rotation: f32, style: &StyleConfig) -> Vec<PlacedHandle> {
    let center = rect.center();
    let half = rect.size * 0.5;
    let mut out = Vec::with_capacity(9);
    for handle in ResizeHandle::ALL {
        let a = handle.anchor();
        let local = Vec2::new(a.x * half.x, a.y * half.y);
        out.push(PlacedHandle {
            kind: HandleKind::Resize(handle),
            center: center + local.rotated(rotation),
        });
    }
    let rotate_local = Vec2::new(0.0, -half.y - style.selection.rotate_handle_offset);
    out.push(PlacedHandle {
        kind: HandleKind::Rotate,
        center: center + rotate_local.rotated(rotation),
    });
    out
}

/// The frame the selection chrome is drawn around, in world space.
///
/// A single selected element keeps its own rotation; a multi-selection
/// gets the unrotated union of the members' bounding boxes. Preview
/// overrides replace committed geometry, so the frame follows an
/// in-flight drag.
pub fn selection_frame(
    snapshot: &DocumentSnapshot,
    overrides: &PreviewOverrides,
    selection: &Selection,
) -> Option<RotatedRect> {
    if let Some(id) = selection.single() {
        let e = snapshot.get(id)?;
        let e = overrides.get(id).unwrap_or(e);
        return Some(RotatedRect::new(e.local_rect, e.rotation));
    }
    let mut union: Option<Rect> = None;
    for &id in selection.ids() {
        let Some(e) = snapshot.get(id) else { continue };
        let e = overrides.get(id).unwrap_or(e);
        let bb = RotatedRect::new(e.local_rect, e.rotation).aabb();
        union = Some(match union {
            Some(u) => u.union(bb),
            None => bb,
        });
    }
    union.map(|r| RotatedRect::new(r, 0.0))
}

/// Resolves what `point_screen` is over. Preview overrides are applied
/// over committed elements, matching what the compositor draws.
pub fn hit_test(
    snapshot: &DocumentSnapshot,
    overrides: &PreviewOverrides,
    point_screen: Vec2,
    camera: Camera,
    selection: &Selection,
    interaction: InteractionState,
    style: &StyleConfig,
    fonts: &FontSystem,
    tool_filter: Option<ElementKind>,
) -> Result<HitResult, PayloadMismatch> {
    let point_world = camera.screen_to_world(point_screen);
    let tol_world = HIT_TOLERANCE / camera.zoom;

    if let InteractionState::Creating(ElementKind::SerialMarker) = interaction {
        if style.snap.binding_enabled {
            if let Some(id) = binding_candidate(snapshot, overrides, point_screen, camera, style) {
                return Ok(HitResult::BindingCandidate { id });
            }
        }
    }

    // Handles lead selected content, but only when the pointer can
    // actually grab them.
    let handles_active = matches!(
        interaction,
        InteractionState::Idle | InteractionState::Editing
    );
    if handles_active {
        if let Some(hit) =
            hit_arrow_handles(snapshot, overrides, point_screen, camera, selection, style)?
        {
            return Ok(HitResult::Handle(hit));
        }
        if let Some(hit) =
            hit_selection_handles(snapshot, overrides, point_screen, camera, selection, style)
        {
            return Ok(HitResult::Handle(hit));
        }
    }

    // Topmost exact hit wins; a padding-only hit is kept as a fallback
    // so visible geometry lower in the stack can still take it.
    let mut padded: Option<ElementId> = None;
    for committed in snapshot.elements().iter().rev() {
        let element = overrides.get(committed.id).unwrap_or(committed);
        if element.opacity <= 0.0 {
            continue;
        }
        if tool_filter.is_some_and(|k| k != element.kind()) {
            continue;
        }
        match hit_element(element, point_world, tol_world, fonts)? {
            Some(false) => {
                return Ok(HitResult::Element { id: element.id, padding_only: false });
            }
            Some(true) => {
                if padded.is_none() {
                    padded = Some(element.id);
                }
            }
            None => {}
        }
    }
    if let Some(id) = padded {
        return Ok(HitResult::Element { id, padding_only: true });
    }
    Ok(HitResult::None)
}

/// Topmost text box within binding range of the pointer.
fn binding_candidate(
    snapshot: &DocumentSnapshot,
    overrides: &PreviewOverrides,
    point_screen: Vec2,
    camera: Camera,
    style: &StyleConfig,
) -> Option<ElementId> {
    for committed in snapshot.elements().iter().rev() {
        let element = overrides.get(committed.id).unwrap_or(committed);
        if !matches!(element.payload, VisualPayload::Text(_)) || element.opacity <= 0.0 {
            continue;
        }
        let screen = camera.rect_to_screen(element.local_rect);
        if rect_distance(screen, point_screen) <= style.snap.min_binding_distance {
            return Some(element.id);
        }
    }
    None
}

/// Distance from `p` to the rect (zero inside).
fn rect_distance(rect: Rect, p: Vec2) -> f32 {
    let min = rect.min();
    let max = rect.max();
    let dx = (min.x - p.x).max(0.0).max(p.x - max.x);
    let dy = (min.y - p.y).max(0.0).max(p.y - max.y);
    Vec2::new(dx, dy).length()
}

/// Turning-point and insert handles on a single selected arrow.
fn hit_arrow_handles(
    snapshot: &DocumentSnapshot,
    overrides: &PreviewOverrides,
    point_screen: Vec2,
    camera: Camera,
    selection: &Selection,
    style: &StyleConfig,
) -> Result<Option<HandleKind>, PayloadMismatch> {
    let Some(id) = selection.single() else {
        return Ok(None);
    };
    let Some(committed) = snapshot.get(id) else {
        return Ok(None);
    };
    let element = overrides.get(id).unwrap_or(committed);
    let VisualPayload::Arrow(arrow) = &element.payload else {
        return Ok(None);
    };
    let radius = style.selection.handle_hit_radius;
    let screen_points = world_points(element, &arrow.points)
        .into_iter()
        .map(|p| camera.world_to_screen(p))
        .collect::<Vec<_>>();
    for (i, p) in screen_points.iter().enumerate() {
        if p.distance(point_screen) <= radius {
            return Ok(Some(HandleKind::ArrowPoint(i)));
        }
    }
    for (i, pair) in screen_points.windows(2).enumerate() {
        let mid = (pair[0] + pair[1]) * 0.5;
        if mid.distance(point_screen) <= radius {
            return Ok(Some(HandleKind::ArrowInsert(i)));
        }
    }
    Ok(None)
}

fn hit_selection_handles(
    snapshot: &DocumentSnapshot,
    overrides: &PreviewOverrides,
    point_screen: Vec2,
    camera: Camera,
    selection: &Selection,
    style: &StyleConfig,
) -> Option<HandleKind> {
    let frame = selection_frame(snapshot, overrides, selection)?;
    let screen = RotatedRect::new(camera.rect_to_screen(frame.rect), frame.rotation);
    let radius = style.selection.handle_hit_radius;
    selection_handles(screen.rect, screen.rotation, style)
        .into_iter()
        .find(|h| h.center.distance(point_screen) <= radius)
        .map(|h| h.kind)
}

/// Dispatches the per-payload tester for `element`.
///
/// `Some(padding_only)` on a hit; `None` on a miss.
fn hit_element(
    element: &SceneElement,
    point_world: Vec2,
    tol: f32,
    fonts: &FontSystem,
) -> Result<Option<bool>, PayloadMismatch> {
    match element.payload.kind() {
        ElementKind::Rect => hit_rect(element, point_world, tol),
        ElementKind::Arrow => hit_arrow(element, point_world, tol),
        ElementKind::Freehand => hit_freehand(element, point_world, tol),
        ElementKind::Text => hit_text(element, point_world, tol, fonts),
        ElementKind::Highlight => hit_highlight(element, point_world, tol),
        ElementKind::Filter => hit_filter(element, point_world),
        ElementKind::SerialMarker => hit_marker(element, point_world, tol),
    }
}

fn mismatch(element: &SceneElement, expected: ElementKind) -> PayloadMismatch {
    PayloadMismatch {
        id: element.id,
        expected,
        actual: element.kind(),
    }
}

/// Rect: stroke band first, then interior. The interior of a rect with
/// no fill is grabbable but reported as padding so a visible element
/// underneath wins.
pub fn hit_rect(
    element: &SceneElement,
    p: Vec2,
    tol: f32,
) -> Result<Option<bool>, PayloadMismatch> {
    let VisualPayload::Rect(shape) = &element.payload else {
        return Err(mismatch(element, ElementKind::Rect));
    };
    if shape.stroke.is_some()
        && point_on_rect_stroke(p, element.local_rect, element.rotation, shape.stroke_width, tol)
    {
        return Ok(Some(false));
    }
    if RotatedRect::new(element.local_rect, element.rotation).contains(p) {
        return Ok(Some(shape.fill.is_none()));
    }
    Ok(None)
}

pub fn hit_arrow(
    element: &SceneElement,
    p: Vec2,
    tol: f32,
) -> Result<Option<bool>, PayloadMismatch> {
    let VisualPayload::Arrow(shape) = &element.payload else {
        return Err(mismatch(element, ElementKind::Arrow));
    };
    let pts = world_points(element, &shape.points);
    let band = shape.width * 0.5 + tol;
    Ok(point_near_polyline(p, &pts, band).then_some(false))
}

/// Freehand strokes test against the smoothed path, matching what the
/// compositor draws.
pub fn hit_freehand(
    element: &SceneElement,
    p: Vec2,
    tol: f32,
) -> Result<Option<bool>, PayloadMismatch> {
    let VisualPayload::Freehand(shape) = &element.payload else {
        return Err(mismatch(element, ElementKind::Freehand));
    };
    let pts = world_points(element, &smooth_polyline(&shape.points));
    let band = shape.width * 0.5 + tol;
    Ok(point_near_polyline(p, &pts, band).then_some(false))
}

/// Text: laid-out bounding box is exact; the tolerance ring around it
/// is padding.
pub fn hit_text(
    element: &SceneElement,
    p: Vec2,
    tol: f32,
    fonts: &FontSystem,
) -> Result<Option<bool>, PayloadMismatch> {
    let VisualPayload::Text(shape) = &element.payload else {
        return Err(mismatch(element, ElementKind::Text));
    };
    let measured = fonts.measure_text(
        &shape.content,
        fonts.primary(),
        shape.font_size,
        Some(element.local_rect.size.x),
    );
    let bbox = Rect::from_origin_size(element.local_rect.origin, measured);
    // The element rotates about its own rect center, and the laid-out
    // box rotates with it.
    let pivot = RotatedRect::new(element.local_rect, element.rotation);
    let local = pivot.to_local(p) + element.local_rect.center();
    if bbox.contains(local) {
        return Ok(Some(false));
    }
    if bbox.inflated(tol).contains(local) {
        return Ok(Some(true));
    }
    Ok(None)
}

pub fn hit_highlight(
    element: &SceneElement,
    p: Vec2,
    tol: f32,
) -> Result<Option<bool>, PayloadMismatch> {
    let VisualPayload::Highlight(shape) = &element.payload else {
        return Err(mismatch(element, ElementKind::Highlight));
    };
    let rect = element.local_rect.inflated(tol);
    let hit = match shape.region {
        vellum_model::HighlightRegion::Rect => {
            RotatedRect::new(rect, element.rotation).contains(p)
        }
        vellum_model::HighlightRegion::Ellipse => point_in_ellipse(p, rect, element.rotation),
    };
    Ok(hit.then_some(false))
}

pub fn hit_filter(element: &SceneElement, p: Vec2) -> Result<Option<bool>, PayloadMismatch> {
    let VisualPayload::Filter(_) = &element.payload else {
        return Err(mismatch(element, ElementKind::Filter));
    };
    Ok(RotatedRect::new(element.local_rect, element.rotation)
        .contains(p)
        .then_some(false))
}

pub fn hit_marker(
    element: &SceneElement,
    p: Vec2,
    tol: f32,
) -> Result<Option<bool>, PayloadMismatch> {
    let VisualPayload::SerialMarker(_) = &element.payload else {
        return Err(mismatch(element, ElementKind::SerialMarker));
    };
    let center = element.local_rect.center();
    let radius = element.local_rect.size.x.min(element.local_rect.size.y) * 0.5;
    Ok((p.distance(center) <= radius + tol).then_some(false))
}

/// Maps payload-local points to world space (translate by the rect
/// origin, rotate about the rect center). Must match the compositor's
/// transform.
fn world_points(element: &SceneElement, points: &[Vec2]) -> Vec<Vec2> {
    let center = element.local_rect.center();
    points
        .iter()
        .map(|&p| {
            let world = element.local_rect.origin + p;
            center + (world - center).rotated(element.rotation)
        })
        .collect()
}

// ── hover / cursor ──────────────────────────────────────────────────

/// Pointer cursor to show for the current hover.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorKind {
    Default,
    Move,
    Crosshair,
    Rotate,
    ResizeEw,
    ResizeNs,
    ResizeNwSe,
    ResizeNeSw,
}

/// Hover state derived from one hit-test walk.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Hover {
    pub element: Option<ElementId>,
    pub cursor: CursorKind,
}

/// Resolves the hovered element and cursor from a single [`hit_test`]
/// call.
pub fn resolve_hover(
    snapshot: &DocumentSnapshot,
    overrides: &PreviewOverrides,
    point_screen: Vec2,
    camera: Camera,
    selection: &Selection,
    interaction: InteractionState,
    style: &StyleConfig,
    fonts: &FontSystem,
    tool_filter: Option<ElementKind>,
) -> Result<Hover, PayloadMismatch> {
    let hit = hit_test(
        snapshot,
        overrides,
        point_screen,
        camera,
        selection,
        interaction,
        style,
        fonts,
        tool_filter,
    )?;
    let hover = match hit {
        HitResult::None => Hover { element: None, cursor: CursorKind::Default },
        HitResult::Element { id, .. } => Hover { element: Some(id), cursor: CursorKind::Move },
        HitResult::BindingCandidate { id } => {
            Hover { element: Some(id), cursor: CursorKind::Crosshair }
        }
        HitResult::Handle(kind) => {
            let rotation =
                selection_frame(snapshot, overrides, selection).map_or(0.0, |f| f.rotation);
            let cursor = match kind {
                HandleKind::Rotate => CursorKind::Rotate,
                HandleKind::Resize(h) => resize_cursor(h, rotation),
                HandleKind::ArrowPoint(_) | HandleKind::ArrowInsert(_) => CursorKind::Move,
            };
            Hover { element: None, cursor }
        }
    };
    Ok(hover)
}

/// Axis cursor for a resize handle, accounting for frame rotation by
/// bucketing the rotated handle direction into the four resize axes.
fn resize_cursor(handle: ResizeHandle, rotation: f32) -> CursorKind {
    use std::f32::consts::PI;
    let dir = handle.anchor().rotated(rotation);
    let angle = dir.y.atan2(dir.x).rem_euclid(PI);
    let bucket = ((angle / (PI / 4.0)).round() as usize) % 4;
    match bucket {
        0 => CursorKind::ResizeEw,
        1 => CursorKind::ResizeNwSe,
        2 => CursorKind::ResizeNs,
        _ => CursorKind::ResizeNeSw,
    }
}
