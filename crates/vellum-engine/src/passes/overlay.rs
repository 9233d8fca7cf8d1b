//! Overlay pass: the interactive layer above the split.
//!
//! Sub-order is fixed so later chrome visually wins: split-and-above
//! elements (previews applied), connector annotations, selection
//! outline and handles, and finally the box-selection marquee.

use vellum_model::{Color, InteractionState};

use super::{FrameInput, Surface};
use crate::compose::{compose_scene, ComposeInput};
use crate::connect::{ConnectorCache, StrokeCache};
use crate::coords::{Rect, RotatedRect, Vec2};
use crate::dlist::{DisplayList, DrawOp, PolylineOp, ShapeOp};
use crate::hit::{selection_frame, selection_handles, HandleKind};
use crate::key::{should_repaint, OverlayPassKey, PreviewStamp};
use crate::split::compute_split;

const STROKE_CACHE_CAPACITY: usize = 32;

pub struct OverlayPass {
    last_key: Option<OverlayPassKey>,
    connectors: ConnectorCache,
    strokes: StrokeCache,
}

impl Default for OverlayPass {
    fn default() -> Self {
        Self {
            last_key: None,
            connectors: ConnectorCache::new(),
            strokes: StrokeCache::new(STROKE_CACHE_CAPACITY),
        }
    }
}

impl OverlayPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops derived caches; the next paint rebuilds them.
    pub fn invalidate(&mut self) {
        self.connectors.invalidate();
        self.last_key = None;
    }

    /// Paints the interactive layer if its key changed since the last
    /// paint. Returns whether anything was painted.
    pub fn paint(&mut self, input: &FrameInput<'_>, surface: &mut Surface<'_, '_>) -> bool {
        let split = compute_split(input.snapshot, input.selection, input.interaction);
        let key = OverlayPassKey {
            doc_version: input.snapshot.version(),
            camera: input.camera,
            scale_factor: input.scale_factor,
            viewport: input.viewport,
            split,
            previews: PreviewStamp::of(input.overrides),
            style: input.style.clone(),
            locale: input.locale.map(str::to_owned),
            gpu_caps: input.gpu_caps,
            selection: input.selection.clone(),
            hover: input.hover,
            interaction: input.interaction,
            box_selection: input.box_selection,
        };
        if !should_repaint(self.last_key.as_ref(), &key) {
            return false;
        }

        let elements = input.snapshot.elements();
        let start = split.unwrap_or(elements.len());

        let mut list = compose_scene(&ComposeInput {
            elements: &elements[start..],
            overrides: input.overrides,
            camera: input.camera,
            viewport: input.viewport,
            style: input.style,
            fonts: input.fonts,
        });
        self.push_connectors(&mut list, input);
        push_selection_chrome(&mut list, input);
        push_box_selection(&mut list, input);

        log::trace!("overlay pass repaint, {} ops from split {:?}", list.len(), split);
        surface.replay(&list, input.fonts, input.scale_factor);
        self.last_key = Some(key);
        true
    }

    /// Marker→text connector lines, drawn at constant screen width.
    fn push_connectors(&mut self, list: &mut DisplayList, input: &FrameInput<'_>) {
        for connector in self.connectors.resolve(input.snapshot, input.overrides) {
            let g = &connector.geometry;
            let stroke = self.strokes.get(g.color, g.width);
            list.push(DrawOp::Polyline(PolylineOp {
                points: vec![
                    input.camera.world_to_screen(g.from),
                    input.camera.world_to_screen(g.to),
                ],
                width: stroke.width,
                color: stroke.color,
            }));
        }
    }
}

/// Selection outline plus resize/rotate handles, placed exactly where
/// the hit-tester probes them.
fn push_selection_chrome(list: &mut DisplayList, input: &FrameInput<'_>) {
    if !matches!(
        input.interaction,
        InteractionState::Idle | InteractionState::Editing
    ) {
        return;
    }
    let Some(frame) = selection_frame(input.snapshot, input.overrides, input.selection) else {
        return;
    };
    let screen = RotatedRect::new(input.camera.rect_to_screen(frame.rect), frame.rotation);
    let sel = &input.style.selection;

    list.push(DrawOp::Shape(ShapeOp {
        rect: screen.rect,
        rotation: screen.rotation,
        corner_radius: 0.0,
        fill: Color::transparent(),
        stroke: sel.outline_color,
        stroke_width: sel.outline_width,
    }));

    let size = sel.handle_size;
    for handle in selection_handles(screen.rect, screen.rotation, input.style) {
        // The rotate handle reads as a disc, resize handles as squares.
        let corner_radius = match handle.kind {
            HandleKind::Rotate => size * 0.5,
            _ => 0.0,
        };
        list.push(DrawOp::Shape(ShapeOp {
            rect: Rect::from_origin_size(
                handle.center - Vec2::new(size * 0.5, size * 0.5),
                Vec2::new(size, size),
            ),
            rotation: screen.rotation,
            corner_radius,
            fill: sel.handle_fill,
            stroke: sel.outline_color,
            stroke_width: 1.0,
        }));
    }
}

fn push_box_selection(list: &mut DisplayList, input: &FrameInput<'_>) {
    let Some(rect) = input.box_selection else {
        return;
    };
    if !matches!(input.interaction, InteractionState::BoxSelecting) {
        return;
    }
    let style = &input.style.box_selection;
    list.push(DrawOp::Shape(ShapeOp {
        rect,
        rotation: 0.0,
        corner_radius: 0.0,
        fill: style.fill,
        stroke: style.stroke,
        stroke_width: style.stroke_width,
    }));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vellum_model::{
        Camera, DocVersion, DocumentSnapshot, ElementId, PreviewOverrides, RectShape,
        SceneElement, Selection, SerialMarkerShape, StyleConfig, TextShape, VisualPayload,
    };

    use super::*;
    use crate::coords::Viewport;
    use crate::key::GpuCaps;
    use crate::raster::Pixmap;
    use crate::text::FontSystem;

    fn rect_el(id: u64, z: u32, rect: Rect) -> SceneElement {
        SceneElement {
            id: ElementId(id),
            local_rect: rect,
            rotation: 0.0,
            opacity: 1.0,
            z_index: z,
            payload: VisualPayload::Rect(RectShape {
                fill: Some(Color::from_straight(1.0, 0.0, 0.0, 1.0)),
                stroke: None,
                stroke_width: 0.0,
                corner_radius: 0.0,
            }),
        }
    }

    fn marker_el(id: u64, z: u32, rect: Rect, bound: Option<ElementId>) -> SceneElement {
        SceneElement {
            id: ElementId(id),
            local_rect: rect,
            rotation: 0.0,
            opacity: 1.0,
            z_index: z,
            payload: VisualPayload::SerialMarker(SerialMarkerShape {
                number: 1,
                bound_text: bound,
                color: Color::from_straight(0.9, 0.2, 0.2, 1.0),
            }),
        }
    }

    fn text_el(id: u64, z: u32, rect: Rect) -> SceneElement {
        SceneElement {
            id: ElementId(id),
            local_rect: rect,
            rotation: 0.0,
            opacity: 1.0,
            z_index: z,
            payload: VisualPayload::Text(TextShape {
                content: "note".into(),
                font_size: 14.0,
                color: Color::from_straight(0.0, 0.0, 0.0, 1.0),
            }),
        }
    }

    struct Fixture {
        snapshot: DocumentSnapshot,
        overrides: PreviewOverrides,
        style: Arc<StyleConfig>,
        selection: Selection,
        interaction: InteractionState,
        box_selection: Option<Rect>,
        fonts: FontSystem,
    }

    impl Fixture {
        fn new(elements: Vec<SceneElement>) -> Self {
            let mut style = StyleConfig::default();
            style.grid.enabled = false;
            Self {
                snapshot: DocumentSnapshot::new(DocVersion(1), elements),
                overrides: PreviewOverrides::new(),
                style: Arc::new(style),
                selection: Selection::default(),
                interaction: InteractionState::Idle,
                box_selection: None,
                fonts: FontSystem::new(),
            }
        }

        fn input(&self) -> FrameInput<'_> {
            FrameInput {
                snapshot: &self.snapshot,
                overrides: &self.overrides,
                camera: Camera::default(),
                viewport: Viewport::new(200.0, 200.0),
                scale_factor: 1.0,
                style: &self.style,
                locale: None,
                selection: &self.selection,
                interaction: self.interaction,
                hover: None,
                box_selection: self.box_selection,
                fonts: &self.fonts,
                gpu_caps: GpuCaps::default(),
            }
        }
    }

    // ── repaint gate ──────────────────────────────────────────────────────

    #[test]
    fn unchanged_key_skips_the_second_paint() {
        let fx = Fixture::new(vec![rect_el(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0))]);
        let mut pass = OverlayPass::new();
        let mut pm = Pixmap::new(200, 200);

        assert!(pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm }));
        assert!(!pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm }));
    }

    #[test]
    fn hover_change_repaints() {
        let fx = Fixture::new(vec![rect_el(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0))]);
        let mut pass = OverlayPass::new();
        let mut pm = Pixmap::new(200, 200);

        assert!(pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm }));
        let mut input = fx.input();
        input.hover = Some(ElementId(1));
        assert!(pass.paint(&input, &mut Surface::Cpu { pixmap: &mut pm }));
    }

    // ── split partition ───────────────────────────────────────────────────

    #[test]
    fn only_selected_range_is_painted() {
        let mut fx = Fixture::new(vec![
            rect_el(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0)),
            rect_el(2, 1, Rect::new(50.0, 50.0, 20.0, 20.0)),
        ]);
        fx.selection = Selection::from_ids([ElementId(2)]);
        fx.interaction = InteractionState::BoxSelecting; // suppress chrome
        let mut pass = OverlayPass::new();
        let mut pm = Pixmap::new(200, 200);
        pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm });

        // Below-split rect is the static pass's job.
        assert_eq!(pm.pixel(10, 10), [0, 0, 0, 0]);
        assert_eq!(pm.pixel(60, 60), [255, 0, 0, 255]);
    }

    // ── connectors ────────────────────────────────────────────────────────

    #[test]
    fn bound_marker_draws_a_connector_line() {
        let fx = Fixture::new(vec![
            text_el(1, 0, Rect::new(100.0, 40.0, 60.0, 40.0)),
            marker_el(2, 1, Rect::new(0.0, 50.0, 20.0, 20.0), Some(ElementId(1))),
        ]);
        let mut pass = OverlayPass::new();
        let mut pm = Pixmap::new(200, 200);
        pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm });

        // The connector runs horizontally from the disc edge (20, 60)
        // to the text box edge (100, 60).
        assert!(pm.pixel(60, 60)[3] > 0, "expected connector ink between marker and text");
    }

    // ── selection chrome ──────────────────────────────────────────────────

    #[test]
    fn selection_outline_is_drawn_when_idle() {
        let mut fx = Fixture::new(vec![rect_el(1, 0, Rect::new(40.0, 40.0, 40.0, 40.0))]);
        fx.selection = Selection::from_ids([ElementId(1)]);
        let mut pass = OverlayPass::new();
        let mut pm = Pixmap::new(200, 200);
        pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm });

        // Outline ink on the frame's top edge, away from any handle.
        assert!(pm.pixel(50, 40)[3] > 0);
    }

    #[test]
    fn chrome_is_suppressed_while_box_selecting() {
        let mut fx = Fixture::new(vec![rect_el(1, 0, Rect::new(40.0, 40.0, 40.0, 40.0))]);
        fx.selection = Selection::from_ids([ElementId(1)]);
        fx.interaction = InteractionState::BoxSelecting;

        let mut list = DisplayList::new();
        push_selection_chrome(&mut list, &fx.input());
        assert!(list.is_empty());
    }

    #[test]
    fn handle_count_matches_the_hit_tester() {
        let style = StyleConfig::default();
        let handles = selection_handles(Rect::new(0.0, 0.0, 40.0, 40.0), 0.0, &style);
        // 8 resize + 1 rotate.
        assert_eq!(handles.len(), 9);

        let mut fx = Fixture::new(vec![rect_el(1, 0, Rect::new(40.0, 40.0, 40.0, 40.0))]);
        fx.selection = Selection::from_ids([ElementId(1)]);
        let mut list = DisplayList::new();
        push_selection_chrome(&mut list, &fx.input());
        // Outline + 9 handles.
        assert_eq!(list.len(), 10);
    }

    #[test]
    fn chrome_follows_previewed_geometry() {
        let mut fx = Fixture::new(vec![rect_el(1, 0, Rect::new(10.0, 10.0, 20.0, 20.0))]);
        fx.selection = Selection::from_ids([ElementId(1)]);
        fx.interaction = InteractionState::Editing;
        fx.overrides.insert(rect_el(1, 0, Rect::new(150.0, 150.0, 20.0, 20.0)));
        let mut pass = OverlayPass::new();
        let mut pm = Pixmap::new(200, 200);
        pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm });

        // Outline ink on the previewed frame's top edge, none anywhere
        // in the quadrant the drag vacated.
        assert!(pm.pixel(160, 150)[3] > 0);
        for y in 0..60 {
            for x in 0..60 {
                assert_eq!(pm.pixel(x, y), [0, 0, 0, 0], "stale chrome at ({x}, {y})");
            }
        }
    }

    // ── marquee ───────────────────────────────────────────────────────────

    #[test]
    fn marquee_is_the_last_op() {
        let mut fx = Fixture::new(vec![rect_el(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0))]);
        fx.selection = Selection::from_ids([ElementId(1)]);
        fx.interaction = InteractionState::BoxSelecting;
        fx.box_selection = Some(Rect::new(10.0, 10.0, 80.0, 60.0));
        let mut pass = OverlayPass::new();
        let mut pm = Pixmap::new(200, 200);
        pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm });

        // Marquee fill ink inside the marquee, away from the element.
        assert!(pm.pixel(70, 30)[3] > 0);
    }

    #[test]
    fn marquee_requires_box_selecting_state() {
        let mut fx = Fixture::new(vec![]);
        fx.box_selection = Some(Rect::new(10.0, 10.0, 80.0, 60.0));
        let mut list = DisplayList::new();
        push_box_selection(&mut list, &fx.input());
        assert!(list.is_empty());
    }

    // ── preview-touched connector geometry ────────────────────────────────

    #[test]
    fn preview_moving_text_repaints_with_fresh_geometry() {
        let mut fx = Fixture::new(vec![
            text_el(1, 0, Rect::new(100.0, 40.0, 60.0, 40.0)),
            marker_el(2, 1, Rect::new(0.0, 50.0, 20.0, 20.0), Some(ElementId(1))),
        ]);
        let mut pass = OverlayPass::new();
        let mut pm = Pixmap::new(200, 200);
        assert!(pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm }));

        // Moving the text via preview changes the stamp, so the pass
        // repaints and resolves fresh geometry for the bound marker.
        fx.overrides.insert(text_el(1, 0, Rect::new(120.0, 40.0, 60.0, 40.0)));
        assert!(pass.paint(&fx.input(), &mut Surface::Cpu { pixmap: &mut pm }));
    }
}
