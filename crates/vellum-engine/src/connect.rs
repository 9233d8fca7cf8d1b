//! Derived connector annotations.
//!
//! Serial markers can bind to a text element; the engine derives a line
//! from the marker's disc edge to the text box edge. Connectors are not
//! document elements, so their geometry is cached here and invalidated
//! against the document version.

use std::collections::HashMap;
use std::sync::Arc;

use vellum_model::{
    Color, DocVersion, DocumentSnapshot, ElementId, PreviewOverrides, Rect, SceneElement, Vec2,
    VisualPayload,
};

/// Stroke width used for connector lines, in world units.
pub const CONNECTOR_WIDTH: f32 = 1.5;

/// World-space geometry of one marker→text connector line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorGeometry {
    /// Point on the marker disc edge.
    pub from: Vec2,
    /// Point on the text box edge.
    pub to: Vec2,
    pub color: Color,
    pub width: f32,
}

/// A resolved connector, ready for the overlay pass.
#[derive(Debug, Clone)]
pub struct Connector {
    pub marker: ElementId,
    pub geometry: Arc<ConnectorGeometry>,
}

#[derive(Debug)]
struct Indexed {
    version: DocVersion,
    /// marker → bound text, dangling and mistyped bindings dropped.
    forward: Vec<(ElementId, ElementId)>,
    /// text → markers bound to it.
    reverse: HashMap<ElementId, Vec<ElementId>>,
    /// Geometry for markers untouched by previews at this version.
    geometry: HashMap<ElementId, Arc<ConnectorGeometry>>,
}

/// Cache of derived connector geometry, valid for one document version.
///
/// `resolve` rebuilds the binding indices whenever the snapshot version
/// differs from the indexed one in either direction, so undo steps
/// invalidate just like forward edits. Between rebuilds, only markers
/// touched by preview overrides (directly, or through the text they bind
/// to) are recomputed; every other marker hands back the same `Arc` it
/// handed back last frame.
#[derive(Debug, Default)]
pub struct ConnectorCache {
    indexed: Option<Indexed>,
}

impl ConnectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything; the next `resolve` rebuilds from scratch.
    pub fn invalidate(&mut self) {
        self.indexed = None;
    }

    /// Resolves all connectors for the frame, in document order of the
    /// markers.
    pub fn resolve(
        &mut self,
        snapshot: &DocumentSnapshot,
        overrides: &PreviewOverrides,
    ) -> Vec<Connector> {
        let stale = self
            .indexed
            .as_ref()
            .is_none_or(|ix| ix.version != snapshot.version());
        let ix = if stale {
            self.indexed.insert(Self::build_indices(snapshot))
        } else {
            match self.indexed.as_mut() {
                Some(ix) => ix,
                None => return Vec::new(),
            }
        };

        let mut out = Vec::with_capacity(ix.forward.len());
        for &(marker_id, text_id) in &ix.forward {
            let touched = overrides.contains(marker_id) || overrides.contains(text_id);
            let geometry = if touched {
                let marker = overrides.get(marker_id).or_else(|| snapshot.get(marker_id));
                let text = overrides.get(text_id).or_else(|| snapshot.get(text_id));
                match (marker, text) {
                    (Some(m), Some(t)) => connector_geometry(m, t).map(Arc::new),
                    _ => None,
                }
            } else if let Some(cached) = ix.geometry.get(&marker_id) {
                Some(Arc::clone(cached))
            } else {
                let computed = snapshot
                    .get(marker_id)
                    .zip(snapshot.get(text_id))
                    .and_then(|(m, t)| connector_geometry(m, t))
                    .map(Arc::new);
                if let Some(g) = &computed {
                    ix.geometry.insert(marker_id, Arc::clone(g));
                }
                computed
            };
            if let Some(geometry) = geometry {
                out.push(Connector { marker: marker_id, geometry });
            }
        }
        out
    }

    fn build_indices(snapshot: &DocumentSnapshot) -> Indexed {
        let mut forward = Vec::new();
        let mut reverse: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
        for element in snapshot.elements() {
            let VisualPayload::SerialMarker(marker) = &element.payload else {
                continue;
            };
            let Some(text_id) = marker.bound_text else {
                continue;
            };
            // A binding surviving a delete, or retargeted to a non-text
            // element, is silently dropped from the indices.
            let bound_is_text = snapshot
                .get(text_id)
                .is_some_and(|t| matches!(t.payload, VisualPayload::Text(_)));
            if !bound_is_text {
                log::debug!(
                    "dropping connector binding {:?} -> {:?} (dangling or non-text)",
                    element.id,
                    text_id
                );
                continue;
            }
            forward.push((element.id, text_id));
            reverse.entry(text_id).or_default().push(element.id);
        }
        Indexed {
            version: snapshot.version(),
            forward,
            reverse,
            geometry: HashMap::new(),
        }
    }

    /// Markers whose connector depends on `text_id`, per the reverse index.
    pub fn markers_bound_to(&self, text_id: ElementId) -> &[ElementId] {
        self.indexed
            .as_ref()
            .and_then(|ix| ix.reverse.get(&text_id))
            .map_or(&[], Vec::as_slice)
    }
}

/// Line from the marker disc edge to the bound text box edge, along the
/// segment joining their centers. `None` when the centers coincide or the
/// marker center sits inside the text box.
pub fn connector_geometry(
    marker: &SceneElement,
    text: &SceneElement,
) -> Option<ConnectorGeometry> {
    let color = match &marker.payload {
        VisualPayload::SerialMarker(m) => m.color,
        _ => return None,
    };
    let disc_center = marker.local_rect.center();
    let radius = marker.local_rect.size.x.min(marker.local_rect.size.y) * 0.5;
    let text_rect = text.local_rect;
    if text_rect.contains(disc_center) {
        return None;
    }
    let text_center = text_rect.center();
    let dir = text_center - disc_center;
    let len = dir.length();
    if len <= radius {
        return None;
    }
    let dir = Vec2::new(dir.x / len, dir.y / len);
    let from = disc_center + dir * radius;
    let to = rect_edge_toward(text_rect, disc_center)?;
    Some(ConnectorGeometry { from, to, color, width: CONNECTOR_WIDTH })
}

/// Intersection of the segment from `outside` to the rect center with the
/// rect boundary.
fn rect_edge_toward(rect: Rect, outside: Vec2) -> Option<Vec2> {
    let center = rect.center();
    let d = center - outside;
    if d.x == 0.0 && d.y == 0.0 {
        return None;
    }
    // Entry parameter along outside + t*d over both slabs.
    let mut t_entry = 0.0f32;
    for (o, dir, lo, hi) in [
        (outside.x, d.x, rect.min().x, rect.max().x),
        (outside.y, d.y, rect.min().y, rect.max().y),
    ] {
        if dir == 0.0 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let t0 = (lo - o) / dir;
        let t1 = (hi - o) / dir;
        t_entry = t_entry.max(t0.min(t1));
    }
    if !(0.0..=1.0).contains(&t_entry) {
        return None;
    }
    Some(outside + d * t_entry)
}

// ── stroke style cache ──────────────────────────────────────────────

/// A memoized stroke style for line painting.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct StrokeKey {
    color: [u32; 4],
    width: u32,
}

impl StrokeKey {
    fn new(color: Color, width: f32) -> Self {
        Self {
            color: [
                color.r.to_bits(),
                color.g.to_bits(),
                color.b.to_bits(),
                color.a.to_bits(),
            ],
            width: width.to_bits(),
        }
    }
}

/// Bounded LRU of stroke styles keyed by `(color, width)`.
///
/// Connector painting asks for the same handful of styles every frame;
/// the bound only matters against pathological documents cycling through
/// many colors.
#[derive(Debug)]
pub struct StrokeCache {
    capacity: usize,
    tick: u64,
    entries: HashMap<StrokeKey, (u64, Arc<StrokeStyle>)>,
}

impl StrokeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, color: Color, width: f32) -> Arc<StrokeStyle> {
        let key = StrokeKey::new(color, width);
        self.tick += 1;
        if let Some((stamp, style)) = self.entries.get_mut(&key) {
            *stamp = self.tick;
            return Arc::clone(style);
        }
        if self.entries.len() >= self.capacity {
            if let Some(&oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, (stamp, _))| *stamp)
                .map(|(k, _)| k)
            {
                self.entries.remove(&oldest);
            }
        }
        let style = Arc::new(StrokeStyle { color, width });
        self.entries.insert(key, (self.tick, Arc::clone(&style)));
        style
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StrokeCache {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::{Rect, SerialMarkerShape, TextShape};

    fn marker(id: u64, z: u32, rect: Rect, bound: Option<ElementId>) -> SceneElement {
        SceneElement {
            id: ElementId(id),
            local_rect: rect,
            rotation: 0.0,
            opacity: 1.0,
            z_index: z,
            payload: VisualPayload::SerialMarker(SerialMarkerShape {
                number: 1,
                bound_text: bound,
                color: Color::from_srgb_u8(200, 40, 40, 255),
            }),
        }
    }

    fn text(id: u64, z: u32, rect: Rect) -> SceneElement {
        SceneElement {
            id: ElementId(id),
            local_rect: rect,
            rotation: 0.0,
            opacity: 1.0,
            z_index: z,
            payload: VisualPayload::Text(TextShape {
                content: "note".into(),
                font_size: 14.0,
                color: Color::from_srgb_u8(0, 0, 0, 255),
            }),
        }
    }

    fn snap(version: u64, elements: Vec<SceneElement>) -> DocumentSnapshot {
        DocumentSnapshot::new(DocVersion(version), elements)
    }

    // ── geometry ────────────────────────────────────────────────────

    #[test]
    fn connector_runs_from_disc_edge_to_box_edge() {
        let m = marker(1, 0, Rect::new(0.0, 40.0, 20.0, 20.0), Some(ElementId(2)));
        let t = text(2, 1, Rect::new(100.0, 30.0, 60.0, 40.0));
        let g = connector_geometry(&m, &t).unwrap();
        // Horizontal layout: disc center (10, 50), text center (130, 50).
        assert!((g.from.x - 20.0).abs() < 1e-4);
        assert!((g.from.y - 50.0).abs() < 1e-4);
        assert!((g.to.x - 100.0).abs() < 1e-4);
        assert!((g.to.y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn marker_inside_text_box_yields_no_connector() {
        let m = marker(1, 0, Rect::new(110.0, 40.0, 10.0, 10.0), Some(ElementId(2)));
        let t = text(2, 1, Rect::new(100.0, 30.0, 60.0, 40.0));
        assert!(connector_geometry(&m, &t).is_none());
    }

    // ── cache behavior ──────────────────────────────────────────────

    #[test]
    fn untouched_connectors_are_identity_stable() {
        let s = snap(
            1,
            vec![
                marker(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0), Some(ElementId(3))),
                marker(2, 1, Rect::new(0.0, 100.0, 20.0, 20.0), Some(ElementId(3))),
                text(3, 2, Rect::new(200.0, 40.0, 60.0, 40.0)),
            ],
        );
        let mut cache = ConnectorCache::new();
        let none = PreviewOverrides::new();
        let a = cache.resolve(&s, &none);
        let b = cache.resolve(&s, &none);
        assert_eq!(a.len(), 2);
        for (ca, cb) in a.iter().zip(&b) {
            assert!(Arc::ptr_eq(&ca.geometry, &cb.geometry));
        }
    }

    #[test]
    fn version_change_drops_cached_geometry() {
        let elements = vec![
            marker(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0), Some(ElementId(2))),
            text(2, 1, Rect::new(200.0, 0.0, 60.0, 40.0)),
        ];
        let mut cache = ConnectorCache::new();
        let none = PreviewOverrides::new();
        let a = cache.resolve(&snap(1, elements.clone()), &none);
        // Version moved backwards (undo); still a rebuild.
        let b = cache.resolve(&snap(0, elements), &none);
        assert!(!Arc::ptr_eq(&a[0].geometry, &b[0].geometry));
        assert_eq!(a[0].geometry, b[0].geometry);
    }

    #[test]
    fn preview_on_text_recomputes_only_bound_markers() {
        let s = snap(
            1,
            vec![
                marker(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0), Some(ElementId(3))),
                marker(2, 1, Rect::new(0.0, 200.0, 20.0, 20.0), Some(ElementId(4))),
                text(3, 2, Rect::new(200.0, 0.0, 60.0, 40.0)),
                text(4, 3, Rect::new(200.0, 200.0, 60.0, 40.0)),
            ],
        );
        let mut cache = ConnectorCache::new();
        let none = PreviewOverrides::new();
        let before = cache.resolve(&s, &none);

        let mut overrides = PreviewOverrides::new();
        overrides.insert(text(3, 2, Rect::new(300.0, 0.0, 60.0, 40.0)));
        let during = cache.resolve(&s, &overrides);

        // Marker 1's text moved: new geometry. Marker 2 untouched: same Arc.
        assert!(!Arc::ptr_eq(&before[0].geometry, &during[0].geometry));
        assert!((during[0].geometry.to.x - 300.0).abs() < 1e-4);
        assert!(Arc::ptr_eq(&before[1].geometry, &during[1].geometry));

        // Preview cleared: the cached geometry comes straight back.
        let after = cache.resolve(&s, &none);
        assert!(Arc::ptr_eq(&before[0].geometry, &after[0].geometry));
    }

    #[test]
    fn dangling_and_mistyped_bindings_are_skipped() {
        let s = snap(
            1,
            vec![
                marker(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0), Some(ElementId(99))),
                marker(2, 1, Rect::new(0.0, 50.0, 20.0, 20.0), Some(ElementId(2))),
                marker(3, 2, Rect::new(0.0, 100.0, 20.0, 20.0), None),
            ],
        );
        let mut cache = ConnectorCache::new();
        let out = cache.resolve(&s, &PreviewOverrides::new());
        // 99 is dangling, 2 is a marker not a text, 3 is unbound.
        assert!(out.is_empty());
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let s = snap(
            1,
            vec![
                marker(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0), Some(ElementId(2))),
                text(2, 1, Rect::new(200.0, 0.0, 60.0, 40.0)),
            ],
        );
        let mut cache = ConnectorCache::new();
        let none = PreviewOverrides::new();
        let a = cache.resolve(&s, &none);
        cache.invalidate();
        let b = cache.resolve(&s, &none);
        assert!(!Arc::ptr_eq(&a[0].geometry, &b[0].geometry));
    }

    #[test]
    fn reverse_index_lists_bound_markers() {
        let s = snap(
            1,
            vec![
                marker(1, 0, Rect::new(0.0, 0.0, 20.0, 20.0), Some(ElementId(3))),
                marker(2, 1, Rect::new(0.0, 50.0, 20.0, 20.0), Some(ElementId(3))),
                text(3, 2, Rect::new(200.0, 0.0, 60.0, 40.0)),
            ],
        );
        let mut cache = ConnectorCache::new();
        cache.resolve(&s, &PreviewOverrides::new());
        assert_eq!(cache.markers_bound_to(ElementId(3)), &[ElementId(1), ElementId(2)]);
        assert!(cache.markers_bound_to(ElementId(1)).is_empty());
    }

    // ── stroke cache ────────────────────────────────────────────────

    #[test]
    fn stroke_cache_memoizes_by_color_and_width() {
        let mut cache = StrokeCache::new(8);
        let red = Color::from_srgb_u8(255, 0, 0, 255);
        let a = cache.get(red, 2.0);
        let b = cache.get(red, 2.0);
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.get(red, 3.0);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn stroke_cache_evicts_least_recently_used() {
        let mut cache = StrokeCache::new(2);
        let red = Color::from_srgb_u8(255, 0, 0, 255);
        let green = Color::from_srgb_u8(0, 255, 0, 255);
        let blue = Color::from_srgb_u8(0, 0, 255, 255);
        let a = cache.get(red, 1.0);
        cache.get(green, 1.0);
        cache.get(red, 1.0); // red now most recent, green is LRU
        cache.get(blue, 1.0); // evicts green
        assert_eq!(cache.len(), 2);
        let a2 = cache.get(red, 1.0);
        assert!(Arc::ptr_eq(&a, &a2));
    }
}
