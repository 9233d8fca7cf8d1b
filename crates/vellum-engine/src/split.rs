//! Static/dynamic layer partition.
//!
//! The split index is the boundary over document order-indices:
//! elements at or above it render on the interactive pass this frame,
//! elements below on the persistent pass. `None` means no split —
//! everything is static.
//!
//! Widening is deliberately conservative: filters and highlight masks
//! composite against everything beneath them, and selection chrome sits
//! visually between layers, so any filter/highlight at or above the
//! selection moves the whole scene to the dynamic pass. Cheaper to
//! redraw than to ever let a static-layer filter miss content above it.

use vellum_model::{DocumentSnapshot, ElementKind, InteractionState, Selection};

/// Computes the layer split for the current frame.
pub fn compute_split(
    snapshot: &DocumentSnapshot,
    selection: &Selection,
    interaction: InteractionState,
) -> Option<usize> {
    // A brand-new highlight or text element has no committed z yet; the
    // whole scene goes dynamic until it commits.
    if interaction.is_creating(ElementKind::Highlight)
        || interaction.is_creating(ElementKind::Text)
        || interaction == InteractionState::TextEditing
    {
        return Some(0);
    }

    let start = selection
        .ids()
        .iter()
        .filter_map(|&id| snapshot.order_of(id))
        .min()?;

    // Forward scan: a filter or highlight anywhere at/above the
    // selection must re-composite against the moving content below it.
    let widen = snapshot.elements()[start..]
        .iter()
        .any(|e| e.is_filter() || e.is_highlight());

    if widen { Some(0) } else { Some(start) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::{
        Color, DocVersion, ElementId, FilterKind, FilterShape, HighlightRegion, HighlightShape,
        Rect, RectShape, SceneElement, VisualPayload,
    };

    fn element(id: u64, z: u32, payload: VisualPayload) -> SceneElement {
        SceneElement {
            id: ElementId(id),
            local_rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            rotation: 0.0,
            opacity: 1.0,
            z_index: z,
            payload,
        }
    }

    fn rect(id: u64, z: u32) -> SceneElement {
        element(
            id,
            z,
            VisualPayload::Rect(RectShape {
                fill: Some(Color::from_straight(1.0, 0.0, 0.0, 1.0)),
                stroke: None,
                stroke_width: 0.0,
                corner_radius: 0.0,
            }),
        )
    }

    fn highlight(id: u64, z: u32) -> SceneElement {
        element(
            id,
            z,
            VisualPayload::Highlight(HighlightShape {
                region: HighlightRegion::Rect,
                stroke_width: 2.0,
            }),
        )
    }

    fn filter(id: u64, z: u32) -> SceneElement {
        element(
            id,
            z,
            VisualPayload::Filter(FilterShape { kind: FilterKind::Blur, strength: 0.5 }),
        )
    }

    fn snap(elements: Vec<SceneElement>) -> DocumentSnapshot {
        DocumentSnapshot::new(DocVersion(1), elements)
    }

    #[test]
    fn no_selection_means_no_split() {
        let s = snap(vec![rect(1, 0), rect(2, 1)]);
        assert_eq!(compute_split(&s, &Selection::new(), InteractionState::Idle), None);
    }

    #[test]
    fn split_starts_at_min_selected_index() {
        let s = snap(vec![rect(1, 0), rect(2, 1), rect(3, 2)]);
        let sel = Selection::from_ids([ElementId(3), ElementId(2)]);
        assert_eq!(compute_split(&s, &sel, InteractionState::Idle), Some(1));
    }

    #[test]
    fn filter_above_selection_widens_to_zero() {
        let s = snap(vec![rect(1, 0), rect(2, 1), filter(3, 2)]);
        let sel = Selection::from_ids([ElementId(2)]);
        assert_eq!(compute_split(&s, &sel, InteractionState::Idle), Some(0));
    }

    #[test]
    fn highlight_at_any_index_above_selection_widens_to_zero() {
        // Conservativeness: for any state with a highlight at z >= the
        // selected element's index, the split resolves to 0.
        // Rects at even z; the highlight slots in at each odd z above
        // the selected element (id 2, z 2) without displacing it.
        for hz in [3u32, 5, 7] {
            let mut elements = vec![rect(1, 0), rect(2, 2), rect(3, 4), rect(4, 6)];
            elements.push(highlight(10, hz));
            let s = snap(elements);
            let sel = Selection::from_ids([ElementId(2)]);
            let split = compute_split(&s, &sel, InteractionState::Idle);
            assert_eq!(split, Some(0), "highlight at z={hz}");
        }
    }

    #[test]
    fn filter_below_selection_does_not_widen() {
        let s = snap(vec![filter(1, 0), rect(2, 1), rect(3, 2)]);
        let sel = Selection::from_ids([ElementId(3)]);
        assert_eq!(compute_split(&s, &sel, InteractionState::Idle), Some(2));
    }

    #[test]
    fn creating_highlight_forces_zero() {
        let s = snap(vec![rect(1, 0)]);
        let split = compute_split(
            &s,
            &Selection::new(),
            InteractionState::Creating(ElementKind::Highlight),
        );
        assert_eq!(split, Some(0));
    }

    #[test]
    fn new_text_edit_forces_zero() {
        let s = snap(vec![rect(1, 0)]);
        assert_eq!(
            compute_split(&s, &Selection::new(), InteractionState::Creating(ElementKind::Text)),
            Some(0)
        );
        assert_eq!(
            compute_split(&s, &Selection::new(), InteractionState::TextEditing),
            Some(0)
        );
    }

    #[test]
    fn stale_selection_ids_are_ignored() {
        let s = snap(vec![rect(1, 0)]);
        let sel = Selection::from_ids([ElementId(99)]);
        assert_eq!(compute_split(&s, &sel, InteractionState::Idle), None);
    }
}
