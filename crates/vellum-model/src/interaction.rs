/// Element type tag, used for interaction states and tool filters.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ElementKind {
    Rect,
    Arrow,
    Freehand,
    Text,
    Highlight,
    Filter,
    SerialMarker,
}

/// What the user is currently doing with the surface.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InteractionState {
    Idle,
    /// Dragging out a new element of the given kind.
    Creating(ElementKind),
    /// Moving / resizing / restyling existing elements.
    Editing,
    /// A text element is open for typing.
    TextEditing,
    /// Dragging a box-selection marquee.
    BoxSelecting,
}

impl InteractionState {
    #[inline]
    pub fn is_creating(self, kind: ElementKind) -> bool {
        matches!(self, InteractionState::Creating(k) if k == kind)
    }
}
