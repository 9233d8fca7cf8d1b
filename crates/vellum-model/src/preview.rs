use std::collections::HashMap;

use crate::element::SceneElement;
use crate::id::ElementId;

/// Uncommitted edits, keyed by element id.
///
/// A preview exists while an interaction (drag, resize, style change) is
/// in flight: it is applied over committed elements at render and hit
/// time but never merged into the document. Created when the interaction
/// begins, cleared when it commits or cancels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewOverrides {
    map: HashMap<ElementId, SceneElement>,
}

impl PreviewOverrides {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn insert(&mut self, element: SceneElement) {
        self.map.insert(element.id, element);
    }

    #[inline]
    pub fn remove(&mut self, id: ElementId) {
        self.map.remove(&id);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.map.clear();
    }

    #[inline]
    pub fn get(&self, id: ElementId) -> Option<&SceneElement> {
        self.map.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: ElementId) -> bool {
        self.map.contains_key(&id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.map.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ElementId, &SceneElement)> {
        self.map.iter()
    }
}
