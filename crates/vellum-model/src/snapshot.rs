use std::collections::HashMap;

use crate::element::SceneElement;
use crate::id::{DocVersion, ElementId};

/// Immutable view of the document at one version.
///
/// Elements are kept sorted ascending by `z_index`; the engine walks them
/// front-to-back or back-to-front by slice order alone.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    version: DocVersion,
    elements: Vec<SceneElement>,
    by_id: HashMap<ElementId, usize>,
}

impl DocumentSnapshot {
    /// Builds a snapshot, sorting `elements` by `z_index`.
    ///
    /// Duplicate ids keep the last occurrence in the index; the document
    /// store guarantees uniqueness, so this is defensive only for tests.
    pub fn new(version: DocVersion, mut elements: Vec<SceneElement>) -> Self {
        elements.sort_by_key(|e| e.z_index);
        let by_id = elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        Self { version, elements, by_id }
    }

    #[inline]
    pub fn version(&self) -> DocVersion {
        self.version
    }

    /// Elements in ascending z order.
    #[inline]
    pub fn elements(&self) -> &[SceneElement] {
        &self.elements
    }

    #[inline]
    pub fn get(&self, id: ElementId) -> Option<&SceneElement> {
        self.by_id.get(&id).map(|&i| &self.elements[i])
    }

    /// Position of `id` in document order (the slice index).
    #[inline]
    pub fn order_of(&self, id: ElementId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
