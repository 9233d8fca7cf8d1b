use std::collections::HashSet;

use crate::id::ElementId;

/// The set of currently selected element ids.
///
/// Insertion order is preserved so selection chrome can be drawn in a
/// stable order; membership tests go through the hash set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<ElementId>,
    set: HashSet<ElementId>,
}

impl Selection {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = ElementId>) -> Self {
        let mut s = Self::new();
        for id in ids {
            s.insert(id);
        }
        s
    }

    pub fn insert(&mut self, id: ElementId) {
        if self.set.insert(id) {
            self.ids.push(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.set.clear();
    }

    #[inline]
    pub fn contains(&self, id: ElementId) -> bool {
        self.set.contains(&id)
    }

    #[inline]
    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The selected id when exactly one element is selected.
    #[inline]
    pub fn single(&self) -> Option<ElementId> {
        if self.ids.len() == 1 { Some(self.ids[0]) } else { None }
    }
}
