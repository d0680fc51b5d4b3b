//! Selection state for batch operations.
//!
//! Selection is purely advisory: it marks pages for delete/split/export but
//! carries no ordering of its own. Whenever selected pages are enumerated,
//! the enumeration follows collection order, never click order.

use std::collections::HashSet;

use crate::collection::{Collection, PageId};

/// The set of page ids currently marked for batch operations.
///
/// Always a subset of the ids present in the collection; removal APIs purge
/// this set in the same call (see [`Collection::remove`]).
#[derive(Debug, Default)]
pub struct SelectionSet {
    ids: HashSet<PageId>,
}

impl SelectionSet {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of selected pages.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the page is selected.
    pub fn contains(&self, id: PageId) -> bool {
        self.ids.contains(&id)
    }

    /// Flip a page's membership.
    ///
    /// The id must resolve against the current collection; a stale id is a
    /// no-op and returns `None`. Otherwise returns the new membership.
    pub fn toggle(&mut self, id: PageId, collection: &Collection) -> Option<bool> {
        collection.get(id)?;
        if self.ids.remove(&id) {
            Some(false)
        } else {
            self.ids.insert(id);
            Some(true)
        }
    }

    /// Select every page currently in the collection.
    pub fn select_all(&mut self, collection: &Collection) {
        self.ids = collection.ids().collect();
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub(crate) fn discard(&mut self, id: PageId) {
        self.ids.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{page, source_buffer};

    fn collection_of(count: usize) -> Collection {
        let source = source_buffer(0, "doc.pdf", count.max(1));
        let mut collection = Collection::new();
        for i in 0..count {
            collection.append(page(i as u64 + 1, &source, i));
        }
        collection
    }

    #[test]
    fn toggle_flips_membership() {
        let collection = collection_of(2);
        let mut selection = SelectionSet::new();

        assert_eq!(selection.toggle(PageId(1), &collection), Some(true));
        assert!(selection.contains(PageId(1)));
        assert_eq!(selection.toggle(PageId(1), &collection), Some(false));
        assert!(selection.is_empty());
    }

    #[test]
    fn toggle_stale_id_is_noop() {
        let collection = collection_of(1);
        let mut selection = SelectionSet::new();

        assert_eq!(selection.toggle(PageId(42), &collection), None);
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_tracks_current_collection() {
        let collection = collection_of(3);
        let mut selection = SelectionSet::new();

        selection.select_all(&collection);

        assert_eq!(selection.len(), 3);
        assert!(collection.ids().all(|id| selection.contains(id)));
    }

    #[test]
    fn clear_empties_the_set() {
        let collection = collection_of(2);
        let mut selection = SelectionSet::new();
        selection.select_all(&collection);

        selection.clear();

        assert!(selection.is_empty());
    }
}
