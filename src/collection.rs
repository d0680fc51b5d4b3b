//! The ordered page collection and its per-page state.
//!
//! A [`Collection`] is the working set the user edits: a flat, reorderable
//! sequence of [`PageRef`]s drawn from any number of source documents.
//! Insertion order is the authoritative display and export order. Entries
//! are appended at ingestion, removed on delete, and repositioned on drag;
//! they are never replaced in place.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::render::Thumbnail;
use crate::selection::SelectionSet;
use crate::source::SourceBuffer;

/// Opaque page identity, assigned at ingestion and stable for the entry's
/// lifetime. The sole key for selection, lookup, and reorder gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PageId(pub(crate) u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accumulated page rotation, independent of the source document's own
/// stored rotation.
///
/// Serializes as the bare degree string, which is what presentation layers
/// expect to slot into a CSS transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// Upright.
    #[default]
    #[serde(rename = "0")]
    R0,
    /// Quarter turn clockwise.
    #[serde(rename = "90")]
    R90,
    /// Half turn.
    #[serde(rename = "180")]
    R180,
    /// Three-quarter turn clockwise.
    #[serde(rename = "270")]
    R270,
}

impl Rotation {
    /// The next rotation step: +90 degrees, wrapping after 270.
    pub fn advanced(self) -> Self {
        match self {
            Self::R0 => Self::R90,
            Self::R90 => Self::R180,
            Self::R180 => Self::R270,
            Self::R270 => Self::R0,
        }
    }

    /// Rotation as absolute degrees.
    pub fn degrees(self) -> u16 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }
}

/// One page drawn from one source document.
///
/// Every `PageRef` from the same upload shares the same [`SourceBuffer`];
/// the buffer lives as long as any of them does.
#[derive(Debug, Clone)]
pub struct PageRef {
    id: PageId,
    source: Arc<SourceBuffer>,
    page_index: usize,
    rotation: Rotation,
    thumbnail: Thumbnail,
}

impl PageRef {
    pub(crate) fn new(
        id: PageId,
        source: Arc<SourceBuffer>,
        page_index: usize,
        thumbnail: Thumbnail,
    ) -> Self {
        debug_assert!(page_index < source.page_count());
        Self {
            id,
            source,
            page_index,
            rotation: Rotation::R0,
            thumbnail,
        }
    }

    /// Page identity.
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Shared buffer of the originating document.
    pub fn source(&self) -> &Arc<SourceBuffer> {
        &self.source
    }

    /// Display name of the originating document.
    pub fn source_label(&self) -> &str {
        self.source.label()
    }

    /// Zero-based index into the source document's page sequence.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Accumulated rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Cached, unrotated preview.
    pub fn thumbnail(&self) -> &Thumbnail {
        &self.thumbnail
    }
}

/// The ordered working set of pages.
#[derive(Debug, Default)]
pub struct Collection {
    entries: Vec<PageRef>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no pages.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pages in display/export order.
    pub fn iter(&self) -> impl Iterator<Item = &PageRef> {
        self.entries.iter()
    }

    /// Page ids in display/export order.
    pub fn ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.entries.iter().map(|page| page.id)
    }

    /// Look up a page by id.
    pub fn get(&self, id: PageId) -> Option<&PageRef> {
        self.entries.iter().find(|page| page.id == id)
    }

    /// Current position of a page, if present.
    pub fn position(&self, id: PageId) -> Option<usize> {
        self.entries.iter().position(|page| page.id == id)
    }

    pub(crate) fn append(&mut self, page: PageRef) {
        debug_assert!(self.get(page.id).is_none(), "duplicate page id");
        self.entries.push(page);
    }

    /// Remove the given pages, purging them from the selection in the same
    /// call so the subset invariant cannot be left dangling.
    ///
    /// Returns the number of pages removed. Unknown ids are ignored.
    pub fn remove(&mut self, ids: &[PageId], selection: &mut SelectionSet) -> usize {
        let before = self.entries.len();
        self.entries.retain(|page| !ids.contains(&page.id));
        for id in ids {
            selection.discard(*id);
        }
        before - self.entries.len()
    }

    /// Drop every page and clear the selection with it.
    pub fn clear(&mut self, selection: &mut SelectionSet) {
        self.entries.clear();
        selection.clear();
    }

    /// Move `id` to immediately precede `target`.
    ///
    /// A pure reordering: no page is duplicated, dropped, or otherwise
    /// mutated. Moving a page onto itself, or naming an id that no longer
    /// resolves (a drag completing against a stale identifier), is a no-op.
    ///
    /// Returns whether the collection changed.
    pub fn reposition_before(&mut self, id: PageId, target: PageId) -> bool {
        if id == target {
            return false;
        }
        let Some(from) = self.position(id) else {
            return false;
        };
        if self.position(target).is_none() {
            return false;
        }

        let page = self.entries.remove(from);
        // Recompute after the removal shifted positions; target is still
        // present because it is not the page being moved.
        let to = self
            .position(target)
            .expect("reorder target vanished mid-move");
        self.entries.insert(to, page);
        true
    }

    /// Move `id` to the given position, clamped to the sequence length.
    ///
    /// Unknown ids are a no-op. Returns whether the collection changed.
    pub fn reposition_to(&mut self, id: PageId, index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };

        let page = self.entries.remove(from);
        let to = index.min(self.entries.len());
        self.entries.insert(to, page);
        from != to
    }

    /// Advance a page's rotation by a quarter turn.
    ///
    /// Returns the new rotation, or `None` when the id is unknown (a no-op,
    /// not an error).
    pub fn rotate(&mut self, id: PageId) -> Option<Rotation> {
        let page = self.entries.iter_mut().find(|page| page.id == id)?;
        page.rotation = page.rotation.advanced();
        Some(page.rotation)
    }
}
