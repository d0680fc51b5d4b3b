//! The editing session: one explicit state object, no globals.
//!
//! An [`EditorSession`] owns the collection, the selection, the id
//! counters, and the single-flight guard, and exposes the operations a
//! presentation layer invokes in response to whatever input mechanism it
//! uses. It is created at session start and discarded wholesale; nothing
//! persists across sessions.
//!
//! Long-running operations (ingest, merge, split) are asynchronous and
//! mutually exclusive: a guard is taken in their synchronous prefix and
//! released by `Drop` on every exit path, so a second long operation gets
//! [`Error::Busy`] instead of interleaving. Progress callbacks run inline,
//! which means all progress for one operation is delivered before the
//! operation returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::collection::{Collection, PageId, Rotation};
use crate::error::{Error, Result};
use crate::export::assembly::{Assembler, MergeOutcome, SplitOutcome};
use crate::export::planner::{self, ExportPlan, FilenameRule};
use crate::progress::Progress;
use crate::render::ThumbnailRenderer;
use crate::selection::SelectionSet;
use crate::sink::OutputSink;
use crate::source::{self, IngestReport, SourceBuffer, SourceId, UploadFile};

/// Width in pixels requested from the thumbnail renderer.
const THUMBNAIL_WIDTH: u32 = 300;

/// One editing session over a page collection.
#[derive(Debug)]
pub struct EditorSession {
    collection: Collection,
    selection: SelectionSet,
    assembler: Assembler,
    next_source_id: u32,
    next_page_id: u64,
    processing: Arc<AtomicBool>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self {
            collection: Collection::new(),
            selection: SelectionSet::new(),
            assembler: Assembler::new(),
            next_source_id: 0,
            next_page_id: 1,
            processing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a session with a custom pause between split emissions.
    pub fn with_split_delay(split_delay: Duration) -> Self {
        Self {
            assembler: Assembler::with_split_delay(split_delay),
            ..Self::new()
        }
    }

    /// The ordered page collection.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// The current selection.
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Whether a long-running operation is in flight.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Ingest a batch of uploads, appending one page entry per page.
    ///
    /// Non-PDF uploads are silently filtered out first. Documents are then
    /// decoded strictly in order; the first decode failure ends the batch,
    /// but pages of documents decoded before it are still committed and
    /// stay committed (partial success is preserved). `on_progress`
    /// receives one tick per appended page, with the total counted across
    /// the whole decoded batch.
    pub async fn ingest<R, F>(
        &mut self,
        files: Vec<UploadFile>,
        renderer: &R,
        mut on_progress: F,
    ) -> Result<IngestReport>
    where
        R: ThumbnailRenderer + ?Sized,
        F: FnMut(Progress),
    {
        let _guard = ProcessingGuard::acquire(&self.processing)?;

        let mut skipped_uploads = 0;
        let eligible: Vec<UploadFile> = files
            .into_iter()
            .filter(|file| {
                if source::is_pdf_upload(&file.name) {
                    true
                } else {
                    warn!(name = %file.name, "skipping non-PDF upload");
                    skipped_uploads += 1;
                    false
                }
            })
            .collect();

        // Count pass: decode in order, stopping at the first failure.
        // Documents past the failure point are never examined.
        let mut decoded: Vec<Arc<SourceBuffer>> = Vec::new();
        let mut decode_failure = None;
        for file in eligible {
            match source::decode_source(SourceId(self.next_source_id), file) {
                Ok(buffer) => {
                    self.next_source_id += 1;
                    decoded.push(buffer);
                }
                Err(err) => {
                    decode_failure = Some(err);
                    break;
                }
            }
        }

        // Process pass over the decoded prefix: render a thumbnail and
        // append a page entry per page, reporting progress as we go.
        let total: usize = decoded.iter().map(|buffer| buffer.page_count()).sum();
        let mut report = IngestReport {
            skipped_uploads,
            ..IngestReport::default()
        };

        for buffer in decoded {
            for index in 0..buffer.page_count() {
                let thumbnail = renderer
                    .render_page(buffer.bytes(), index, THUMBNAIL_WIDTH)
                    .map_err(|err| {
                        Error::ingestion(
                            buffer.label(),
                            format!("thumbnail render failed for page {}: {err}", index + 1),
                        )
                    });
                let thumbnail = match thumbnail {
                    Ok(thumbnail) => thumbnail,
                    Err(err) => {
                        warn!(%err, "ingest batch aborted mid-render");
                        return Err(err);
                    }
                };

                let id = PageId(self.next_page_id);
                self.next_page_id += 1;
                self.collection.append(crate::collection::PageRef::new(
                    id,
                    Arc::clone(&buffer),
                    index,
                    thumbnail,
                ));
                report.pages_added += 1;
                on_progress(Progress {
                    done: report.pages_added,
                    total,
                });
            }
            report.documents_added += 1;
        }

        if let Some(err) = decode_failure {
            warn!(%err, committed = report.pages_added, "ingest batch failed");
            return Err(err);
        }

        debug!(
            documents = report.documents_added,
            pages = report.pages_added,
            "ingest batch complete"
        );
        Ok(report)
    }

    /// Flip a page's selection. Stale ids are a no-op returning `None`.
    pub fn toggle_selection(&mut self, id: PageId) -> Option<bool> {
        self.selection.toggle(id, &self.collection)
    }

    /// Select every page.
    pub fn select_all(&mut self) {
        self.selection.select_all(&self.collection);
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Advance a page's rotation by a quarter turn. Stale ids are a no-op.
    pub fn rotate_page(&mut self, id: PageId) -> Option<Rotation> {
        self.collection.rotate(id)
    }

    /// Delete the selected pages. Returns how many were removed; the
    /// selection ends up empty.
    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<PageId> = self
            .collection
            .iter()
            .filter(|page| self.selection.contains(page.id()))
            .map(|page| page.id())
            .collect();
        self.collection.remove(&ids, &mut self.selection)
    }

    /// Remove specific pages (and purge them from the selection).
    pub fn remove_pages(&mut self, ids: &[PageId]) -> usize {
        self.collection.remove(ids, &mut self.selection)
    }

    /// Complete a drag-reorder gesture: move `source` to immediately
    /// precede `target`.
    ///
    /// Both ids are resolved against the collection as it is *now*, not as
    /// it was when the drag started; if either no longer resolves the
    /// gesture is dropped silently.
    pub fn reorder(&mut self, source: PageId, target: PageId) -> bool {
        let moved = self.collection.reposition_before(source, target);
        if !moved {
            debug!(%source, %target, "reorder gesture dropped");
        }
        moved
    }

    /// Drop every page and reset the selection.
    pub fn clear(&mut self) {
        self.collection.clear(&mut self.selection);
    }

    /// Compute the export plan for the current subset and filename rule.
    ///
    /// The subset is the selection (in collection order) when non-empty,
    /// else the whole collection. Fails when a custom filename fails
    /// validation, which should disable export confirmation.
    pub fn plan(&self, rule: &FilenameRule) -> Result<ExportPlan> {
        planner::plan(
            &self.collection,
            &self.selection,
            rule,
            chrono::Local::now().date_naive(),
        )
    }

    /// Merge the planned subset into one document and emit it.
    pub async fn merge<S: OutputSink + ?Sized>(
        &mut self,
        rule: &FilenameRule,
        sink: &mut S,
    ) -> Result<MergeOutcome> {
        let _guard = ProcessingGuard::acquire(&self.processing)?;

        let plan = self.plan(rule)?;
        if plan.is_empty() {
            return Err(Error::NothingToExport);
        }

        self.assembler.merge(&plan, sink)
    }

    /// Split the selected pages into one single-page document each.
    ///
    /// Unlike merge, split never falls back to the whole collection: an
    /// empty selection reports [`Error::NoPagesSelected`] and emits
    /// nothing.
    pub async fn split<S, F>(&mut self, sink: &mut S, on_progress: F) -> Result<SplitOutcome>
    where
        S: OutputSink + ?Sized,
        F: FnMut(Progress),
    {
        let _guard = ProcessingGuard::acquire(&self.processing)?;

        if self.selection.is_empty() {
            return Err(Error::NoPagesSelected);
        }

        let pages = planner::planned_subset(&self.collection, &self.selection);
        self.assembler.split(&pages, sink, on_progress).await
    }

    /// Per-page view state for a presentation layer.
    pub fn snapshot(&self) -> Vec<PageSnapshot> {
        self.collection
            .iter()
            .map(|page| PageSnapshot {
                id: page.id(),
                source_label: page.source_label().to_string(),
                page_index: page.page_index(),
                rotation: page.rotation(),
                selected: self.selection.contains(page.id()),
                thumbnail_width: page.thumbnail().width,
                thumbnail_height: page.thumbnail().height,
            })
            .collect()
    }
}

/// Serializable per-page view state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// Page identity.
    pub id: PageId,
    /// Display name of the originating document.
    pub source_label: String,
    /// Zero-based index within the source document.
    pub page_index: usize,
    /// Accumulated rotation, to be applied as a display transform.
    pub rotation: Rotation,
    /// Whether the page is currently selected.
    pub selected: bool,
    /// Thumbnail pixel width.
    pub thumbnail_width: u32,
    /// Thumbnail pixel height.
    pub thumbnail_height: u32,
}

/// RAII single-flight guard. Acquired with a compare-and-swap in a long
/// operation's synchronous prefix; `Drop` releases it on every exit path,
/// so no early return or error can leave the session stuck busy.
struct ProcessingGuard {
    flag: Arc<AtomicBool>,
}

impl ProcessingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::Busy);
        }
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
