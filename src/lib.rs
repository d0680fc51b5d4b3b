//! pagedeck - assemble, reorder, rotate, and export pages drawn from PDF
//! documents.
//!
//! This crate is the engine behind a page-collection editor: pages from any
//! number of source PDFs are flattened into one ordered, mutable working
//! set, edited (selected, rotated, reordered, deleted), and exported either
//! as a single merged document or as individual single-page documents. It
//! provides:
//!
//! - Batch ingestion with per-page progress and partial-success semantics
//! - An ordered page collection with selection and drag-reorder support
//! - Per-page rotation, applied at display time and again at export time
//! - Export planning with filename templates, validation, and a size
//!   estimate
//! - Merge and split assembly via `lopdf`
//!
//! Thumbnail rendering and output delivery are collaborator traits
//! ([`ThumbnailRenderer`], [`OutputSink`]); the crate has no dependency on
//! any UI event model.
//!
//! # Examples
//!
//! ```no_run
//! use pagedeck::{
//!     EditorSession, FilenameRule, MemorySink, Thumbnail, ThumbnailRenderer, UploadFile,
//! };
//!
//! struct Renderer;
//!
//! impl ThumbnailRenderer for Renderer {
//!     fn render_page(&self, _doc: &[u8], _page: usize, width: u32) -> anyhow::Result<Thumbnail> {
//!         Ok(Thumbnail::new(Vec::new(), width, width))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = EditorSession::new();
//!
//! let upload = UploadFile::new("scan.pdf", std::fs::read("scan.pdf")?);
//! let report = session.ingest(vec![upload], &Renderer, |_| {}).await?;
//! println!("added {} pages", report.pages_added);
//!
//! let mut sink = MemorySink::default();
//! let outcome = session.merge(&FilenameRule::Merged, &mut sink).await?;
//! println!("wrote {} ({} bytes)", outcome.filename, outcome.bytes_emitted);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod error;
pub mod export;
pub mod progress;
pub mod render;
pub mod selection;
pub mod session;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use collection::{Collection, PageId, PageRef, Rotation};
pub use error::{Error, FilenameError, Result};
pub use export::assembly::{Assembler, DEFAULT_SPLIT_DELAY, MergeOutcome, SplitOutcome};
pub use export::planner::{
    COMPRESSION_FACTOR, ExportPlan, FilenameRule, MAX_FILENAME_CHARS, PlanSummary, PlannedPage,
    validate_filename,
};
pub use progress::Progress;
pub use render::{Thumbnail, ThumbnailRenderer};
pub use selection::SelectionSet;
pub use session::{EditorSession, PageSnapshot};
pub use sink::{DirectorySink, EmittedFile, MemorySink, OutputSink, PDF_MIME};
pub use source::{IngestReport, SourceBuffer, SourceId, UploadFile};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
pub(crate) mod test_fixtures {
    //! Shared helpers for unit tests: minimal real PDFs built with lopdf
    //! and cheap stand-ins for ingested state.

    use std::sync::Arc;

    use lopdf::{Document, Object, Stream, dictionary};

    use crate::collection::{PageId, PageRef, Rotation};
    use crate::export::planner::PlannedPage;
    use crate::render::Thumbnail;
    use crate::source::{SourceBuffer, SourceId};

    /// Serialize a minimal valid PDF with the given number of pages.
    pub fn pdf_bytes(pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let mut kids = Vec::new();

        let resources_id = doc.add_object(Object::Dictionary(dictionary! {
            "ProcSet" => Object::Array(vec![Object::Name(b"PDF".to_vec())]),
        }));

        for _ in 0..pages {
            let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, vec![])));
            let page_id = doc.add_object(Object::Dictionary(dictionary! {
                "Type" => "Page",
                "MediaBox" => Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]),
                "Resources" => Object::Reference(resources_id),
                "Contents" => Object::Reference(content_id),
            }));
            kids.push(Object::Reference(page_id));
        }

        let kid_refs = kids.clone();
        let pages_id = doc.add_object(Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }));
        for kid in kid_refs {
            if let Object::Reference(id) = kid
                && let Ok(page) = doc.get_object_mut(id)
                && let Object::Dictionary(dict) = page
            {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }

        let catalog_id = doc.add_object(Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        }));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture PDF serializes");
        bytes
    }

    /// A source buffer whose bytes are filler, for tests that never decode.
    pub fn source_buffer(id: u32, label: &str, pages: usize) -> Arc<SourceBuffer> {
        source_buffer_with_bytes(id, label, pages, vec![0u8; 1024])
    }

    /// A source buffer with explicit filler bytes, for estimate tests.
    pub fn source_buffer_with_bytes(
        id: u32,
        label: &str,
        pages: usize,
        bytes: Vec<u8>,
    ) -> Arc<SourceBuffer> {
        Arc::new(SourceBuffer::new(
            SourceId(id),
            label.to_string(),
            bytes,
            pages,
        ))
    }

    /// A source buffer backed by a real PDF, for assembly tests.
    pub fn source_buffer_from_pdf(id: u32, label: &str, pages: u32) -> Arc<SourceBuffer> {
        source_buffer_with_bytes(id, label, pages as usize, pdf_bytes(pages))
    }

    /// A page entry with a stub thumbnail.
    pub fn page(id: u64, source: &Arc<SourceBuffer>, index: usize) -> PageRef {
        PageRef::new(
            PageId(id),
            Arc::clone(source),
            index,
            Thumbnail::new(Vec::new(), 300, 400),
        )
    }

    /// A planned page with an explicit rotation.
    pub fn planned_page(
        id: u64,
        source: &Arc<SourceBuffer>,
        index: usize,
        rotation: Rotation,
    ) -> PlannedPage {
        PlannedPage {
            source: Arc::clone(source),
            id: PageId(id),
            page_index: index,
            rotation,
        }
    }
}
