//! Source document ingestion.
//!
//! An upload arrives as a display name plus a raw byte buffer. Ingestion
//! decodes it, counts its pages, and freezes the bytes in a [`SourceBuffer`]
//! that every page drawn from the document shares for as long as any of
//! them survives. The buffer is never touched again after construction;
//! exports re-open it read-only.

use std::sync::Arc;

use lopdf::Document;
use serde::Serialize;

use crate::error::{Error, Result};

/// Identifies one ingested document's buffer.
///
/// Not an identity key for pages; it groups pages by the buffer they came
/// from, which drives size estimation and assembly-time loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SourceId(pub(crate) u32);

/// The retained, immutable bytes of one ingested document.
#[derive(Debug)]
pub struct SourceBuffer {
    id: SourceId,
    label: String,
    bytes: Vec<u8>,
    page_count: usize,
}

impl SourceBuffer {
    pub(crate) fn new(id: SourceId, label: String, bytes: Vec<u8>, page_count: usize) -> Self {
        Self {
            id,
            label,
            bytes,
            page_count,
        }
    }

    /// Buffer identifier.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Display name of the originating upload. Not unique: two uploads may
    /// well share a name.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The document bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the retained bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_count
    }
}

/// One uploaded file, before ingestion.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Display name of the upload, used as the page's source label.
    pub name: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Create an upload from a name and its bytes.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Summary of one ingest batch.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Documents whose pages were appended to the collection.
    pub documents_added: usize,
    /// Pages appended across the batch.
    pub pages_added: usize,
    /// Uploads excluded by the PDF file-type filter.
    pub skipped_uploads: usize,
}

/// File-type filter applied before a batch is considered.
pub(crate) fn is_pdf_upload(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Decode one upload into a shared source buffer.
///
/// The upload's bytes are moved into the buffer and frozen there. A
/// document lopdf cannot parse, and a document with no pages, both fail
/// ingestion.
pub(crate) fn decode_source(id: SourceId, upload: UploadFile) -> Result<Arc<SourceBuffer>> {
    let UploadFile { name, bytes } = upload;

    let doc = Document::load_mem(&bytes).map_err(|err| Error::from_decode(&name, &err))?;

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(Error::ingestion(&name, "PDF has no pages"));
    }

    Ok(Arc::new(SourceBuffer::new(id, name, bytes, page_count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::pdf_bytes;

    #[test]
    fn filter_accepts_pdf_extension_case_insensitively() {
        assert!(is_pdf_upload("report.pdf"));
        assert!(is_pdf_upload("REPORT.PDF"));
        assert!(!is_pdf_upload("report.docx"));
        assert!(!is_pdf_upload("report"));
    }

    #[test]
    fn decode_counts_pages_and_retains_bytes() {
        let bytes = pdf_bytes(3);
        let len = bytes.len();

        let source = decode_source(SourceId(0), UploadFile::new("a.pdf", bytes)).unwrap();

        assert_eq!(source.page_count(), 3);
        assert_eq!(source.byte_len(), len);
        assert_eq!(source.label(), "a.pdf");
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = decode_source(SourceId(0), UploadFile::new("junk.pdf", vec![0u8; 64]));
        assert!(matches!(result, Err(Error::Ingestion { .. })));
    }

    #[test]
    fn decode_rejects_empty_buffer() {
        let result = decode_source(SourceId(0), UploadFile::new("empty.pdf", Vec::new()));
        assert!(matches!(result, Err(Error::Ingestion { .. })));
    }
}
