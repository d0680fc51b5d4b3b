//! Output sink collaborator interface and stock implementations.
//!
//! Exports are delivered as fire-and-forget emissions, one call per output
//! document. A browser host forwards emissions to its download machinery;
//! the implementations here cover headless and desktop hosts.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// MIME type attached to every emitted PDF document.
pub const PDF_MIME: &str = "application/pdf";

/// Destination for assembled documents.
pub trait OutputSink {
    /// Deliver one finished document.
    ///
    /// Called once per output; the sink must not assume any further calls
    /// follow. Errors abort the export that produced the emission.
    fn emit(&mut self, bytes: &[u8], filename: &str, mime: &str) -> anyhow::Result<()>;
}

/// Sink that writes each emitted document into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink rooted at `dir`. The directory is created on first
    /// emission if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl OutputSink for DirectorySink {
    fn emit(&mut self, bytes: &[u8], filename: &str, _mime: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(filename);
        let file = std::fs::File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;

        Ok(())
    }
}

/// One document captured by a [`MemorySink`].
#[derive(Debug, Clone)]
pub struct EmittedFile {
    /// Filename the document was emitted under.
    pub filename: String,
    /// MIME type attached to the emission.
    pub mime: String,
    /// Serialized document bytes.
    pub bytes: Vec<u8>,
}

/// Sink that collects emissions in memory.
///
/// Useful for tests and for embedders that forward bytes elsewhere (for
/// example across a webview bridge).
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Emitted documents in emission order.
    pub outputs: Vec<EmittedFile>,
}

impl OutputSink for MemorySink {
    fn emit(&mut self, bytes: &[u8], filename: &str, mime: &str) -> anyhow::Result<()> {
        self.outputs.push(EmittedFile {
            filename: filename.to_string(),
            mime: mime.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directory_sink_writes_file() {
        let dir = TempDir::new().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));

        sink.emit(b"%PDF-stub", "merged.pdf", PDF_MIME).unwrap();

        let written = std::fs::read(dir.path().join("out").join("merged.pdf")).unwrap();
        assert_eq!(written, b"%PDF-stub");
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let mut sink = MemorySink::default();
        sink.emit(b"a", "a.pdf", PDF_MIME).unwrap();
        sink.emit(b"b", "b.pdf", PDF_MIME).unwrap();

        let names: Vec<&str> = sink.outputs.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);
        assert_eq!(sink.outputs[1].mime, PDF_MIME);
    }
}
