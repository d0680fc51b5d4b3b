//! Error types for pagedeck.
//!
//! The taxonomy mirrors how failures surface to a user of the editor:
//!
//! - **Ingestion errors** abort the rest of an upload batch but preserve
//!   pages that were already committed.
//! - **Filename errors** are local input validation, meant to be shown
//!   inline next to the filename field.
//! - **Assembly errors** abort a whole export; nothing partially written is
//!   ever reported as a success.
//! - **No-op conditions** (stale drag targets, unknown ids) are not errors
//!   at all and never appear here.

use thiserror::Error;

/// Result type alias for pagedeck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pagedeck operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Another long-running operation (ingest, merge, split) is in flight.
    #[error("another operation is already in progress")]
    Busy,

    /// A source document could not be ingested.
    #[error("failed to ingest {label}: {reason}")]
    Ingestion {
        /// Display name of the offending upload.
        label: String,
        /// Underlying decode or render failure.
        reason: String,
    },

    /// The requested output filename failed validation.
    #[error(transparent)]
    InvalidFilename(#[from] FilenameError),

    /// A merge was requested over an empty collection.
    #[error("there are no pages to export")]
    NothingToExport,

    /// A split was requested with nothing selected.
    #[error("select at least one page to split")]
    NoPagesSelected,

    /// Copying, rotating, or serializing pages failed mid-export.
    #[error("assembly failed: {reason}")]
    Assembly {
        /// What went wrong.
        reason: String,
    },

    /// The output sink refused an emitted document.
    #[error("output sink rejected {filename}: {source}")]
    Sink {
        /// Filename of the rejected document.
        filename: String,
        /// Error reported by the sink implementation.
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Create an `Ingestion` error.
    pub fn ingestion(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Ingestion {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Create an `Assembly` error.
    pub fn assembly(reason: impl Into<String>) -> Self {
        Self::Assembly {
            reason: reason.into(),
        }
    }

    /// Map a decode failure onto the ingestion taxonomy, calling out
    /// encrypted input when the underlying message suggests it.
    pub(crate) fn from_decode(label: &str, err: &lopdf::Error) -> Self {
        let reason = err.to_string();
        if reason.contains("encrypt") || reason.contains("password") {
            Self::ingestion(label, format!("document is encrypted: {reason}"))
        } else {
            Self::ingestion(label, reason)
        }
    }
}

/// Validation failure for a user-supplied output filename.
///
/// Rules are checked in order; the first failing rule wins.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FilenameError {
    /// The filename is empty after trimming whitespace.
    #[error("filename cannot be empty")]
    Empty,

    /// The filename exceeds 100 characters.
    #[error("filename is too long (100 characters maximum)")]
    TooLong,

    /// The filename contains a forbidden character.
    #[error(r#"filename must not contain \ / : * ? " < > |"#)]
    InvalidCharacters,
}
