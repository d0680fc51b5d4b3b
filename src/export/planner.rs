//! Export planning: subset, filename, size estimate.
//!
//! A plan is ephemeral and derived. It is recomputed whenever the subset,
//! a rotation, or the filename rule changes, and never stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::collection::{Collection, PageId, Rotation};
use crate::error::{FilenameError, Result};
use crate::selection::SelectionSet;
use crate::source::{SourceBuffer, SourceId};

/// Fixed factor applied to the raw byte estimate, reflecting expected
/// re-serialization savings. The estimate is a heuristic, not a promise.
pub const COMPRESSION_FACTOR: f64 = 0.85;

/// Maximum accepted filename length, in characters.
pub const MAX_FILENAME_CHARS: usize = 100;

const INVALID_FILENAME_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// How the output filename is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameRule {
    /// Verbatim user text; falls back to `"merged"` when blank.
    Custom(String),
    /// The literal `"merged"`.
    Merged,
    /// `pages_1-N`, where N is the planned page count.
    Pages,
    /// `document_YYYY-MM-DD`, the ISO calendar date at plan time.
    Date,
}

impl FilenameRule {
    /// Derive the filename stem for a plan of `page_count` pages on `today`.
    pub fn derive(&self, page_count: usize, today: NaiveDate) -> String {
        match self {
            Self::Custom(text) => {
                if text.trim().is_empty() {
                    "merged".to_string()
                } else {
                    text.clone()
                }
            }
            Self::Merged => "merged".to_string(),
            Self::Pages => format!("pages_1-{page_count}"),
            Self::Date => format!("document_{}", today.format("%Y-%m-%d")),
        }
    }
}

/// Validate an output filename.
///
/// Rules are checked in order and the first failure wins: empty (after
/// trimming), then longer than [`MAX_FILENAME_CHARS`], then any of
/// `\ / : * ? " < > |`.
///
/// # Examples
///
/// ```
/// use pagedeck::{FilenameError, validate_filename};
///
/// assert!(validate_filename("report_final").is_ok());
/// assert_eq!(validate_filename("a/b"), Err(FilenameError::InvalidCharacters));
/// ```
pub fn validate_filename(name: &str) -> std::result::Result<(), FilenameError> {
    if name.trim().is_empty() {
        return Err(FilenameError::Empty);
    }
    if name.chars().count() > MAX_FILENAME_CHARS {
        return Err(FilenameError::TooLong);
    }
    if name.chars().any(|c| INVALID_FILENAME_CHARS.contains(&c)) {
        return Err(FilenameError::InvalidCharacters);
    }
    Ok(())
}

/// Reduce a source label to a stem safe for use in emitted filenames:
/// extension stripped, forbidden characters replaced.
pub(crate) fn sanitize_stem(label: &str) -> String {
    let stem = std::path::Path::new(label)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        "page".to_string()
    } else {
        cleaned
    }
}

/// One page of an export plan: everything assembly needs, nothing it does
/// not (thumbnails stay behind in the collection).
#[derive(Debug, Clone)]
pub struct PlannedPage {
    pub(crate) source: Arc<SourceBuffer>,
    /// Identity of the planned page.
    pub id: PageId,
    /// Zero-based page index within the source buffer.
    pub page_index: usize,
    /// Accumulated rotation to apply at copy time.
    pub rotation: Rotation,
}

impl PlannedPage {
    /// Display name of the page's source document.
    pub fn source_label(&self) -> &str {
        self.source.label()
    }
}

/// A derived description of what an export will write.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pages: Vec<PlannedPage>,
    filename: String,
    estimated_bytes: u64,
}

impl ExportPlan {
    /// Planned pages, in collection order.
    pub fn pages(&self) -> &[PlannedPage] {
        &self.pages
    }

    /// Planned page ids, in collection order.
    pub fn page_ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.pages.iter().map(|page| page.id)
    }

    /// Number of planned pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the plan covers no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Validated output filename stem (no extension).
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Rough size of the output. A heuristic; real output may differ.
    pub fn estimated_bytes(&self) -> u64 {
        self.estimated_bytes
    }

    /// Serializable summary for presentation layers.
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            filename: self.filename.clone(),
            page_count: self.pages.len(),
            estimated_bytes: self.estimated_bytes,
        }
    }
}

/// Serializable digest of an [`ExportPlan`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    /// Validated output filename stem.
    pub filename: String,
    /// Number of planned pages.
    pub page_count: usize,
    /// Heuristic output size in bytes.
    pub estimated_bytes: u64,
}

/// Compute an export plan.
///
/// The subset is the selection filtered through collection order when the
/// selection is non-empty, else the whole collection. The filename is
/// derived from `rule` and validated; an invalid custom name fails the
/// plan so it can be surfaced inline and block confirmation.
pub fn plan(
    collection: &Collection,
    selection: &SelectionSet,
    rule: &FilenameRule,
    today: NaiveDate,
) -> Result<ExportPlan> {
    let pages = planned_subset(collection, selection);

    let filename = rule.derive(pages.len(), today);
    validate_filename(&filename)?;

    let estimated_bytes = estimate_bytes(&pages);

    Ok(ExportPlan {
        pages,
        filename,
        estimated_bytes,
    })
}

/// The working subset: selected pages in collection order, or every page
/// when nothing is selected.
pub(crate) fn planned_subset(
    collection: &Collection,
    selection: &SelectionSet,
) -> Vec<PlannedPage> {
    collection
        .iter()
        .filter(|page| selection.is_empty() || selection.contains(page.id()))
        .map(|page| PlannedPage {
            source: Arc::clone(page.source()),
            id: page.id(),
            page_index: page.page_index(),
            rotation: page.rotation(),
        })
        .collect()
}

/// Per-buffer proportional byte count, summed across distinct buffers and
/// scaled by [`COMPRESSION_FACTOR`].
fn estimate_bytes(pages: &[PlannedPage]) -> u64 {
    let mut per_source: BTreeMap<SourceId, (f64, f64, f64)> = BTreeMap::new();
    for page in pages {
        let entry = per_source.entry(page.source.id()).or_insert((
            page.source.byte_len() as f64,
            page.source.page_count() as f64,
            0.0,
        ));
        entry.2 += 1.0;
    }

    let raw: f64 = per_source
        .values()
        .map(|(bytes, total, used)| bytes * used / total)
        .sum();

    (raw * COMPRESSION_FACTOR).round() as u64
}
