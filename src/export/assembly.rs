//! Document assembly: building output PDFs from a plan.
//!
//! Both export shapes share the same page-copy machinery: each planned page
//! is copied out of its (re-opened) source document into a fresh output
//! document, re-parented under a new page tree, with the page's accumulated
//! rotation written as an absolute `Rotate` value at copy time. Merge
//! builds one document from the whole plan; split builds one single-page
//! document per planned page.

use std::collections::BTreeMap;
use std::time::Duration;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use serde::Serialize;
use tracing::debug;

use crate::collection::Rotation;
use crate::error::{Error, Result};
use crate::export::planner::{ExportPlan, PlannedPage, sanitize_stem};
use crate::progress::Progress;
use crate::sink::{OutputSink, PDF_MIME};
use crate::source::SourceId;

/// Default pause between successive split emissions, giving browser
/// download throttling room to breathe. Purely environmental; hosts that
/// do not need it tune it to zero.
pub const DEFAULT_SPLIT_DELAY: Duration = Duration::from_millis(150);

/// Ancestor walk limit when materializing inherited page attributes, so a
/// malformed page tree with a reference cycle cannot spin forever.
const MAX_TREE_DEPTH: usize = 64;

/// Result of a merge export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Filename the document was emitted under.
    pub filename: String,
    /// Pages in the output document.
    pub page_count: usize,
    /// Size of the serialized output.
    pub bytes_emitted: usize,
}

/// Result of a split export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOutcome {
    /// Emitted filenames, in emission order.
    pub filenames: Vec<String>,
}

/// Builds output documents from planned pages.
#[derive(Debug, Clone)]
pub struct Assembler {
    split_delay: Duration,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    /// Create an assembler with the default split delay.
    pub fn new() -> Self {
        Self {
            split_delay: DEFAULT_SPLIT_DELAY,
        }
    }

    /// Create an assembler with a custom pause between split emissions.
    pub fn with_split_delay(split_delay: Duration) -> Self {
        Self { split_delay }
    }

    /// Assemble the whole plan into one document and emit it.
    pub fn merge<S: OutputSink + ?Sized>(
        &self,
        plan: &ExportPlan,
        sink: &mut S,
    ) -> Result<MergeOutcome> {
        if plan.is_empty() {
            return Err(Error::NothingToExport);
        }

        let bytes = build_document(plan.pages())?;
        let filename = format!("{}.pdf", plan.filename());

        sink.emit(&bytes, &filename, PDF_MIME)
            .map_err(|source| Error::Sink {
                filename: filename.clone(),
                source,
            })?;

        debug!(%filename, pages = plan.len(), "merge emitted");
        Ok(MergeOutcome {
            filename,
            page_count: plan.len(),
            bytes_emitted: bytes.len(),
        })
    }

    /// Assemble each planned page into its own single-page document.
    ///
    /// Filenames are deterministic and collision-free:
    /// `<source stem>_p<ordinal>.pdf`, with the ordinal taken from the
    /// emission sequence.
    pub async fn split<S, F>(
        &self,
        pages: &[PlannedPage],
        sink: &mut S,
        mut on_progress: F,
    ) -> Result<SplitOutcome>
    where
        S: OutputSink + ?Sized,
        F: FnMut(Progress),
    {
        if pages.is_empty() {
            return Err(Error::NoPagesSelected);
        }

        let total = pages.len();
        let mut filenames = Vec::with_capacity(total);

        for (ordinal, page) in pages.iter().enumerate() {
            let bytes = build_document(std::slice::from_ref(page))?;
            let filename = format!("{}_p{}.pdf", sanitize_stem(page.source_label()), ordinal + 1);

            sink.emit(&bytes, &filename, PDF_MIME)
                .map_err(|source| Error::Sink {
                    filename: filename.clone(),
                    source,
                })?;

            filenames.push(filename);
            on_progress(Progress {
                done: ordinal + 1,
                total,
            });

            if ordinal + 1 < total && !self.split_delay.is_zero() {
                tokio::time::sleep(self.split_delay).await;
            }
        }

        debug!(count = filenames.len(), "split emitted");
        Ok(SplitOutcome { filenames })
    }
}

struct LoadedSource {
    doc: Document,
    page_ids: Vec<ObjectId>,
}

/// Build one output document containing `pages` in order.
fn build_document(pages: &[PlannedPage]) -> Result<Vec<u8>> {
    debug_assert!(!pages.is_empty());

    // Re-open each distinct source buffer once, renumbering its objects
    // into a disjoint id range so everything can live in one object map.
    let mut max_id = 1u32;
    let mut loaded: BTreeMap<SourceId, LoadedSource> = BTreeMap::new();
    for page in pages {
        let source_id = page.source.id();
        if loaded.contains_key(&source_id) {
            continue;
        }
        let mut doc = Document::load_mem(page.source.bytes()).map_err(|err| {
            Error::assembly(format!(
                "failed to reopen {}: {err}",
                page.source.label()
            ))
        })?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;
        let page_ids = doc.get_pages().into_values().collect();
        loaded.insert(source_id, LoadedSource { doc, page_ids });
    }

    let pages_root_id: ObjectId = (max_id, 0);
    let catalog_id: ObjectId = (max_id + 1, 0);

    // Copy each planned page: materialize inherited attributes, re-parent
    // under the new page tree, and write the accumulated rotation. A zero
    // rotation leaves the page's own stored rotation alone.
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    let mut patched: Vec<(ObjectId, Dictionary)> = Vec::with_capacity(pages.len());
    for page in pages {
        let source = &loaded[&page.source.id()];
        let page_id = *source.page_ids.get(page.page_index).ok_or_else(|| {
            Error::assembly(format!(
                "page {} out of range for {} ({} pages)",
                page.page_index + 1,
                page.source.label(),
                source.page_ids.len()
            ))
        })?;

        let mut dict = materialized_page_dict(&source.doc, page_id)?;
        dict.set("Parent", Object::Reference(pages_root_id));
        if page.rotation != Rotation::R0 {
            dict.set("Rotate", Object::Integer(i64::from(page.rotation.degrees())));
        }

        kids.push(Object::Reference(page_id));
        patched.push((page_id, dict));
    }

    let mut output = Document::with_version("1.5");

    // Bring over every source object except old page-tree roots, then
    // overwrite the copied pages with their patched dictionaries. Objects
    // belonging to unplanned pages become unreachable and are pruned below.
    for (_, source) in loaded {
        for (id, object) in source.doc.objects {
            if is_page_tree_root(&object) {
                continue;
            }
            output.objects.insert(id, object);
        }
    }
    for (id, dict) in patched {
        output.objects.insert(id, Object::Dictionary(dict));
    }

    let page_count = pages.len() as i64;
    output.objects.insert(
        pages_root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    output.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_root_id),
        }),
    );
    output.trailer.set("Root", Object::Reference(catalog_id));
    output.max_id = max_id + 1;

    output.renumber_objects();
    output.prune_objects();
    output.compress();

    let mut bytes = Vec::new();
    output
        .save_to(&mut bytes)
        .map_err(|err| Error::assembly(format!("serialization failed: {err}")))?;
    Ok(bytes)
}

/// Clone a page dictionary with the attributes it inherits from its
/// page-tree ancestors (Resources, MediaBox, CropBox, Rotate) written
/// directly onto it, so re-parenting cannot lose them.
fn materialized_page_dict(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut dict = doc
        .get_dictionary(page_id)
        .map_err(|err| Error::assembly(format!("malformed page object: {err}")))?
        .clone();

    const INHERITED: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

    let mut ancestor = dict.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(id) = ancestor {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            break;
        }
        let Ok(parent) = doc.get_dictionary(id) else {
            break;
        };
        for key in INHERITED {
            if !dict.has(key)
                && let Ok(value) = parent.get(key)
            {
                dict.set(key, value.clone());
            }
        }
        ancestor = parent.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(dict)
}

/// Old catalogs, page-tree nodes, and outlines must not ride along into the
/// output; the output gets a fresh tree.
fn is_page_tree_root(object: &Object) -> bool {
    let Ok(dict) = object.as_dict() else {
        return false;
    };
    match dict.get(b"Type") {
        Ok(Object::Name(name)) => {
            matches!(name.as_slice(), b"Catalog" | b"Pages" | b"Outlines")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::test_fixtures::{page, planned_page, source_buffer_from_pdf};

    fn page_rotations(bytes: &[u8]) -> Vec<Option<i64>> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.page_iter()
            .map(|id| {
                doc.get_dictionary(id)
                    .unwrap()
                    .get(b"Rotate")
                    .and_then(|r| r.as_i64())
                    .ok()
            })
            .collect()
    }

    #[test]
    fn build_copies_pages_in_plan_order() {
        let first = source_buffer_from_pdf(0, "a.pdf", 3);
        let second = source_buffer_from_pdf(1, "b.pdf", 2);

        let pages = vec![
            planned_page(1, &second, 1, Rotation::R0),
            planned_page(2, &first, 0, Rotation::R0),
            planned_page(3, &first, 2, Rotation::R0),
        ];

        let bytes = build_document(&pages).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn build_writes_absolute_rotation_only_when_nonzero() {
        let source = source_buffer_from_pdf(0, "doc.pdf", 2);
        let pages = vec![
            planned_page(1, &source, 0, Rotation::R180),
            planned_page(2, &source, 1, Rotation::R0),
        ];

        let bytes = build_document(&pages).unwrap();

        assert_eq!(page_rotations(&bytes), [Some(180), None]);
    }

    #[test]
    fn build_rejects_out_of_range_page_index() {
        let source = source_buffer_from_pdf(0, "doc.pdf", 2);
        let pages = vec![planned_page(1, &source, 9, Rotation::R0)];

        let result = build_document(&pages);

        assert!(matches!(result, Err(Error::Assembly { .. })));
    }

    #[test]
    fn merge_emits_exactly_one_document() {
        let source = source_buffer_from_pdf(0, "doc.pdf", 2);
        let collection = {
            let mut c = crate::collection::Collection::new();
            c.append(page(1, &source, 0));
            c.append(page(2, &source, 1));
            c
        };
        let selection = crate::selection::SelectionSet::new();
        let plan = crate::export::planner::plan(
            &collection,
            &selection,
            &crate::export::planner::FilenameRule::Merged,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap();

        let mut sink = MemorySink::default();
        let outcome = Assembler::new().merge(&plan, &mut sink).unwrap();

        assert_eq!(sink.outputs.len(), 1);
        assert_eq!(sink.outputs[0].filename, "merged.pdf");
        assert_eq!(outcome.page_count, 2);
        assert_eq!(outcome.bytes_emitted, sink.outputs[0].bytes.len());
    }

    #[tokio::test]
    async fn split_emits_one_single_page_document_per_page() {
        let source = source_buffer_from_pdf(0, "tax return.pdf", 3);
        let pages = vec![
            planned_page(1, &source, 0, Rotation::R0),
            planned_page(2, &source, 2, Rotation::R90),
        ];

        let mut sink = MemorySink::default();
        let mut ticks = Vec::new();
        let outcome = Assembler::with_split_delay(Duration::ZERO)
            .split(&pages, &mut sink, |p| ticks.push((p.done, p.total)))
            .await
            .unwrap();

        assert_eq!(
            outcome.filenames,
            ["tax return_p1.pdf", "tax return_p2.pdf"]
        );
        assert_eq!(ticks, [(1, 2), (2, 2)]);
        for output in &sink.outputs {
            let doc = Document::load_mem(&output.bytes).unwrap();
            assert_eq!(doc.get_pages().len(), 1);
        }
        assert_eq!(page_rotations(&sink.outputs[1].bytes), [Some(90)]);
    }

    #[tokio::test]
    async fn split_requires_pages() {
        let mut sink = MemorySink::default();
        let result = Assembler::new().split(&[], &mut sink, |_| {}).await;

        assert!(matches!(result, Err(Error::NoPagesSelected)));
        assert!(sink.outputs.is_empty());
    }
}
