//! Batch extraction over a bounded worker pool.
//!
//! A batch runs in three phases:
//! 1. documents are read, extracted and split into work units in parallel
//! 2. project ids are handed out sequentially, in path then start-page order
//! 3. units are laid out, located and assembled in parallel
//!
//! Ids therefore never depend on worker scheduling. A document that fails
//! is logged and skipped; the rest of the batch goes on.

use crate::error::FichesError;
use crate::extraction::{PageContent, PdfExtractor};
use crate::layout::segment_range;
use crate::model::{ProjectRecord, Provenance};
use crate::parsing::publication_date;
use crate::profiles::Profile;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on concurrent workers.
pub const MAX_WORKERS: usize = 6;

const PROGRESS_EVERY: usize = 20;

/// Worker count: the request, or the machine's parallelism, clamped to
/// `1..=MAX_WORKERS`.
pub fn worker_count(requested: Option<usize>) -> usize {
    let wanted = requested.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    wanted.clamp(1, MAX_WORKERS)
}

/// An extracted document, shared read-only by its work units.
#[derive(Debug)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// File name, used for title and sector fallbacks.
    pub name: String,
    pub pages: Vec<PageContent>,
    pub publication_date: Option<String>,
}

impl SourceDocument {
    /// Wrap extracted pages. Fails when no page carries any text.
    pub fn new(
        path: &Path,
        pages: Vec<PageContent>,
        profile: &Profile,
    ) -> Result<Self, FichesError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !pages.iter().any(PageContent::has_text) {
            return Err(FichesError::EmptyDocument(name));
        }
        let publication_date = if profile.def.detect_publication_date {
            publication_date(&pages, &name)
        } else {
            None
        };
        Ok(SourceDocument {
            path: absolute(path),
            name,
            pages,
            publication_date,
        })
    }

    /// Read and extract the document at `path`.
    pub fn load(
        path: &Path,
        extractor: &dyn PdfExtractor,
        profile: &Profile,
    ) -> Result<Self, FichesError> {
        let bytes = std::fs::read(path)?;
        let pages = extractor.extract_pages(&bytes)?;
        debug!(
            path = %path.display(),
            pages = pages.len(),
            backend = extractor.backend_name(),
            "document extracted"
        );
        Self::new(path, pages, profile)
    }
}

/// One project's page window inside a document.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub document: Arc<SourceDocument>,
    pub start_page: usize,
    pub page_count: usize,
}

/// Split a document into work units: one per detected project start for
/// multi-project profiles, otherwise a single unit from page 1.
pub fn plan_units(document: Arc<SourceDocument>, profile: &Profile) -> Vec<WorkUnit> {
    match &profile.segmenter {
        Some(segmenter) => {
            let starts = segmenter.find_start_pages(&document.pages);
            if starts.is_empty() {
                warn!(document = %document.name, "no project start pages found");
            }
            starts
                .into_iter()
                .map(|start_page| WorkUnit {
                    document: Arc::clone(&document),
                    start_page,
                    page_count: segmenter.window(),
                })
                .collect()
        }
        None => vec![WorkUnit {
            document,
            start_page: 1,
            page_count: profile.def.layout.max_pages,
        }],
    }
}

/// Turn one unit into a record. Units without any text yield nothing.
pub fn process_unit(unit: &WorkUnit, project_id: u64, profile: &Profile) -> Option<ProjectRecord> {
    let doc = &unit.document;
    let layout = segment_range(&doc.pages, unit.start_page, unit.page_count, &profile.def.layout);
    if layout.is_empty() {
        debug!(document = %doc.name, page = unit.start_page, "unit has no text, dropped");
        return None;
    }

    let fields = profile.locator.locate(&layout, &doc.name);
    let provenance = Provenance {
        pdf_url: doc.path.display().to_string(),
        pdf_page_number: unit.start_page,
        publication_date: doc.publication_date.clone(),
    };
    Some(profile.assembler.assemble(project_id, fields, provenance))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Records in ascending id order.
    pub records: Vec<ProjectRecord>,
    pub failures: Vec<DocumentFailure>,
    /// Units that produced no record.
    pub dropped_units: usize,
    /// One past the last id handed out.
    pub next_id: u64,
}

/// Extract every project from `paths`, numbering from `first_id`.
pub fn run_batch(
    paths: &[PathBuf],
    extractor: &dyn PdfExtractor,
    profile: &Profile,
    first_id: u64,
    workers: usize,
) -> Result<BatchReport, FichesError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.clamp(1, MAX_WORKERS))
        .build()
        .map_err(|e| FichesError::WorkerPool(e.to_string()))?;

    let mut paths = paths.to_vec();
    paths.sort();
    let total = paths.len();
    info!(documents = total, workers, profile = profile.name(), "batch started");

    // Phase 1: extraction and planning.
    let done = AtomicUsize::new(0);
    let loaded: Vec<(PathBuf, Result<SourceDocument, FichesError>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let result = guarded(|| SourceDocument::load(path, extractor, profile))
                    .and_then(|loaded| loaded);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n % PROGRESS_EVERY == 0 || n == total {
                    info!("extracted {n}/{total} documents");
                }
                (path.clone(), result)
            })
            .collect()
    });

    let mut failures = Vec::new();
    let mut units = Vec::new();
    for (path, result) in loaded {
        match result {
            Ok(doc) => units.extend(plan_units(Arc::new(doc), profile)),
            Err(e) => {
                warn!(path = %path.display(), "document skipped: {e}");
                failures.push(DocumentFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    // Phase 2: id reservation. Units are already in path order, and in
    // start-page order within a document.
    let assigned: Vec<(u64, WorkUnit)> = units
        .into_iter()
        .zip(first_id..)
        .map(|(unit, id)| (id, unit))
        .collect();
    let next_id = first_id + assigned.len() as u64;

    // Phase 3: field location and assembly.
    let results: Vec<(&WorkUnit, Result<Option<ProjectRecord>, FichesError>)> = pool.install(|| {
        assigned
            .par_iter()
            .map(|(id, unit)| (unit, guarded(|| process_unit(unit, *id, profile))))
            .collect()
    });

    let mut records = Vec::new();
    let mut dropped_units = 0;
    for (unit, result) in results {
        match result {
            Ok(Some(record)) => records.push(record),
            Ok(None) => dropped_units += 1,
            Err(e) => {
                warn!(path = %unit.document.path.display(), "unit skipped: {e}");
                dropped_units += 1;
                failures.push(DocumentFailure {
                    path: unit.document.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    records.sort_by_key(|r| r.project_id);

    info!(
        records = records.len(),
        failed = failures.len(),
        dropped = dropped_units,
        "batch finished"
    );

    Ok(BatchReport {
        records,
        failures,
        dropped_units,
        next_id,
    })
}

/// PDF files directly inside `dir`, sorted by path.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, FichesError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    if paths.is_empty() {
        return Err(FichesError::NoDocuments(dir.to_path_buf()));
    }
    paths.sort();
    Ok(paths)
}

/// Run `f`, turning a panic into `FichesError::WorkerPanic` so one bad
/// document cannot take the pool down.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, FichesError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        FichesError::WorkerPanic(reason)
    })
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::Glyph;
    use std::collections::HashMap;

    /// Returns canned pages keyed by file content; unknown content fails.
    struct CannedExtractor {
        documents: HashMap<String, Vec<PageContent>>,
    }

    impl PdfExtractor for CannedExtractor {
        fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, FichesError> {
            let key = String::from_utf8_lossy(pdf_bytes).to_string();
            if key == "crash" {
                panic!("backend crashed on {key}");
            }
            self.documents
                .get(&key)
                .cloned()
                .ok_or_else(|| FichesError::Extraction(format!("cannot open {key}")))
        }

        fn backend_name(&self) -> &str {
            "canned"
        }
    }

    fn write_docs(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(format!("{name}.pdf"));
                std::fs::write(&path, name).unwrap();
                path
            })
            .collect()
    }

    fn fiche(title: &str) -> Vec<PageContent> {
        vec![PageContent::from_text(
            1,
            &format!("Projet N° : PR1\n{title}\nSecteur économique : SERVICES\nINVESTISSEMENT : 3 MDH"),
        )]
    }

    #[test]
    fn test_worker_count_is_clamped() {
        assert_eq!(worker_count(Some(0)), 1);
        assert_eq!(worker_count(Some(3)), 3);
        assert_eq!(worker_count(Some(64)), MAX_WORKERS);
        let auto = worker_count(None);
        assert!((1..=MAX_WORKERS).contains(&auto));
    }

    #[test]
    fn test_ids_follow_path_order_regardless_of_workers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_docs(dir.path(), &["c", "a", "b"]);
        let extractor = CannedExtractor {
            documents: [("a", "ALPHA"), ("b", "BRAVO"), ("c", "CHARLIE")]
                .into_iter()
                .map(|(k, t)| (k.to_string(), fiche(&format!("UNITÉ {t}"))))
                .collect(),
        };
        let profile = Profile::preset("benimallal").unwrap();

        for workers in [1, 4] {
            let report = run_batch(&paths, &extractor, &profile, 10, workers).unwrap();
            let titles: Vec<_> = report
                .records
                .iter()
                .map(|r| (r.project_id, r.project_title.clone().unwrap()))
                .collect();
            assert_eq!(
                titles,
                vec![
                    (10, "UNITÉ ALPHA".to_string()),
                    (11, "UNITÉ BRAVO".to_string()),
                    (12, "UNITÉ CHARLIE".to_string()),
                ]
            );
            assert_eq!(report.next_id, 13);
        }
    }

    #[test]
    fn test_failed_document_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_docs(dir.path(), &["a", "broken", "blank"]);
        let mut documents = HashMap::new();
        documents.insert("a".to_string(), fiche("HUILERIE"));
        documents.insert("blank".to_string(), vec![PageContent::from_text(1, "  \n ")]);
        let extractor = CannedExtractor { documents };
        let profile = Profile::preset("benimallal").unwrap();

        let report = run_batch(&paths, &extractor, &profile, 1, 2).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().any(|f| f.reason.contains("no text content")));
        assert_eq!(report.records[0].project_id, 1);
    }

    #[test]
    fn test_panicking_document_becomes_failure() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_docs(dir.path(), &["a", "crash"]);
        let mut documents = HashMap::new();
        documents.insert("a".to_string(), fiche("HUILERIE"));
        let extractor = CannedExtractor { documents };
        let profile = Profile::preset("benimallal").unwrap();

        let report = run_batch(&paths, &extractor, &profile, 1, 2).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].project_title.as_deref(), Some("HUILERIE"));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("crash.pdf"));
        assert!(report.failures[0].reason.contains("backend crashed"));
    }

    #[test]
    fn test_oversized_figures_keep_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_docs(dir.path(), &["a", "huge"]);
        let mut documents = HashMap::new();
        documents.insert("a".to_string(), fiche("HUILERIE"));
        documents.insert(
            "huge".to_string(),
            vec![PageContent::from_text(
                1,
                "Projet N° : PR2\nUNITÉ GÉANTE\nINVESTISSEMENT : 99999999999999999999999999 MDH\n\
                 Superficie : 70000000000000000000000000000 - 70000000000000000000000000000 Ha",
            )],
        );
        let extractor = CannedExtractor { documents };
        let profile = Profile::preset("benimallal").unwrap();

        let report = run_batch(&paths, &extractor, &profile, 1, 2).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.records.len(), 2);
        let huge = &report.records[1];
        assert_eq!(huge.project_title.as_deref(), Some("UNITÉ GÉANTE"));
        assert_eq!(huge.estimated_investment_mad, None);
        assert_eq!(huge.required_land_area_m2, None);
        assert_eq!(report.records[0].project_title.as_deref(), Some("HUILERIE"));
    }

    #[test]
    fn test_multi_project_units_use_start_pages() {
        let profile = Profile::preset("fesmeknes").unwrap();
        let pages = vec![
            PageContent::from_text(1, "Catalogue"),
            PageContent::from_text(2, "PROJET N° 1 : SÉCHAGE DE FRUITS\nFILIÈRE : AGRICULTURE"),
            PageContent::from_text(3, "INDICATEURS"),
            PageContent::from_text(4, "PROJET N° 2 : HUILERIE\nFILIÈRE : AGROALIMENTAIRE"),
        ];
        let doc = SourceDocument::new(Path::new("catalogue.pdf"), pages, &profile).unwrap();
        let units = plan_units(Arc::new(doc), &profile);
        let starts: Vec<_> = units.iter().map(|u| (u.start_page, u.page_count)).collect();
        assert_eq!(starts, vec![(2, 2), (4, 2)]);

        let record = process_unit(&units[1], 5, &profile).unwrap();
        assert_eq!(record.pdf_page_number, 4);
        assert_eq!(record.project_title.as_deref(), Some("HUILERIE"));
        assert_eq!(record.sector.as_deref(), Some("AGROALIMENTAIRE"));
    }

    #[test]
    fn test_unit_past_document_end_is_dropped() {
        let profile = Profile::preset("benimallal").unwrap();
        let pages = vec![PageContent {
            page_number: 1,
            lines: vec!["Projet N° : PR1".into()],
            width: Some(600.0),
            glyphs: vec![Glyph::new(0.0, 5.0, 10.0, "P")],
        }];
        let doc = Arc::new(SourceDocument::new(Path::new("x.pdf"), pages, &profile).unwrap());
        let unit = WorkUnit {
            document: doc,
            start_page: 3,
            page_count: 2,
        };
        assert!(process_unit(&unit, 1, &profile).is_none());
    }

    #[test]
    fn test_list_documents_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PDF", "a.pdf", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let paths = list_documents(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
    }

    #[test]
    fn test_list_documents_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            list_documents(dir.path()),
            Err(FichesError::NoDocuments(_))
        ));
    }
}
