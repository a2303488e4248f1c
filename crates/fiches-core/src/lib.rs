pub mod assemble;
pub mod dataset;
pub mod error;
pub mod extraction;
pub mod layout;
pub mod model;
pub mod parsing;
pub mod pipeline;
pub mod profiles;

use dataset::{Dataset, WriteOutcome};
use error::FichesError;
use extraction::PdfExtractor;
use model::ProjectRecord;
use pipeline::{plan_units, process_unit, run_batch, DocumentFailure, SourceDocument};
use profiles::Profile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Main API entry point: extract every project record from one PDF.
///
/// Multi-project documents are split into one unit per detected project.
/// Records are numbered consecutively from `first_id`.
pub fn extract_pdf(
    pdf_bytes: &[u8],
    source: &Path,
    extractor: &dyn PdfExtractor,
    profile: &Profile,
    first_id: u64,
) -> Result<Vec<ProjectRecord>, FichesError> {
    // Extract text from PDF
    let pages = extractor.extract_pages(pdf_bytes)?;
    let document = Arc::new(SourceDocument::new(source, pages, profile)?);

    // Split into project units, then locate and assemble each one
    let records = plan_units(document, profile)
        .iter()
        .zip(first_id..)
        .filter_map(|(unit, id)| process_unit(unit, id, profile))
        .collect();

    Ok(records)
}

/// Outcome of a dataset refresh.
#[derive(Debug)]
pub struct RefreshSummary {
    pub written: WriteOutcome,
    /// Rows of the refreshed source that were replaced.
    pub removed: usize,
    pub added: usize,
    /// Rows in the written dataset.
    pub total: usize,
    pub failures: Vec<DocumentFailure>,
}

/// Re-extract one source and merge it into the dataset at `output`.
///
/// Rows of other sources are preserved untouched. The source's old rows are
/// replaced, and new ids start past every id the dataset held before the
/// refresh.
pub fn refresh_dataset(
    paths: &[PathBuf],
    output: &Path,
    extractor: &dyn PdfExtractor,
    profile: &Profile,
    workers: usize,
) -> Result<RefreshSummary, FichesError> {
    let mut dataset = Dataset::load(output);
    let first_id = dataset.next_project_id();
    let removed = dataset.remove_source(&profile.def.source_type, &profile.def.region);
    info!(
        existing = dataset.len() + removed,
        removed,
        first_id,
        "dataset loaded"
    );

    let report = run_batch(paths, extractor, profile, first_id, workers)?;
    dataset.append(&report.records);
    let written = dataset.write(output)?;
    info!(path = %written.path.display(), rows = dataset.len(), "dataset written");

    Ok(RefreshSummary {
        written,
        removed,
        added: report.records.len(),
        total: dataset.len(),
        failures: report.failures,
    })
}
