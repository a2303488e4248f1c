use fiches_core::error::FichesError;
use fiches_core::extraction::pdftotext::PdftotextExtractor;
use fiches_core::pipeline::{list_documents, worker_count};
use fiches_core::profiles::Profile;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::crawl;
use crate::error::CliError;

pub fn run(
    profile: &Profile,
    docs: Option<PathBuf>,
    output: &Path,
    workers: Option<usize>,
    no_crawl: bool,
) -> Result<(), CliError> {
    if !PdftotextExtractor::is_available() {
        return Err(FichesError::PdftotextNotFound.into());
    }

    let docs = docs.unwrap_or_else(|| Path::new("pdfs").join(profile.name()));
    std::fs::create_dir_all(&docs)?;

    // Fill an empty cache from the source's listing
    if !no_crawl && !has_pdfs(&docs) {
        if let Some(ref def) = profile.def.crawl {
            match crawl::mirror(def, &docs) {
                Ok(stats) => eprintln!(
                    "{} downloaded, {} already current, {} failed",
                    stats.downloaded, stats.skipped, stats.failed
                ),
                Err(e) => warn!("crawl failed: {e}"),
            }
        }
    }

    let paths = list_documents(&docs)?;
    let workers = worker_count(workers);
    eprintln!(
        "{} document(s) in {}, {} worker(s)",
        paths.len(),
        docs.display(),
        workers
    );

    let extractor = PdftotextExtractor::new();
    let summary = fiches_core::refresh_dataset(&paths, output, &extractor, profile, workers)?;

    eprintln!(
        "{}: {} project(s) extracted, {} previous row(s) replaced, {} row(s) in total",
        profile.def.source_type, summary.added, summary.removed, summary.total
    );
    if summary.written.used_fallback {
        eprintln!(
            "  {} is locked; written to {} instead",
            output.display(),
            summary.written.path.display()
        );
    } else {
        eprintln!("  written to {}", summary.written.path.display());
    }
    if !summary.failures.is_empty() {
        eprintln!("  {} document(s) could not be read:", summary.failures.len());
        for f in &summary.failures {
            eprintln!("    {}: {}", f.path.display(), f.reason);
        }
    }

    Ok(())
}

fn has_pdfs(dir: &Path) -> bool {
    list_documents(dir).is_ok()
}
