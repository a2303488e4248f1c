use fiches_core::extraction::pdftotext::PdftotextExtractor;
use fiches_core::profiles::Profile;
use std::path::PathBuf;

use crate::error::CliError;
use crate::output;

pub fn run(
    pdf_file: PathBuf,
    profile: &Profile,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let pdf_bytes = std::fs::read(&pdf_file)?;
    let extractor = PdftotextExtractor::new();
    let records = fiches_core::extract_pdf(&pdf_bytes, &pdf_file, &extractor, profile, 1)?;

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&records)?;
            std::fs::write(&path, json)?;
            eprintln!(
                "Extracted {} project(s), written to {}",
                records.len(),
                path.display()
            );
        }
        None => match output_format {
            "json" => output::json::print(&records)?,
            _ => output::table::print(&records),
        },
    }

    Ok(())
}
