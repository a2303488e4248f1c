//! The persisted project dataset and its per-source refresh.
//!
//! Rows are kept as raw strings in [`COLUMNS`] order, so rows belonging to
//! other sources are written back exactly as they were read.

use crate::error::FichesError;
use crate::model::{ProjectRecord, COLUMNS};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

const BOM: &str = "\u{feff}";

#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<Vec<String>>,
    has_source_column: bool,
    has_region_column: bool,
}

/// Where a dataset ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// The target was locked and a sibling file was written instead.
    pub used_fallback: bool,
}

impl Default for Dataset {
    fn default() -> Self {
        Dataset {
            rows: Vec::new(),
            has_source_column: true,
            has_region_column: true,
        }
    }
}

impl Dataset {
    /// Load the dataset at `path`. A missing or unreadable file yields an
    /// empty dataset; the latter is logged.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::read(path) {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!(path = %path.display(), "existing dataset unreadable, starting empty: {e}");
                Self::default()
            }
        }
    }

    /// Read a dataset strictly. Columns are matched by header name; unknown
    /// columns are dropped and missing ones read as empty.
    pub fn read(path: &Path) -> Result<Self, FichesError> {
        let data = std::fs::read(path)?;
        let body = data.strip_prefix(BOM.as_bytes()).unwrap_or(&data[..]);
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let index: Vec<Option<usize>> = COLUMNS
            .iter()
            .map(|c| headers.iter().position(|h| h.as_str() == *c))
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                index
                    .iter()
                    .map(|i| i.and_then(|i| record.get(i)).unwrap_or("").to_string())
                    .collect(),
            );
        }

        Ok(Dataset {
            rows,
            has_source_column: headers.iter().any(|h| h == "source_type"),
            has_region_column: headers.iter().any(|h| h == "region"),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Largest numeric `project_id`, 0 when there is none.
    pub fn max_project_id(&self) -> u64 {
        self.rows
            .iter()
            .filter_map(|r| parse_id(&r[column("project_id")]))
            .max()
            .unwrap_or(0)
    }

    /// First id for a new batch: one past the largest id already present,
    /// counting rows that are about to be replaced.
    pub fn next_project_id(&self) -> u64 {
        self.max_project_id() + 1
    }

    /// Drop the rows of one source. Rows are matched on `source_type`, or on
    /// `region` for datasets written before `source_type` existed. Returns
    /// the number of rows removed.
    pub fn remove_source(&mut self, source_type: &str, region: &str) -> usize {
        let before = self.rows.len();
        if self.has_source_column {
            let col = column("source_type");
            self.rows.retain(|r| r[col] != source_type);
        } else if self.has_region_column {
            let col = column("region");
            self.rows.retain(|r| r[col] != region);
        }
        before - self.rows.len()
    }

    pub fn append(&mut self, records: &[ProjectRecord]) {
        self.rows.extend(records.iter().map(ProjectRecord::to_row));
        self.has_source_column = true;
        self.has_region_column = true;
    }

    pub fn has_unique_ids(&self) -> bool {
        let col = column("project_id");
        let mut seen = HashSet::new();
        self.rows.iter().all(|r| seen.insert(r[col].trim()))
    }

    /// Write atomically: a temporary sibling file is renamed over `path`.
    ///
    /// A target that is read-only, or that the rename is refused on, counts
    /// as locked; the data then goes to `<stem>_new.<ext>` instead.
    pub fn write(&self, path: &Path) -> Result<WriteOutcome, FichesError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        self.write_to(tmp.as_file())?;

        if is_read_only(path) {
            return persist_fallback(tmp, path);
        }
        match tmp.persist(path) {
            Ok(_) => Ok(WriteOutcome {
                path: path.to_path_buf(),
                used_fallback: false,
            }),
            Err(e) if e.error.kind() == io::ErrorKind::PermissionDenied => {
                persist_fallback(e.file, path)
            }
            Err(e) => Err(FichesError::Io(e.error)),
        }
    }

    /// Serialize as UTF-8 with a byte-order mark, every non-numeric field quoted.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<(), FichesError> {
        out.write_all(BOM.as_bytes())?;
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::NonNumeric)
            .from_writer(out);
        writer.write_record(COLUMNS)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn persist_fallback(tmp: NamedTempFile, path: &Path) -> Result<WriteOutcome, FichesError> {
    let fallback = fallback_path(path);
    warn!(
        path = %path.display(),
        fallback = %fallback.display(),
        "dataset is locked, writing alongside it"
    );
    tmp.persist(&fallback).map_err(|e| FichesError::Io(e.error))?;
    Ok(WriteOutcome {
        path: fallback,
        used_fallback: true,
    })
}

fn is_read_only(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.permissions().readonly())
        .unwrap_or(false)
}

/// `<stem>_new.<ext>` next to `path`.
pub fn fallback_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".into());
    let name = match path.extension() {
        Some(ext) => format!("{stem}_new.{}", ext.to_string_lossy()),
        None => format!("{stem}_new"),
    };
    path.with_file_name(name)
}

fn column(name: &str) -> usize {
    COLUMNS.iter().position(|c| *c == name).unwrap_or(0)
}

// Integer ids, tolerating a float rendering such as "12.0".
fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}
