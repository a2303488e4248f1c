pub mod builtin;
pub mod schema;

use crate::assemble::RecordAssembler;
use crate::error::FichesError;
use crate::parsing::fields::FieldLocator;
use crate::parsing::segment::ProjectSegmenter;
use schema::{BoundedPatternDef, ProfileDef, TitleStrategy};
use std::path::Path;

/// Load a profile from a JSON file.
pub fn load_profile(path: &Path) -> Result<ProfileDef, FichesError> {
    let content = std::fs::read_to_string(path).map_err(|e| FichesError::ProfileLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_profile(&content, path)
}

/// Parse a profile from a JSON string.
pub fn parse_profile(json: &str, source: &Path) -> Result<ProfileDef, FichesError> {
    let profile: ProfileDef = serde_json::from_str(json).map_err(|e| FichesError::ProfileLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_profile(&profile)?;
    Ok(profile)
}

/// Parse a profile from a JSON string (no file path context).
pub fn parse_profile_str(json: &str) -> Result<ProfileDef, FichesError> {
    let profile: ProfileDef = serde_json::from_str(json).map_err(FichesError::Json)?;
    validate_profile(&profile)?;
    Ok(profile)
}

/// Validate that a profile is well-formed and that every pattern compiles.
pub fn validate_profile(profile: &ProfileDef) -> Result<(), FichesError> {
    if profile.source_type.trim().is_empty() {
        return Err(FichesError::ProfileInvalid(
            "source_type must not be empty".into(),
        ));
    }

    if profile.region.trim().is_empty() {
        return Err(FichesError::ProfileInvalid("region must not be empty".into()));
    }

    let layout = &profile.layout;
    if !(layout.left_ratio > 0.0 && layout.left_ratio < 1.0) {
        return Err(FichesError::ProfileInvalid(format!(
            "layout.left_ratio {} must lie strictly between 0 and 1",
            layout.left_ratio
        )));
    }
    if layout.max_pages == 0 {
        return Err(FichesError::ProfileInvalid(
            "layout.max_pages must be at least 1".into(),
        ));
    }

    if let Some(ref seg) = profile.segmenter {
        if seg.window == 0 {
            return Err(FichesError::ProfileInvalid(
                "segmenter.window must be at least 1".into(),
            ));
        }
    }

    let title = &profile.title;
    if title.strategies.is_empty() {
        return Err(FichesError::ProfileInvalid(
            "title.strategies must not be empty".into(),
        ));
    }
    if title.strategies.contains(&TitleStrategy::NextLine) && title.marker.is_none() {
        return Err(FichesError::ProfileInvalid(
            "title strategy 'next_line' requires title.marker".into(),
        ));
    }
    if title.strategies.contains(&TitleStrategy::Inline) && title.patterns.is_empty() {
        return Err(FichesError::ProfileInvalid(
            "title strategy 'inline' requires at least one pattern".into(),
        ));
    }

    for (field, pattern) in [
        ("sector", &profile.sector.pattern),
        ("sub_sector", &profile.sub_sector.pattern),
        ("location", &profile.location.pattern),
    ] {
        check_bounded(field, pattern)?;
    }

    if profile.project_description.stops.is_empty() {
        return Err(FichesError::ProfileInvalid(
            "project_description.stops must list the section labels that end a description"
                .into(),
        ));
    }

    if profile.zones.max_tokens == 0 {
        return Err(FichesError::ProfileInvalid(
            "zones.max_tokens must be at least 1".into(),
        ));
    }

    let t = &profile.thresholds;
    if t.low_max > t.medium_max {
        return Err(FichesError::ProfileInvalid(format!(
            "thresholds.low_max ({}) exceeds thresholds.medium_max ({})",
            t.low_max, t.medium_max
        )));
    }
    if t.min_investment_ratio.is_sign_negative() {
        return Err(FichesError::ProfileInvalid(
            "thresholds.min_investment_ratio must not be negative".into(),
        ));
    }
    if t.reference_max_len < 20 {
        return Err(FichesError::ProfileInvalid(format!(
            "thresholds.reference_max_len {} leaves no room for a title",
            t.reference_max_len
        )));
    }

    if let Some(ref crawl) = profile.crawl {
        if crawl.start_url.trim().is_empty() || crawl.host_suffix.trim().is_empty() {
            return Err(FichesError::ProfileInvalid(
                "crawl.start_url and crawl.host_suffix must not be empty".into(),
            ));
        }
    }

    // Surfaces bad regexes at load time rather than mid-batch.
    Profile::compile(profile.clone()).map(|_| ())
}

fn check_bounded(field: &str, pattern: &BoundedPatternDef) -> Result<(), FichesError> {
    if pattern.start.trim().is_empty() {
        return Err(FichesError::ProfileInvalid(format!(
            "{field}.pattern.start must not be empty"
        )));
    }
    if pattern.stops.is_empty() && !pattern.stop_at_newline {
        return Err(FichesError::ProfileInvalid(format!(
            "{field}.pattern needs stops or stop_at_newline"
        )));
    }
    Ok(())
}

/// A profile with every pattern compiled, ready to be shared across workers.
#[derive(Debug)]
pub struct Profile {
    pub def: ProfileDef,
    pub locator: FieldLocator,
    /// Set for documents holding several projects.
    pub segmenter: Option<ProjectSegmenter>,
    pub assembler: RecordAssembler,
}

impl Profile {
    pub fn compile(def: ProfileDef) -> Result<Self, FichesError> {
        let locator = FieldLocator::new(&def)?;
        let segmenter = def
            .segmenter
            .as_ref()
            .map(ProjectSegmenter::new)
            .transpose()?;
        let assembler = RecordAssembler::new(&def);
        Ok(Profile {
            def,
            locator,
            segmenter,
            assembler,
        })
    }

    /// Load, validate and compile a built-in preset.
    pub fn preset(name: &str) -> Result<Self, FichesError> {
        let def = builtin::load_preset(name)?;
        validate_profile(&def)?;
        Self::compile(def)
    }

    /// Load, validate and compile a profile file.
    pub fn from_file(path: &Path) -> Result<Self, FichesError> {
        Self::compile(load_profile(path)?)
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn is_multi_project(&self) -> bool {
        self.segmenter.is_some()
    }
}
