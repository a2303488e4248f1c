use crate::error::FichesError;
use crate::layout::LayoutText;
use crate::model::ExtractedFields;
use crate::parsing::label::{alternation, compile, compile_all, strip_all, BoundedCapture};
use crate::parsing::normalize::{clean_text, repair_spacing};
use crate::parsing::numbers::extract_numbers;
use crate::profiles::schema::{
    BoundedPatternDef, Column, FilenameHint, LabeledFieldDef, ProfileDef, TitleStrategy, ZoneDef,
};
use regex::Regex;
use std::sync::LazyLock;

/// Locates every descriptive field of one project unit, following the
/// vocabularies of a profile.
#[derive(Debug)]
pub struct FieldLocator {
    title: TitleLocator,
    sector: LabeledField,
    sub_sector: LabeledField,
    description: DescriptionLocator,
    location: LocationLocator,
    zones: ZoneLocator,
}

impl FieldLocator {
    pub fn new(profile: &ProfileDef) -> Result<Self, FichesError> {
        Ok(FieldLocator {
            title: TitleLocator::new(profile)?,
            sector: LabeledField::new("sector", &profile.sector)?,
            sub_sector: LabeledField::new("sub_sector", &profile.sub_sector)?,
            description: DescriptionLocator::new(profile)?,
            location: LocationLocator::new(profile)?,
            zones: ZoneLocator::new(&profile.zones)?,
        })
    }

    /// Locate all fields. `source_name` is the document's file name, used for
    /// title and sector fallbacks.
    pub fn locate(&self, layout: &LayoutText, source_name: &str) -> ExtractedFields {
        let combined = layout.combined();
        ExtractedFields {
            title: Some(self.title.locate(&layout.full, source_name)),
            description: self.description.locate(layout),
            sector: self.sector.locate(layout, source_name),
            sub_sector: self.sub_sector.locate(layout, source_name),
            province: self.location.locate(&combined),
            industrial_zone: self.zones.locate(&combined),
            numbers: extract_numbers(&combined),
        }
    }
}

#[derive(Debug)]
struct TitleLocator {
    strategies: Vec<TitleStrategy>,
    marker: Option<Regex>,
    reject: Vec<String>,
    patterns: Vec<BoundedCapture>,
    strip: Vec<Regex>,
}

impl TitleLocator {
    fn new(profile: &ProfileDef) -> Result<Self, FichesError> {
        let def = &profile.title;
        Ok(TitleLocator {
            strategies: def.strategies.clone(),
            marker: def.marker.as_deref().map(|m| compile("title", m)).transpose()?,
            reject: def.reject.clone(),
            patterns: def
                .patterns
                .iter()
                .map(|p| BoundedCapture::new("title", p))
                .collect::<Result<_, _>>()?,
            strip: compile_all("title", &def.strip)?,
        })
    }

    fn locate(&self, text: &str, source_name: &str) -> String {
        self.strategies
            .iter()
            .find_map(|strategy| match strategy {
                TitleStrategy::NextLine => self.next_line(text),
                TitleStrategy::Inline => self.inline(text),
            })
            .map(|t| collapse_repeated_title(&t))
            .unwrap_or_else(|| title_from_file_name(source_name))
    }

    // The first line after a marker line that is long enough and carries no
    // rejected label.
    fn next_line(&self, text: &str) -> Option<String> {
        let marker = self.marker.as_ref()?;
        let lines: Vec<&str> = text.lines().collect();
        lines.iter().enumerate().find_map(|(i, line)| {
            if !marker.is_match(line) {
                return None;
            }
            let candidate = lines.get(i + 1)?.trim();
            let acceptable = candidate.chars().count() > 3
                && !self.reject.iter().any(|r| candidate.contains(r.as_str()));
            acceptable.then(|| clean_text(candidate))
        })
    }

    fn inline(&self, text: &str) -> Option<String> {
        self.patterns.iter().find_map(|p| {
            let raw = p.capture(text)?;
            let title = clean_text(&strip_all(raw, &self.strip));
            (title.chars().count() > 2).then_some(title)
        })
    }
}

/// Collapse a title whose first half repeats as its second half, an artifact
/// of side-by-side column capture.
pub fn collapse_repeated_title(title: &str) -> String {
    let words: Vec<&str> = title.split_whitespace().collect();
    let half = words.len() / 2;
    if words.len() >= 2 && words.len() % 2 == 0 && words[..half] == words[half..] {
        words[..half].join(" ")
    } else {
        words.join(" ")
    }
}

/// Title derived from a file name: extension dropped, separators spaced.
pub fn title_from_file_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(idx) if name[idx..].eq_ignore_ascii_case(".pdf") => &name[..idx],
        _ => name,
    };
    clean_text(&stem.replace(['-', '_'], " "))
}

#[derive(Debug)]
struct LabeledField {
    capture: BoundedCapture,
    column: Column,
    strip: Vec<Regex>,
    hints: Vec<FilenameHint>,
    default: Option<String>,
}

impl LabeledField {
    fn new(field: &str, def: &LabeledFieldDef) -> Result<Self, FichesError> {
        Ok(LabeledField {
            capture: BoundedCapture::new(field, &def.pattern)?,
            column: def.column,
            strip: compile_all(field, &def.strip)?,
            hints: def.filename_hints.clone(),
            default: def.default.clone(),
        })
    }

    // Preferred column, then full text, then file-name hints, then default.
    fn locate(&self, layout: &LayoutText, source_name: &str) -> Option<String> {
        self.from_text(column_text(layout, self.column))
            .or_else(|| self.from_text(&layout.full))
            .or_else(|| self.from_file_name(source_name))
            .or_else(|| self.default.clone())
    }

    fn from_text(&self, text: &str) -> Option<String> {
        let raw = self.capture.capture(text)?;
        let value = clean_text(&strip_all(raw, &self.strip));
        (!value.is_empty()).then_some(value)
    }

    fn from_file_name(&self, source_name: &str) -> Option<String> {
        let lower = source_name.to_lowercase();
        self.hints
            .iter()
            .find(|h| lower.contains(&h.contains.to_lowercase()))
            .map(|h| h.value.clone())
    }
}

fn column_text(layout: &LayoutText, column: Column) -> &str {
    match column {
        Column::Left => &layout.left,
        Column::Right => &layout.right,
        Column::Full => &layout.full,
    }
}

#[derive(Debug)]
struct DescriptionLocator {
    heading: BoundedCapture,
    narrative: Option<BoundedCapture>,
    strip: Vec<Regex>,
    min_len: usize,
    repair_spacing: bool,
}

impl DescriptionLocator {
    fn new(profile: &ProfileDef) -> Result<Self, FichesError> {
        let def = &profile.project_description;
        let heading = BoundedCapture::new(
            "project_description",
            &BoundedPatternDef {
                start: def.heading.clone(),
                stops: def.stops.clone(),
                word_bounded: false,
                line_start: true,
                stop_at_newline: false,
            },
        )?;
        let narrative = if def.narrative_starters.is_empty() {
            None
        } else {
            Some(BoundedCapture::new(
                "project_description",
                &BoundedPatternDef {
                    start: format!(
                        r"(?-i)(?:^|\n)\s*(?:{})",
                        alternation(&def.narrative_starters)
                    ),
                    stops: def.stops.clone(),
                    word_bounded: false,
                    line_start: true,
                    stop_at_newline: false,
                },
            )?)
        };

        Ok(DescriptionLocator {
            heading,
            narrative,
            strip: compile_all("project_description", &def.strip)?,
            min_len: def.min_len.max(1),
            repair_spacing: def.repair_spacing,
        })
    }

    // Heading block in the left column, then in the full text; failing that,
    // the first narrative sentence, left column first.
    fn locate(&self, layout: &LayoutText) -> Option<String> {
        let texts = [layout.left.as_str(), layout.full.as_str()];
        texts
            .iter()
            .find_map(|t| self.finish(self.heading.capture(t)?))
            .or_else(|| {
                let narrative = self.narrative.as_ref()?;
                texts
                    .iter()
                    .find_map(|t| self.finish(narrative.capture_with_label(t)?))
            })
    }

    fn finish(&self, raw: &str) -> Option<String> {
        let mut text = clean_text(&strip_all(raw, &self.strip));
        if self.repair_spacing {
            text = repair_spacing(&text);
        }
        (text.chars().count() >= self.min_len).then_some(text)
    }
}

static LOCATION_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[;\u{2013}\u{2014}\-]\s*").unwrap());

#[derive(Debug)]
struct LocationLocator {
    provinces: Vec<(String, Regex)>,
    label: BoundedCapture,
    max_len: usize,
}

impl LocationLocator {
    fn new(profile: &ProfileDef) -> Result<Self, FichesError> {
        let def = &profile.location;
        let provinces = def
            .provinces
            .iter()
            .map(|p| -> Result<(String, Regex), FichesError> {
                let re = compile("location", &format!(r"\b{}\b", regex::escape(p)))?;
                Ok((p.clone(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LocationLocator {
            provinces,
            label: BoundedCapture::new("location", &def.pattern)?,
            max_len: def.max_len,
        })
    }

    // Known provinces first, in list order; then the labelled location's
    // first chunk when it looks like a place name.
    fn locate(&self, text: &str) -> Option<String> {
        self.provinces
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(name, _)| name.clone())
            .or_else(|| self.from_label(text))
    }

    fn from_label(&self, text: &str) -> Option<String> {
        let cleaned = clean_text(self.label.capture(text)?);
        let first = LOCATION_SEPARATOR.split(&cleaned).next()?.trim();
        let looks_like_place = !first.is_empty()
            && first.chars().count() <= self.max_len
            && !first.chars().any(|c| c.is_ascii_digit() || c == '%');
        looks_like_place.then(|| first.to_string())
    }
}

const ZONE_TRIM: &[char] = &[' ', '-', '\u{2013}', '\u{2014}', '.', ',', ';', ':', '/', '\\'];

static DASHED_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s[-\u{2013}\u{2014}]\s").unwrap());

#[derive(Debug)]
struct ZoneLocator {
    prefixes: Vec<Regex>,
    stop: Option<Regex>,
    trailing_stop: Option<Regex>,
    names: Vec<String>,
    max_tokens: usize,
}

impl ZoneLocator {
    fn new(def: &ZoneDef) -> Result<Self, FichesError> {
        let prefixes = def
            .prefixes
            .iter()
            .map(|p| compile("zones", &format!(r"(?:{p})([A-Za-zÀ-ÿ][A-Za-zÀ-ÿ\s\-]{{0,40}})")))
            .collect::<Result<_, _>>()?;
        let (stop, trailing_stop) = if def.stops.is_empty() {
            (None, None)
        } else {
            let stops = alternation(&def.stops);
            (
                Some(compile("zones", &format!(r"\b(?:{stops})\b|[;\n]"))?),
                Some(compile("zones", &format!(r"(?s)\s*\b(?:{stops})\b.*$"))?),
            )
        };
        Ok(ZoneLocator {
            prefixes,
            stop,
            trailing_stop,
            names: def.names.clone(),
            max_tokens: def.max_tokens,
        })
    }

    /// Every distinct zone, in discovery order, joined with "; ".
    fn locate(&self, text: &str) -> Option<String> {
        let text: String = text
            .chars()
            .map(|c| if c == '\u{f0b7}' || c == '\u{2022}' { ' ' } else { c })
            .collect();

        let mut found: Vec<String> = Vec::new();
        for prefix in &self.prefixes {
            for raw in self.prefixed_matches(prefix, &text) {
                let zone = self.trim_zone(raw);
                if !zone.is_empty() && !found.contains(&zone) {
                    found.push(zone);
                }
            }
        }

        let upper = text.to_uppercase();
        for name in &self.names {
            if upper.contains(&name.to_uppercase()) && !found.contains(name) {
                found.push(name.clone());
            }
        }

        (!found.is_empty()).then(|| found.join("; "))
    }

    // A prefix followed by a short name that must end right before a stop
    // label, a separator, or the end of the text. The shortest such name wins.
    fn prefixed_matches<'t>(&self, prefix: &Regex, text: &'t str) -> Vec<&'t str> {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos <= text.len() {
            let Some(caps) = prefix.captures_at(text, pos) else {
                break;
            };
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                break;
            };

            let first_len = text[name.start()..].chars().next().map_or(1, char::len_utf8);
            let boundary = match &self.stop {
                Some(stop) => stop
                    .find_at(text, name.start() + first_len)
                    .map(|m| m.start())
                    .filter(|&at| at <= whole.end()),
                None => None,
            }
            .or((whole.end() == text.len()).then_some(text.len()));

            match boundary {
                Some(end) => {
                    out.push(&text[whole.start()..end]);
                    pos = end.max(whole.start() + 1);
                }
                None => {
                    let step = text[whole.start()..].chars().next().map_or(1, char::len_utf8);
                    pos = whole.start() + step;
                }
            }
        }
        out
    }

    fn trim_zone(&self, raw: &str) -> String {
        let zone = clean_text(raw);
        let zone = zone.trim_matches(ZONE_TRIM);
        if zone.is_empty() {
            return String::new();
        }

        if DASHED_NAME.is_match(zone) {
            let kept = match &self.trailing_stop {
                Some(re) => re.replace(zone, "").into_owned(),
                None => zone.to_string(),
            };
            return kept.trim_matches(ZONE_TRIM).to_string();
        }

        zone.split_whitespace()
            .take(self.max_tokens)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
