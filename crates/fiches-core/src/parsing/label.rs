//! Label-anchored captures.
//!
//! A capture starts right after a label and runs to the first stop label
//! (or the end of the text). Section labels are matched case-insensitively.

use crate::error::FichesError;
use crate::profiles::schema::BoundedPatternDef;
use regex::Regex;

/// Compile a profile pattern case-insensitively.
pub fn compile(field: &str, pattern: &str) -> Result<Regex, FichesError> {
    Regex::new(&format!("(?i){pattern}")).map_err(|source| FichesError::Pattern {
        field: field.to_string(),
        source,
    })
}

pub fn compile_all(field: &str, patterns: &[String]) -> Result<Vec<Regex>, FichesError> {
    patterns.iter().map(|p| compile(field, p)).collect()
}

/// Join regex fragments into one alternation, each fragment grouped.
pub fn alternation(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| format!("(?:{p})"))
        .collect::<Vec<_>>()
        .join("|")
}

/// Remove every match of each pattern, in order.
pub fn strip_all(value: &str, patterns: &[Regex]) -> String {
    patterns.iter().fold(value.to_string(), |acc, re| {
        re.replace_all(&acc, "").into_owned()
    })
}

#[derive(Debug, Clone)]
pub struct BoundedCapture {
    start: Regex,
    stop: Option<Regex>,
}

impl BoundedCapture {
    pub fn new(field: &str, def: &BoundedPatternDef) -> Result<Self, FichesError> {
        let start = compile(field, &def.start)?;

        let mut alternatives = Vec::new();
        if !def.stops.is_empty() {
            let inner = alternation(&def.stops);
            alternatives.push(if def.line_start {
                format!(r"\n\s*(?:{inner})")
            } else if def.word_bounded {
                format!(r"\b(?:{inner})\b")
            } else {
                inner
            });
        }
        if def.stop_at_newline {
            alternatives.push(r"\n".to_string());
        }

        let stop = if alternatives.is_empty() {
            None
        } else {
            Some(compile(field, &alternatives.join("|"))?)
        };

        Ok(BoundedCapture { start, stop })
    }

    /// Text after the first label match, up to the first stop.
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        let m = self.start.find(text)?;
        let end = self.capture_end(text, m.end())?;
        Some(&text[m.end()..end])
    }

    /// Like [`capture`](Self::capture), but keeps the label itself.
    pub fn capture_with_label<'t>(&self, text: &'t str) -> Option<&'t str> {
        let m = self.start.find(text)?;
        let end = self.capture_end(text, m.end())?;
        Some(&text[m.start()..end])
    }

    // A capture holds at least one character, so stops are searched from the
    // second character on. None when the label ends the text.
    fn capture_end(&self, text: &str, from: usize) -> Option<usize> {
        let first = text[from..].chars().next()?;
        let search_at = from + first.len_utf8();
        Some(match &self.stop {
            Some(stop) => stop
                .find_at(text, search_at)
                .map_or(text.len(), |m| m.start()),
            None => text.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(start: &str, stops: &[&str]) -> BoundedPatternDef {
        BoundedPatternDef {
            start: start.into(),
            stops: stops.iter().map(|s| s.to_string()).collect(),
            word_bounded: false,
            line_start: false,
            stop_at_newline: false,
        }
    }

    #[test]
    fn test_capture_runs_to_first_stop() {
        let cap = BoundedCapture::new(
            "sector",
            &bounded(r"Secteur\s*économique\s*:\s*", &["Filières", "ACTIVITÉ"]),
        )
        .unwrap();
        let text = "Secteur économique : AGRICULTURE Filières de production : AGRUMES";
        assert_eq!(cap.capture(text), Some("AGRICULTURE "));
    }

    #[test]
    fn test_capture_runs_to_end_without_stop() {
        let cap = BoundedCapture::new("sector", &bounded(r"Secteur\s*:\s*", &["Filières"])).unwrap();
        assert_eq!(cap.capture("Secteur : INDUSTRIE"), Some("INDUSTRIE"));
    }

    #[test]
    fn test_label_is_case_insensitive() {
        let cap = BoundedCapture::new("sector", &bounded(r"FILIÈRE\s*:\s*", &["Contact"])).unwrap();
        assert_eq!(cap.capture("Filière : TEXTILE Contact : x"), Some("TEXTILE "));
    }

    #[test]
    fn test_label_at_end_captures_nothing() {
        let cap = BoundedCapture::new("sector", &bounded(r"Secteur\s*:\s*", &[])).unwrap();
        assert_eq!(cap.capture("Secteur : "), None);
        assert_eq!(cap.capture("pas de libellé"), None);
    }

    #[test]
    fn test_capture_holds_at_least_one_character() {
        let cap = BoundedCapture::new("title", &bounded(r"Projet\s*:", &["X"])).unwrap();
        assert_eq!(cap.capture("Projet :XYZ"), Some("XYZ"));
    }

    #[test]
    fn test_word_bounded_stops() {
        let mut def = bounded(r"Lieu\s*:\s*", &["ZI", "Sup"]);
        def.word_bounded = true;
        let cap = BoundedCapture::new("location", &def).unwrap();
        // "Zirara" must not end the capture, the standalone "ZI" does.
        assert_eq!(
            cap.capture("Lieu : Zirara ZI Ouled Yaich"),
            Some("Zirara ")
        );
    }

    #[test]
    fn test_line_start_stops() {
        let mut def = bounded(r"DESCRIPTION\s*", &["INDICATEURS"]);
        def.line_start = true;
        let cap = BoundedCapture::new("description", &def).unwrap();
        let text = "DESCRIPTION Suivi des indicateurs de qualité\n  INDICATEURS CLÉS";
        assert_eq!(cap.capture(text), Some("Suivi des indicateurs de qualité"));
    }

    #[test]
    fn test_newline_stop() {
        let mut def = bounded(r"FILIÈRE\s*:\s*", &["Contact"]);
        def.stop_at_newline = true;
        let cap = BoundedCapture::new("sector", &def).unwrap();
        assert_eq!(cap.capture("FILIÈRE : AGRICULTURE\nSOUS-FILIÈRE"), Some("AGRICULTURE"));
    }

    #[test]
    fn test_capture_with_label() {
        let cap = BoundedCapture::new("description", &bounded(r"(?:^|\n)\s*Une\s+", &["\n"])).unwrap();
        assert_eq!(
            cap.capture_with_label("Titre\nUne unité de pressage\nSuite"),
            Some("\nUne unité de pressage")
        );
    }

    #[test]
    fn test_invalid_pattern_names_field() {
        let err = BoundedCapture::new("zones", &bounded("(", &[])).unwrap_err();
        assert!(err.to_string().contains("zones"));
    }

    #[test]
    fn test_strip_all_applies_in_order() {
        let patterns = vec![
            compile("t", r"\s+Contact\s*:.*").unwrap(),
            compile("t", r"^\s+").unwrap(),
        ];
        assert_eq!(strip_all("  HUILE Contact : 0600", &patterns), "HUILE");
    }
}
