use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Collapse every whitespace run to a single space and trim.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop diacritics: decompose, then remove combining marks.
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Turn free text into a reference token.
///
/// Steps:
/// 1. Strip accents
/// 2. Keep ASCII letters and digits; whitespace and hyphens become separators
/// 3. Drop every other character
/// 4. Collapse separator runs to one hyphen, trim them from both ends
/// 5. Uppercase
///
/// The result only contains `[A-Z0-9-]` and may be empty.
pub fn reference_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in strip_accents(raw).chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(c.to_ascii_uppercase());
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }

    out
}

const LETTER: &str = "a-zàâäéèêëïîôùûüç";

static COMMA_BEFORE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i),([{LETTER}])")).unwrap());

// Apostrophe glued to a word that cannot elide (c' d' j' l' m' n' s' t' qu' can).
static GLUED_ELISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([abefghikopqrvwxyzàâäéèêëïîôùûüç])(['’])([a-zàâäéèêëïîôùûüç])").unwrap()
});

static PERIOD_BEFORE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\.([{LETTER}])")).unwrap());

static CLOSE_PAREN_BEFORE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\)([{LETTER}])")).unwrap());

static OPEN_PAREN_AFTER_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)([{LETTER}])\(([A-Z])")).unwrap());

/// Re-insert spaces that text extraction dropped around punctuation.
pub fn repair_spacing(s: &str) -> String {
    let s = COMMA_BEFORE_WORD.replace_all(s, ", $1");
    let s = GLUED_ELISION.replace_all(&s, "$1 $2$3");
    let s = PERIOD_BEFORE_WORD.replace_all(&s, ". $1");
    let s = CLOSE_PAREN_BEFORE_WORD.replace_all(&s, ") $1");
    let s = OPEN_PAREN_AFTER_WORD.replace_all(&s, "$1 ($2");
    clean_text(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Unité \n de\tproduction  "), "Unité de production");
    }

    #[test]
    fn test_strip_accents() {
        assert_eq!(strip_accents("Béni Mellal-Khénifra"), "Beni Mellal-Khenifra");
        assert_eq!(strip_accents("Fès çà"), "Fes ca");
    }

    #[test]
    fn test_reference_token_basic() {
        assert_eq!(reference_token("Béni Mellal-Khénifra"), "BENI-MELLAL-KHENIFRA");
    }

    #[test]
    fn test_reference_token_drops_punctuation() {
        assert_eq!(
            reference_token("Unité d'emballage (huile) & conditionnement!"),
            "UNITE-DEMBALLAGE-HUILE-CONDITIONNEMENT"
        );
    }

    #[test]
    fn test_reference_token_collapses_separators() {
        assert_eq!(reference_token(" - A  -  B - "), "A-B");
    }

    #[test]
    fn test_reference_token_can_be_empty() {
        assert_eq!(reference_token("  ***  "), "");
    }

    #[test]
    fn test_reference_token_charset() {
        let token = reference_token("Œuvre № 3 — Ünïcödé_ſtring ½");
        assert!(token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn test_repair_spacing_punctuation() {
        assert_eq!(
            repair_spacing("Unité de production,stockage.Elle vise(Export)le marché"),
            "Unité de production, stockage. Elle vise (Export) le marché"
        );
    }

    #[test]
    fn test_repair_spacing_elision() {
        assert_eq!(repair_spacing("huile'arachide"), "huile 'arachide");
        assert_eq!(repair_spacing("l'huile d'olive qu'il"), "l'huile d'olive qu'il");
    }
}
