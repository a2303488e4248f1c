pub mod fields;
pub mod label;
pub mod normalize;
pub mod numbers;
pub mod segment;

use crate::extraction::PageContent;
use regex::Regex;
use std::sync::LazyLock;

static DAY_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})\b").unwrap());

static YEAR_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})\b").unwrap());

static FILE_DDMMYYYY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})(\d{2})(\d{4})(?:\D|$)").unwrap());

static FILE_DDMMYY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})(\d{2})(\d{2})(?:\D|$)").unwrap());

/// Publication date of a document as `YYYY-MM-DD`: a date printed on the
/// cover page first, then a `DDMMYYYY` or `DDMMYY` run in the file name.
pub fn publication_date(pages: &[PageContent], file_name: &str) -> Option<String> {
    let cover = pages
        .iter()
        .min_by_key(|p| p.page_number)
        .map(|p| p.text())
        .unwrap_or_default();

    if let Some(c) = DAY_FIRST.captures(&cover) {
        if let Some(date) = iso_date(&c[3], &c[2], &c[1]) {
            return Some(date);
        }
    }
    if let Some(c) = YEAR_FIRST.captures(&cover) {
        if let Some(date) = iso_date(&c[1], &c[2], &c[3]) {
            return Some(date);
        }
    }
    if let Some(c) = FILE_DDMMYYYY.captures(file_name) {
        if let Some(date) = iso_date(&c[3], &c[2], &c[1]) {
            return Some(date);
        }
    }
    if let Some(c) = FILE_DDMMYY.captures(file_name) {
        return iso_date(&format!("20{}", &c[3]), &c[2], &c[1]);
    }
    None
}

// Zero-padded ISO date; None for impossible months or days.
fn iso_date(year: &str, month: &str, day: &str) -> Option<String> {
    let y: u32 = year.parse().ok()?;
    let m: u32 = month.parse().ok()?;
    let d: u32 = day.parse().ok()?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }
    Some(format!("{y:04}-{m:02}-{d:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_cover_day_first() {
        let pages = vec![
            PageContent::from_text(1, "Catalogue des projets\nMise à jour : 3/5/2025"),
            PageContent::from_text(2, "01/01/2020"),
        ];
        assert_eq!(publication_date(&pages, "x.pdf"), Some("2025-05-03".into()));
    }

    #[test]
    fn test_date_from_cover_year_first() {
        let pages = vec![PageContent::from_text(1, "Édition 2024-11-20")];
        assert_eq!(publication_date(&pages, "x.pdf"), Some("2024-11-20".into()));
    }

    #[test]
    fn test_date_from_file_name() {
        let pages = vec![PageContent::from_text(1, "Sans date")];
        assert_eq!(
            publication_date(&pages, "Fiches-de-projet-Agro-Alimentaire-23052025.pdf"),
            Some("2025-05-23".into())
        );
        assert_eq!(
            publication_date(&pages, "fiches_230525.pdf"),
            Some("2025-05-23".into())
        );
    }

    #[test]
    fn test_no_date() {
        let pages = vec![PageContent::from_text(1, "Sans date")];
        assert_eq!(publication_date(&pages, "catalogue.pdf"), None);
        assert_eq!(publication_date(&[], "catalogue.pdf"), None);
    }

    #[test]
    fn test_impossible_date_skipped() {
        let pages = vec![PageContent::from_text(1, "Réf 45/13/2025")];
        assert_eq!(publication_date(&pages, "x.pdf"), None);
    }
}
