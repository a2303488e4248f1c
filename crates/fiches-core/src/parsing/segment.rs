use crate::error::FichesError;
use crate::extraction::PageContent;
use crate::parsing::label::compile;
use crate::profiles::schema::SegmenterDef;
use regex::Regex;

/// Finds the pages where a new project begins in a multi-project document.
#[derive(Debug)]
pub struct ProjectSegmenter {
    marker: Regex,
    fallback_marker: Regex,
    fallback_headings: Vec<String>,
    window: usize,
}

impl ProjectSegmenter {
    pub fn new(def: &SegmenterDef) -> Result<Self, FichesError> {
        Ok(ProjectSegmenter {
            marker: compile("segmenter.marker", &def.marker)?,
            fallback_marker: compile("segmenter.fallback_marker", &def.fallback_marker)?,
            fallback_headings: def.fallback_headings.clone(),
            window: def.window.max(1),
        })
    }

    /// Pages read per project, counting the start page.
    pub fn window(&self) -> usize {
        self.window
    }

    /// 1-based start pages, ascending and distinct. Page 1 is a cover and
    /// never starts a project.
    ///
    /// Pages carrying the primary marker win; only when none do, pages
    /// carrying the fallback marker together with one of the fallback
    /// headings are used.
    pub fn find_start_pages(&self, pages: &[PageContent]) -> Vec<usize> {
        let texts: Vec<(usize, String)> = pages
            .iter()
            .filter(|p| p.page_number > 1)
            .map(|p| (p.page_number, p.text()))
            .collect();

        let mut starts: Vec<usize> = texts
            .iter()
            .filter(|(_, text)| self.marker.is_match(text))
            .map(|(n, _)| *n)
            .collect();

        if starts.is_empty() {
            starts = texts
                .iter()
                .filter(|(_, text)| {
                    self.fallback_marker.is_match(text)
                        && self
                            .fallback_headings
                            .iter()
                            .any(|h| text.contains(h.as_str()))
                })
                .map(|(n, _)| *n)
                .collect();
        }

        starts.sort_unstable();
        starts.dedup();
        starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> ProjectSegmenter {
        ProjectSegmenter::new(&SegmenterDef {
            marker: r"PROJET\s+N[°\s]*[A-Za-z]*[\-\s]*\d+".into(),
            fallback_marker: r"PROJET\s*[:\-]".into(),
            fallback_headings: vec!["FILIÈRE".into(), "FILIERE".into(), "DESCRIPTION".into()],
            window: 2,
        })
        .unwrap()
    }

    fn pages(texts: &[&str]) -> Vec<PageContent> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| PageContent::from_text(i + 1, t))
            .collect()
    }

    #[test]
    fn test_primary_marker_pages() {
        let doc = pages(&[
            "PROJET N° 1 : sommaire",
            "PROJET N° 1 : UNITÉ DE SÉCHAGE",
            "INDICATEURS",
            "PROJET N°AG-2 : HUILERIE",
            "INDICATEURS",
        ]);
        assert_eq!(segmenter().find_start_pages(&doc), vec![2, 4]);
    }

    #[test]
    fn test_cover_page_never_starts_a_project() {
        let doc = pages(&["PROJET N° 1 : GÎTE"]);
        assert!(segmenter().find_start_pages(&doc).is_empty());
    }

    #[test]
    fn test_fallback_requires_heading() {
        let doc = pages(&[
            "Couverture",
            "PROJET : GÎTE RURAL\nFILIÈRE : TOURISME",
            "PROJET : sans rubrique",
            "PROJET - AUBERGE\nDESCRIPTION",
        ]);
        assert_eq!(segmenter().find_start_pages(&doc), vec![2, 4]);
    }

    #[test]
    fn test_fallback_headings_are_case_sensitive() {
        let doc = pages(&["Couverture", "Projet : gîte\nfilière : tourisme"]);
        assert!(segmenter().find_start_pages(&doc).is_empty());
    }

    #[test]
    fn test_primary_marker_suppresses_fallback() {
        let doc = pages(&[
            "Couverture",
            "PROJET : GÎTE\nFILIÈRE : TOURISME",
            "PROJET N° 7 : AUBERGE",
        ]);
        assert_eq!(segmenter().find_start_pages(&doc), vec![3]);
    }

    #[test]
    fn test_no_markers() {
        let doc = pages(&["Couverture", "Sommaire", "Annexe"]);
        assert!(segmenter().find_start_pages(&doc).is_empty());
    }
}
