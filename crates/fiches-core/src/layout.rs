//! Column-scoped text reconstruction.
//!
//! Rebuilds reading order for the left and right halves of a page from
//! positioned glyphs. Pages without glyph geometry only contribute their
//! whole-page text; callers treat empty columns as a cue to search `full`.

use crate::extraction::{Glyph, PageContent};
use crate::profiles::schema::LayoutDef;

/// Text of one page or page range, as whole-page text and per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutText {
    pub full: String,
    pub left: String,
    pub right: String,
}

impl LayoutText {
    /// True when there is no usable whole-page text.
    pub fn is_empty(&self) -> bool {
        self.full.trim().is_empty()
    }

    /// All three regions joined, for searches where position does not matter.
    pub fn combined(&self) -> String {
        [self.full.as_str(), self.left.as_str(), self.right.as_str()].join("\n")
    }
}

/// Segment a single page.
pub fn segment_page(page: &PageContent, cfg: &LayoutDef) -> LayoutText {
    let full = page.text().trim().to_string();
    if !page.has_glyphs() {
        return LayoutText {
            full,
            ..LayoutText::default()
        };
    }

    let (left, right) = split_columns(&page.glyphs, split_x(page, cfg.left_ratio));
    LayoutText {
        full,
        left: reconstruct_text(&left, cfg.line_tolerance, cfg.space_gap),
        right: reconstruct_text(&right, cfg.line_tolerance, cfg.space_gap),
    }
}

/// Segment `count` pages starting at 1-based `start_page`, concatenating each
/// region in page order. Pages past the end of the document are ignored.
pub fn segment_range(
    pages: &[PageContent],
    start_page: usize,
    count: usize,
    cfg: &LayoutDef,
) -> LayoutText {
    let end = start_page.saturating_add(count);
    let mut selected: Vec<&PageContent> = pages
        .iter()
        .filter(|p| p.page_number >= start_page && p.page_number < end)
        .collect();
    selected.sort_by_key(|p| p.page_number);

    let parts: Vec<LayoutText> = selected.iter().map(|p| segment_page(p, cfg)).collect();
    LayoutText {
        full: join_non_empty(parts.iter().map(|p| p.full.as_str())),
        left: join_non_empty(parts.iter().map(|p| p.left.as_str())),
        right: join_non_empty(parts.iter().map(|p| p.right.as_str())),
    }
}

/// Horizontal split position: a fraction of the page width, or of the
/// right-most glyph edge when the backend did not report a width.
fn split_x(page: &PageContent, left_ratio: f32) -> f32 {
    let width = page
        .width
        .unwrap_or_else(|| page.glyphs.iter().map(|g| g.x1).fold(0.0, f32::max));
    width * left_ratio
}

/// Partition glyphs into left (entirely before `split`) and right.
pub fn split_columns(glyphs: &[Glyph], split: f32) -> (Vec<&Glyph>, Vec<&Glyph>) {
    glyphs.iter().partition(|g| g.x1 <= split)
}

/// Rebuild text from glyphs: sort by (rounded top, x0), break lines on
/// vertical jumps, and insert spaces on horizontal gaps or before a glyph
/// that starts a word.
pub fn reconstruct_text(glyphs: &[&Glyph], line_tolerance: f32, space_gap: f32) -> String {
    let mut ordered: Vec<&Glyph> = glyphs.to_vec();
    ordered.sort_by(|a, b| {
        row_key(a)
            .cmp(&row_key(b))
            .then(a.x0.total_cmp(&b.x0))
    });

    let Some((first, rest)) = ordered.split_first() else {
        return String::new();
    };

    let mut buf = first.text.clone();
    let mut prev = *first;
    for glyph in rest {
        if glyph.top - prev.top > line_tolerance {
            buf.push('\n');
        } else if glyph.word_start || glyph.x0 - prev.x1 > space_gap {
            buf.push(' ');
        }
        buf.push_str(&glyph.text);
        prev = glyph;
    }

    buf.replace(" \n ", "\n").trim().to_string()
}

// Top edge rounded to one decimal, as an orderable integer.
fn row_key(glyph: &Glyph) -> i64 {
    (glyph.top * 10.0).round() as i64
}

fn join_non_empty<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Lay out `text` as 5pt-wide glyphs starting at `x`; a space advances by 5pt
    /// without emitting a glyph.
    pub(crate) fn glyph_run(text: &str, x: f32, top: f32) -> Vec<Glyph> {
        let mut out = Vec::new();
        let mut cursor = x;
        for c in text.chars() {
            if c != ' ' {
                out.push(Glyph::new(cursor, cursor + 5.0, top, c.to_string()));
            }
            cursor += 5.0;
        }
        out
    }

    fn cfg() -> LayoutDef {
        LayoutDef::default()
    }

    fn two_column_page(number: usize, left: &[&str], right: &[&str]) -> PageContent {
        let mut glyphs = Vec::new();
        let mut lines = Vec::new();
        for (i, l) in left.iter().enumerate() {
            glyphs.extend(glyph_run(l, 10.0, 50.0 + 12.0 * i as f32));
        }
        for (i, r) in right.iter().enumerate() {
            glyphs.extend(glyph_run(r, 310.0, 50.0 + 12.0 * i as f32));
        }
        for i in 0..left.len().max(right.len()) {
            lines.push(format!(
                "{}    {}",
                left.get(i).unwrap_or(&""),
                right.get(i).unwrap_or(&"")
            ));
        }
        PageContent {
            page_number: number,
            lines,
            width: Some(600.0),
            glyphs,
        }
    }

    #[test]
    fn test_columns_are_split_and_spaced() {
        let page = two_column_page(
            1,
            &["Secteur économique : AGRICULTURE"],
            &["Filières de production : AGRUMES"],
        );
        let layout = segment_page(&page, &cfg());
        assert_eq!(layout.left, "Secteur économique : AGRICULTURE");
        assert_eq!(layout.right, "Filières de production : AGRUMES");
        assert!(layout.full.contains("AGRICULTURE"));
        assert!(layout.full.contains("AGRUMES"));
    }

    #[test]
    fn test_word_starts_are_spaced_despite_tight_gaps() {
        let glyphs = vec![
            Glyph::new(0.0, 3.0, 10.0, "S").starting_word(),
            Glyph::new(3.0, 6.0, 10.0, "u"),
            Glyph::new(6.0, 9.0, 10.0, "p"),
            Glyph::new(10.0, 12.0, 10.0, ":").starting_word(),
            Glyph::new(13.0, 16.0, 10.0, "5").starting_word(),
            Glyph::new(0.0, 3.0, 20.0, "H").starting_word(),
        ];
        let refs: Vec<&Glyph> = glyphs.iter().collect();
        assert_eq!(reconstruct_text(&refs, 3.0, 2.5), "Sup : 5\nH");
    }

    #[test]
    fn test_line_breaks_follow_vertical_jumps() {
        let page = two_column_page(1, &["DESCRIPTION DU PROJET", "Une unité"], &[]);
        let layout = segment_page(&page, &cfg());
        assert_eq!(layout.left, "DESCRIPTION DU PROJET\nUne unité");
        assert!(layout.right.is_empty());
    }

    #[test]
    fn test_glyph_order_is_recovered() {
        let mut glyphs = glyph_run("AB CD", 10.0, 20.0);
        glyphs.reverse();
        let refs: Vec<&Glyph> = glyphs.iter().collect();
        assert_eq!(reconstruct_text(&refs, 3.0, 2.5), "AB CD");
    }

    #[test]
    fn test_sort_groups_by_rounded_top_before_x() {
        let glyphs = vec![
            Glyph::new(0.0, 5.0, 10.0, "M"),
            Glyph::new(5.0, 10.0, 11.5, "D"),
            Glyph::new(10.0, 15.0, 10.0, "H"),
        ];
        let refs: Vec<&Glyph> = glyphs.iter().collect();
        assert_eq!(reconstruct_text(&refs, 3.0, 2.5), "MHD");
    }

    #[test]
    fn test_page_without_glyphs_keeps_full_text_only() {
        let page = PageContent::from_text(1, "Secteur économique : AGRICULTURE");
        let layout = segment_page(&page, &cfg());
        assert_eq!(layout.full, "Secteur économique : AGRICULTURE");
        assert!(layout.left.is_empty());
        assert!(layout.right.is_empty());
    }

    #[test]
    fn test_split_uses_glyph_extent_without_width() {
        let mut page = two_column_page(1, &["GAUCHE"], &["DROITE"]);
        page.width = None;
        let layout = segment_page(&page, &cfg());
        assert_eq!(layout.left, "GAUCHE");
        assert_eq!(layout.right, "DROITE");
    }

    #[test]
    fn test_range_concatenates_pages_in_order() {
        let pages = vec![
            two_column_page(3, &["TROIS"], &[]),
            two_column_page(1, &["UN"], &[]),
            two_column_page(2, &["DEUX"], &["DROITE"]),
        ];
        let layout = segment_range(&pages, 1, 2, &cfg());
        assert_eq!(layout.left, "UN\nDEUX");
        assert_eq!(layout.right, "DROITE");
        assert!(!layout.full.contains("TROIS"));
    }

    #[test]
    fn test_range_past_end_is_empty() {
        let pages = vec![two_column_page(1, &["UN"], &[])];
        let layout = segment_range(&pages, 5, 2, &cfg());
        assert!(layout.is_empty());
    }
}
