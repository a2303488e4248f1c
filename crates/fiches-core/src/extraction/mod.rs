pub mod pdftotext;

use crate::error::FichesError;

/// A positioned glyph: horizontal span, vertical position of its top edge, and its text.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub text: String,
    /// First glyph of a word the backend delimited itself. Text rebuilding
    /// always puts a space before it, however tight the gap.
    pub word_start: bool,
}

impl Glyph {
    pub fn new(x0: f32, x1: f32, top: f32, text: impl Into<String>) -> Self {
        Glyph {
            x0,
            x1,
            top,
            text: text.into(),
            word_start: false,
        }
    }

    pub fn starting_word(mut self) -> Self {
        self.word_start = true;
        self
    }
}

/// Content extracted from a single page of a PDF.
///
/// Whole-page text is always present (possibly empty). Glyph geometry is a
/// capability some backends lack; an empty `glyphs` vector means the page
/// can only be read as flat text.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub page_number: usize,
    pub lines: Vec<String>,
    /// Page width in points, when the backend reports it.
    pub width: Option<f32>,
    pub glyphs: Vec<Glyph>,
}

impl PageContent {
    /// Text-only page (no glyph capability).
    pub fn from_text(page_number: usize, text: &str) -> Self {
        PageContent {
            page_number,
            lines: text.lines().map(|l| l.to_string()).collect(),
            width: None,
            glyphs: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn has_text(&self) -> bool {
        self.lines.iter().any(|l| !l.trim().is_empty())
    }

    pub fn has_glyphs(&self) -> bool {
        !self.glyphs.is_empty()
    }
}

/// Trait for PDF text extraction backends.
pub trait PdfExtractor: Send + Sync {
    /// Extract text content from PDF bytes, returning one PageContent per page.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, FichesError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
