use crate::error::FichesError;
use crate::extraction::{Glyph, PageContent, PdfExtractor};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::Write;
use std::process::Command;

/// PDF extraction backend using pdftotext (from poppler-utils).
///
/// Page text comes from `pdftotext -layout`, which keeps side-by-side
/// columns on the same output line. Glyph geometry comes from
/// `pdftotext -bbox`; each word box is subdivided into per-character glyphs
/// so the layout segmenter sees real inter-word gaps.
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, FichesError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| FichesError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| FichesError::Extraction(e.to_string()))?;
        let tmp_path = tmpfile.path().to_path_buf();

        let text = run_pdftotext(&["-layout"], &tmp_path)?;

        let glyph_pages = match run_pdftotext(&["-bbox"], &tmp_path)
            .and_then(|xml| parse_bbox_xhtml(&xml))
        {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!("glyph extraction unavailable, using page text only: {e}");
                Vec::new()
            }
        };

        // pdftotext terminates every page with a form feed, leaving an empty tail.
        let mut chunks: Vec<&str> = text.split('\x0c').collect();
        if chunks.len() > 1 && chunks.last().is_some_and(|c| c.trim().is_empty()) {
            chunks.pop();
        }

        let pages = chunks
            .iter()
            .enumerate()
            .map(|(i, page_text)| {
                let mut page = PageContent::from_text(i + 1, page_text);
                if let Some(gp) = glyph_pages.get(i) {
                    page.width = gp.width;
                    page.glyphs = gp.glyphs.clone();
                }
                page
            })
            .collect();

        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

fn run_pdftotext(args: &[&str], pdf_path: &std::path::Path) -> Result<String, FichesError> {
    let output = Command::new("pdftotext")
        .args(args)
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FichesError::PdftotextNotFound
            } else {
                FichesError::Extraction(format!("pdftotext {} failed: {}", args.join(" "), e))
            }
        })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(FichesError::PdftotextFailed { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[derive(Debug, Clone, Default)]
struct GlyphPage {
    width: Option<f32>,
    glyphs: Vec<Glyph>,
}

#[derive(Debug, Clone)]
struct WordBox {
    x_min: f32,
    x_max: f32,
    y_min: f32,
}

/// Parse `pdftotext -bbox` XHTML into per-page glyph lists.
fn parse_bbox_xhtml(xml: &str) -> Result<Vec<GlyphPage>, FichesError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages: Vec<GlyphPage> = Vec::new();
    let mut current_word: Option<WordBox> = None;
    let mut word_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) => match tag.name().as_ref() {
                b"page" => pages.push(GlyphPage {
                    width: attr_f32(&tag, "width"),
                    glyphs: Vec::new(),
                }),
                b"word" => {
                    current_word = parse_word_box(&tag);
                    word_text.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(tag)) if tag.name().as_ref() == b"page" => pages.push(GlyphPage {
                width: attr_f32(&tag, "width"),
                glyphs: Vec::new(),
            }),
            Ok(Event::Text(t)) if current_word.is_some() => match t.unescape() {
                Ok(s) => word_text.push_str(&s),
                Err(_) => word_text.push_str(&String::from_utf8_lossy(&t)),
            },
            Ok(Event::End(tag)) if tag.name().as_ref() == b"word" => {
                if let (Some(word), Some(page)) = (current_word.take(), pages.last_mut()) {
                    page.glyphs.extend(subdivide_word(&word, word_text.trim()));
                }
                word_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FichesError::Extraction(format!(
                    "malformed bbox output at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(pages)
}

fn parse_word_box(tag: &BytesStart<'_>) -> Option<WordBox> {
    Some(WordBox {
        x_min: attr_f32(tag, "xMin")?,
        x_max: attr_f32(tag, "xMax")?,
        y_min: attr_f32(tag, "yMin")?,
    })
}

fn attr_f32(tag: &BytesStart<'_>, name: &str) -> Option<f32> {
    let attr = tag.try_get_attribute(name).ok()??;
    attr.unescape_value().ok()?.trim().parse().ok()
}

/// Spread a word's box evenly over its characters. The first glyph carries
/// the word boundary.
fn subdivide_word(word: &WordBox, text: &str) -> Vec<Glyph> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = (word.x_max - word.x_min) / chars.len() as f32;
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let x0 = word.x_min + step * i as f32;
            let glyph = Glyph::new(x0, x0 + step, word.y_min, c.to_string());
            if i == 0 {
                glyph.starting_word()
            } else {
                glyph
            }
        })
        .collect()
}
