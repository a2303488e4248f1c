use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Extraction settings for one document family (one logical source).
///
/// Label vocabularies are regex fragments, matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    /// Tag written to every record; rows carrying it are replaced on refresh.
    pub source_type: String,
    pub region: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub layout: LayoutDef,
    /// Present for documents holding several projects.
    #[serde(default)]
    pub segmenter: Option<SegmenterDef>,
    pub title: TitleDef,
    pub sector: LabeledFieldDef,
    pub sub_sector: LabeledFieldDef,
    pub project_description: DescriptionDef,
    pub location: LocationDef,
    #[serde(default)]
    pub zones: ZoneDef,
    #[serde(default)]
    pub thresholds: ThresholdsDef,
    #[serde(default)]
    pub detect_publication_date: bool,
    #[serde(default)]
    pub crawl: Option<CrawlDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDef {
    /// Pages read per document when a document holds a single project.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Fraction of the page width where the left column ends.
    #[serde(default = "default_left_ratio")]
    pub left_ratio: f32,
    /// Vertical delta (points) above which a new line starts.
    #[serde(default = "default_line_tolerance")]
    pub line_tolerance: f32,
    /// Horizontal gap (points) above which a space is inserted.
    #[serde(default = "default_space_gap")]
    pub space_gap: f32,
}

impl Default for LayoutDef {
    fn default() -> Self {
        LayoutDef {
            max_pages: default_max_pages(),
            left_ratio: default_left_ratio(),
            line_tolerance: default_line_tolerance(),
            space_gap: default_space_gap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterDef {
    pub marker: String,
    pub fallback_marker: String,
    /// Literal headings, matched case-sensitively, one of which must share a
    /// page with the fallback marker.
    #[serde(default)]
    pub fallback_headings: Vec<String>,
    #[serde(default = "default_window")]
    pub window: usize,
}

/// A start pattern followed by a capture that runs to the first stop label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundedPatternDef {
    pub start: String,
    #[serde(default)]
    pub stops: Vec<String>,
    /// Stops only count as whole words.
    #[serde(default)]
    pub word_bounded: bool,
    /// Stops only count at the beginning of a line.
    #[serde(default)]
    pub line_start: bool,
    /// A newline also ends the capture.
    #[serde(default)]
    pub stop_at_newline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleStrategy {
    /// The line following a project marker line.
    NextLine,
    /// Bounded patterns, tried in order.
    Inline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleDef {
    pub strategies: Vec<TitleStrategy>,
    #[serde(default)]
    pub marker: Option<String>,
    /// Literal labels that disqualify a next-line candidate.
    #[serde(default)]
    pub reject: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<BoundedPatternDef>,
    #[serde(default)]
    pub strip: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Left,
    Right,
    #[default]
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameHint {
    pub contains: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledFieldDef {
    pub pattern: BoundedPatternDef,
    /// Column searched before the full text.
    #[serde(default)]
    pub column: Column,
    /// Patterns removed from the captured value.
    #[serde(default)]
    pub strip: Vec<String>,
    #[serde(default)]
    pub filename_hints: Vec<FilenameHint>,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionDef {
    pub heading: String,
    /// Section labels that end the description when they open a line.
    pub stops: Vec<String>,
    /// Openers of a narrative first sentence, used when no heading exists.
    #[serde(default)]
    pub narrative_starters: Vec<String>,
    #[serde(default)]
    pub strip: Vec<String>,
    #[serde(default = "default_min_len")]
    pub min_len: usize,
    /// Re-insert spaces lost around punctuation.
    #[serde(default)]
    pub repair_spacing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDef {
    /// Known provinces, most specific first.
    #[serde(default)]
    pub provinces: Vec<String>,
    pub pattern: BoundedPatternDef,
    #[serde(default = "default_location_max_len")]
    pub max_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDef {
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub stops: Vec<String>,
    /// Zone names recognised verbatim anywhere in the text.
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default = "default_zone_tokens")]
    pub max_tokens: usize,
}

impl Default for ZoneDef {
    fn default() -> Self {
        ZoneDef {
            prefixes: Vec::new(),
            stops: Vec::new(),
            names: Vec::new(),
            max_tokens: default_zone_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsDef {
    /// Amounts below this are `Low`.
    #[serde(default = "default_low_max")]
    pub low_max: Decimal,
    /// Amounts up to and including this are `Medium`.
    #[serde(default = "default_medium_max")]
    pub medium_max: Decimal,
    #[serde(default = "default_min_investment_ratio")]
    pub min_investment_ratio: Decimal,
    #[serde(default = "default_reference_max_len")]
    pub reference_max_len: usize,
}

impl Default for ThresholdsDef {
    fn default() -> Self {
        ThresholdsDef {
            low_max: default_low_max(),
            medium_max: default_medium_max(),
            min_investment_ratio: default_min_investment_ratio(),
            reference_max_len: default_reference_max_len(),
        }
    }
}

/// Listing site that publishes this source's documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlDef {
    pub start_url: String,
    pub host_suffix: String,
    pub path_prefix: String,
    #[serde(default = "default_crawl_pages")]
    pub max_pages: usize,
}

fn default_language() -> String {
    "FR".into()
}

fn default_currency() -> String {
    "MAD".into()
}

fn default_max_pages() -> usize {
    2
}

fn default_left_ratio() -> f32 {
    0.5
}

fn default_line_tolerance() -> f32 {
    3.0
}

fn default_space_gap() -> f32 {
    2.5
}

fn default_window() -> usize {
    2
}

fn default_min_len() -> usize {
    1
}

fn default_location_max_len() -> usize {
    40
}

fn default_zone_tokens() -> usize {
    3
}

fn default_low_max() -> Decimal {
    Decimal::from(5_000_000)
}

fn default_medium_max() -> Decimal {
    Decimal::from(20_000_000)
}

fn default_min_investment_ratio() -> Decimal {
    Decimal::new(8, 1)
}

fn default_reference_max_len() -> usize {
    100
}

fn default_crawl_pages() -> usize {
    200
}
