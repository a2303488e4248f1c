use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical numeric facts found in a project's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericFacts {
    pub estimated_investment_mad: Option<Decimal>,
    pub required_land_area_m2: Option<Decimal>,
    pub required_building_area_m2: Option<Decimal>,
    pub payback_period_years: Option<Decimal>,
    /// Rate of return, in percent.
    pub roi_estimated: Option<Decimal>,
}

/// Raw fields located for one project unit. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub sub_sector: Option<String>,
    pub province: Option<String>,
    pub industrial_zone: Option<String>,
    pub numbers: NumericFacts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestmentRange {
    Low,
    Medium,
    High,
}

impl fmt::Display for InvestmentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvestmentRange::Low => write!(f, "Low"),
            InvestmentRange::Medium => write!(f, "Medium"),
            InvestmentRange::High => write!(f, "High"),
        }
    }
}

/// Where a project was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Absolute path of the source document.
    pub pdf_url: String,
    pub pdf_page_number: usize,
    pub publication_date: Option<String>,
}

/// Column order of the persisted dataset.
pub const COLUMNS: [&str; 26] = [
    "project_id",
    "project_reference",
    "project_title",
    "project_description",
    "sector",
    "sub_sector",
    "project_bank_category",
    "is_project_bank",
    "region",
    "province",
    "industrial_zone",
    "estimated_investment_mad",
    "min_investment_mad",
    "investment_range",
    "payback_period_years",
    "roi_estimated",
    "required_land_area_m2",
    "required_building_area_m2",
    "has_pdf",
    "pdf_url",
    "pdf_page_number",
    "publication_date",
    "last_update",
    "language",
    "currency",
    "source_type",
];

/// One finished output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: u64,
    pub project_reference: String,
    pub project_title: Option<String>,
    pub project_description: Option<String>,
    pub sector: Option<String>,
    pub sub_sector: Option<String>,
    pub project_bank_category: Option<String>,
    pub is_project_bank: bool,
    pub region: String,
    pub province: Option<String>,
    pub industrial_zone: Option<String>,
    pub estimated_investment_mad: Option<Decimal>,
    pub min_investment_mad: Option<Decimal>,
    pub investment_range: Option<InvestmentRange>,
    pub payback_period_years: Option<Decimal>,
    pub roi_estimated: Option<Decimal>,
    pub required_land_area_m2: Option<Decimal>,
    pub required_building_area_m2: Option<Decimal>,
    pub has_pdf: bool,
    pub pdf_url: String,
    pub pdf_page_number: usize,
    pub publication_date: Option<String>,
    pub last_update: Option<String>,
    pub language: String,
    pub currency: String,
    pub source_type: String,
}

impl ProjectRecord {
    /// Render as a dataset row in [`COLUMNS`] order. Missing values are empty strings.
    pub fn to_row(&self) -> Vec<String> {
        fn text(v: &Option<String>) -> String {
            v.clone().unwrap_or_default()
        }
        fn num(v: &Option<Decimal>) -> String {
            v.map(|d| d.normalize().to_string()).unwrap_or_default()
        }
        fn flag(b: bool) -> String {
            if b { "True" } else { "False" }.to_string()
        }

        vec![
            self.project_id.to_string(),
            self.project_reference.clone(),
            text(&self.project_title),
            text(&self.project_description),
            text(&self.sector),
            text(&self.sub_sector),
            text(&self.project_bank_category),
            flag(self.is_project_bank),
            self.region.clone(),
            text(&self.province),
            text(&self.industrial_zone),
            num(&self.estimated_investment_mad),
            num(&self.min_investment_mad),
            self.investment_range
                .map(|r| r.to_string())
                .unwrap_or_default(),
            num(&self.payback_period_years),
            num(&self.roi_estimated),
            num(&self.required_land_area_m2),
            num(&self.required_building_area_m2),
            flag(self.has_pdf),
            self.pdf_url.clone(),
            self.pdf_page_number.to_string(),
            text(&self.publication_date),
            text(&self.last_update),
            self.language.clone(),
            self.currency.clone(),
            self.source_type.clone(),
        ]
    }
}
