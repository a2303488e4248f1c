use crate::model::{ExtractedFields, InvestmentRange, ProjectRecord, Provenance};
use crate::parsing::numbers::{cross_fill, round2};
use crate::parsing::normalize::reference_token;
use crate::profiles::schema::{ProfileDef, ThresholdsDef};
use rust_decimal::Decimal;

/// Turns located fields into finished dataset records for one source.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    region: String,
    source_type: String,
    language: String,
    currency: String,
    thresholds: ThresholdsDef,
}

impl RecordAssembler {
    pub fn new(profile: &ProfileDef) -> Self {
        RecordAssembler {
            region: profile.region.clone(),
            source_type: profile.source_type.clone(),
            language: profile.language.clone(),
            currency: profile.currency.clone(),
            thresholds: profile.thresholds.clone(),
        }
    }

    pub fn assemble(
        &self,
        project_id: u64,
        fields: ExtractedFields,
        provenance: Provenance,
    ) -> ProjectRecord {
        let mut numbers = fields.numbers;
        cross_fill(&mut numbers);

        let estimated = numbers.estimated_investment_mad;
        let title = fields.title.filter(|t| !t.trim().is_empty());

        ProjectRecord {
            project_id,
            project_reference: project_reference(
                &self.region,
                title.as_deref().unwrap_or_default(),
                project_id,
                self.thresholds.reference_max_len,
            ),
            project_title: title,
            project_description: fields.description,
            project_bank_category: fields.sector.as_ref().map(|s| s.to_uppercase()),
            sector: fields.sector,
            sub_sector: fields.sub_sector,
            is_project_bank: true,
            region: self.region.clone(),
            province: fields.province,
            industrial_zone: fields.industrial_zone,
            estimated_investment_mad: estimated,
            min_investment_mad: estimated
                .and_then(|e| e.checked_mul(self.thresholds.min_investment_ratio))
                .map(round2),
            investment_range: estimated.map(|e| {
                investment_range(e, self.thresholds.low_max, self.thresholds.medium_max)
            }),
            payback_period_years: numbers.payback_period_years,
            roi_estimated: numbers.roi_estimated,
            required_land_area_m2: numbers.required_land_area_m2,
            required_building_area_m2: numbers.required_building_area_m2,
            has_pdf: true,
            pdf_url: provenance.pdf_url,
            pdf_page_number: provenance.pdf_page_number,
            last_update: provenance.publication_date.clone(),
            publication_date: provenance.publication_date,
            language: self.language.clone(),
            currency: self.currency.clone(),
            source_type: self.source_type.clone(),
        }
    }
}

/// `Low` below `low_max`, `Medium` up to and including `medium_max`, else `High`.
pub fn investment_range(amount: Decimal, low_max: Decimal, medium_max: Decimal) -> InvestmentRange {
    if amount < low_max {
        InvestmentRange::Low
    } else if amount <= medium_max {
        InvestmentRange::Medium
    } else {
        InvestmentRange::High
    }
}

/// `REGION-TITLE-ID`, at most `max_len` characters, in `[A-Z0-9-]`.
///
/// Only the title part is shortened; region and id are always kept whole.
/// Empty tokens fall back to `UNKNOWN` and `PROJET`.
pub fn project_reference(region: &str, title: &str, project_id: u64, max_len: usize) -> String {
    let region = non_empty_or(reference_token(region), "UNKNOWN");
    let title = non_empty_or(reference_token(title), "PROJET");
    let id = project_id.to_string();

    let reference = format!("{region}-{title}-{id}");
    if reference.len() <= max_len {
        return reference;
    }

    // Tokens are ASCII, so byte lengths are character counts.
    let budget = max_len.saturating_sub(region.len() + id.len() + 2);
    let title = title[..budget.min(title.len())].trim_end_matches('-');
    if title.is_empty() {
        format!("{region}-{id}")
    } else {
        format!("{region}-{title}-{id}")
    }
}

fn non_empty_or(token: String, fallback: &str) -> String {
    if token.is_empty() {
        fallback.to_string()
    } else {
        token
    }
}
