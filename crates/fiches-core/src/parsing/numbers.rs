//! Canonical numeric facts from noisy French fact-sheet text.
//!
//! Every fact is resolved by an ordered chain of recognisers; the first one
//! that yields a parsable number wins. A recogniser whose number does not
//! parse yields nothing and the chain moves on.

use crate::model::NumericFacts;
use regex::{Captures, Regex};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::LazyLock;

type Recogniser = fn(&str) -> Option<Decimal>;

/// Estimated investment, in MAD.
const AMOUNT_CHAIN: &[(&str, Recogniser)] = &[
    ("kdh_range", kdh_range),
    ("kdh_single", kdh_single),
    ("mdh_range", mdh_range),
    ("mdh_labelled", mdh_labelled),
    ("mdh_single", mdh_single),
    ("dh_labelled", dh_labelled),
    ("dh_before_turnover", dh_before_turnover),
    // Also catches turnover or equipment figures; kept as the last resort.
    ("dh_first_standalone", dh_first_standalone),
];

const LAND_AREA_CHAIN: &[(&str, Recogniser)] = &[
    ("m2_range", land_m2_range),
    ("m2_single", land_m2_single),
    ("hectares", land_hectares),
];

const BUILDING_AREA_CHAIN: &[(&str, Recogniser)] = &[("constructions", building_m2)];

const RATE_CHAIN: &[(&str, Recogniser)] = &[("tri", tri_percent)];

const PAYBACK_CHAIN: &[(&str, Recogniser)] = &[("pbp", pbp_years), ("roi_years", roi_years)];

/// Extract every numeric fact from `text`, then derive a missing rate or
/// payback period from the other.
pub fn extract_numbers(text: &str) -> NumericFacts {
    let text = normalize_numeric_text(text);
    let mut facts = NumericFacts {
        estimated_investment_mad: resolve("estimated_investment_mad", AMOUNT_CHAIN, &text),
        required_land_area_m2: resolve("required_land_area_m2", LAND_AREA_CHAIN, &text),
        required_building_area_m2: resolve(
            "required_building_area_m2",
            BUILDING_AREA_CHAIN,
            &text,
        ),
        payback_period_years: resolve("payback_period_years", PAYBACK_CHAIN, &text),
        roi_estimated: resolve("roi_estimated", RATE_CHAIN, &text),
    };
    cross_fill(&mut facts);
    facts
}

fn resolve(field: &str, chain: &[(&str, Recogniser)], text: &str) -> Option<Decimal> {
    chain.iter().find_map(|(name, recognise)| {
        let value = recognise(text)?;
        tracing::debug!(field, recogniser = *name, %value, "numeric fact resolved");
        Some(value)
    })
}

/// Fill a missing rate from the payback period (`100 / years`) or a missing
/// payback period from a rate in `(0, 100]` (`100 / rate`). Never overwrites.
pub fn cross_fill(facts: &mut NumericFacts) {
    match (facts.roi_estimated, facts.payback_period_years) {
        (None, Some(years)) if years > Decimal::ZERO => {
            facts.roi_estimated = Decimal::ONE_HUNDRED.checked_div(years).map(round2);
        }
        (Some(rate), None) if rate > Decimal::ZERO && rate <= Decimal::ONE_HUNDRED => {
            facts.payback_period_years = Decimal::ONE_HUNDRED.checked_div(rate).map(round2);
        }
        _ => {}
    }
}

/// Round half away from zero to two decimals.
pub fn round2(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a number that may contain grouping spaces and a decimal comma.
///
/// Handles formats like:
/// - "250 000" -> 250000
/// - "1,5" -> 1.5
/// - "1.500.000" -> None (ambiguous grouping)
pub fn parse_number(s: &str) -> Option<Decimal> {
    let compact: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if compact.is_empty() {
        return None;
    }
    Decimal::from_str(&compact).ok()
}

static SPACED_UNITS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bK\s*D\s*H\s*S\b", "KDHS"),
        (r"\bK\s*D\s*H\b", "KDH"),
        (r"\bM\s*D\s*H\s*S\b", "MDHS"),
        (r"\bM\s*D\s*H\b", "MDH"),
        (r"\bD\s*H\s*S\b", "DHS"),
        (r"\bD\s*H\b", "DH"),
        (r"\bP\s*B\s*0?\s*P\b", "PBP"),
        (r"\bT\s*R\s*I\b", "TRI"),
        (r"\bC\s*A\b", "CA"),
    ]
    .into_iter()
    .map(|(pattern, token)| (Regex::new(&format!("(?i){pattern}")).unwrap(), token))
    .collect()
});

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Undo extraction noise before recognition.
///
/// Steps:
/// 1. Bullets and no-break spaces become spaces
/// 2. Replacement characters and dash variants become `-`
/// 3. Unit and ratio tokens spelled out with spaces ("M D H", "P B 0 P") are rejoined
/// 4. Whitespace runs collapse to one space
pub fn normalize_numeric_text(text: &str) -> String {
    let mut s: String = text
        .chars()
        .map(|c| match c {
            '\u{a0}' | '\u{f0b7}' | '\u{2022}' => ' ',
            '\u{fffd}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            _ => c,
        })
        .collect();

    for (re, token) in SPACED_UNITS.iter() {
        s = re.replace_all(&s, *token).into_owned();
    }

    WHITESPACE_RUN.replace_all(&s, " ").trim().to_string()
}

static KDH_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:-|à)\s*(\d+(?:[.,]\d+)?)\s*KDHS?\b").unwrap()
});

static KDH_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*KDHS?\b").unwrap());

static MDH_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:-|à)\s*(\d+(?:[.,]\d+)?)\s*(?:Mns?\s*)?MDHS?\b")
        .unwrap()
});

static MDH_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:D['’])?INVESTISSEMENT\s*[:\-]?\s*(\d+(?:[.,]\d+)?)\s*(?:Mns?\s*)?MDHS?\b")
        .unwrap()
});

static MDH_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:Mns?\s*)?MDHS?\b").unwrap());

static DH_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:D['’])?INVESTISSEMENT\b.*?([\d\s.,]+)\s*DHS?\b").unwrap()
});

static DH_BEFORE_TURNOVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)-\s*([\d\s.,]+)\s*DHS?\s*-\s*CA\b").unwrap());

static DH_STANDALONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([\d\s.,]{3,})\s*DHS?\b").unwrap());

const AREA_LABEL: &str =
    r"\b(?:Sup(?:erficie)?(?:\s+souhait[ée]e)?(?:\s+du\s+terrain)?|terrain)\s*[:\-]?\s*";

static LAND_M2_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){AREA_LABEL}(\d[\d\s.,]*?)\s*(?:m\s*[²2]\s*)?(?:-|à)\s*(\d[\d\s.,]*?)\s*m\s*[²2]"
    ))
    .unwrap()
});

static LAND_M2_SINGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){AREA_LABEL}(\d[\d\s.,]*?)\s*m\s*[²2]")).unwrap()
});

static LAND_HECTARES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){AREA_LABEL}(\d+(?:[.,]\d+)?)(?:\s*(?:-|à)\s*(\d+(?:[.,]\d+)?))?\s*Ha\b"
    ))
    .unwrap()
});

static BUILDING_M2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)constructions?\s+de\s+(\d[\d\s]*?)\s*m\s*[²2]").unwrap()
});

static TRI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bTRI\s*(?:moyen)?\s*[:\-]?\s*(\d+(?:[.,]\d+)?)\s*%?(?:\s*(?:-|à)\s*(\d+(?:[.,]\d+)?))?",
    )
    .unwrap()
});

static PBP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bPBP\s*[:\-]?\s*(\d+(?:[.,]\d+)?)(?:\s*(?:-|à)\s*(\d+(?:[.,]\d+)?))?\s*ans\b")
        .unwrap()
});

static ROI_YEARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bROI\b\)?\s*[:\-]?\s*(\d+(?:[.,]\d+)?)(?:\s*(?:-|à)\s*(\d+(?:[.,]\d+)?))?\s*ans\b",
    )
    .unwrap()
});

fn group(caps: &Captures<'_>, i: usize) -> Option<Decimal> {
    parse_number(caps.get(i)?.as_str())
}

/// Midpoint of groups 1 and 2, or group 1 alone when group 2 did not take part.
/// A sum past the `Decimal` range yields nothing.
fn range_or_single(caps: &Captures<'_>) -> Option<Decimal> {
    let low = group(caps, 1)?;
    match caps.get(2) {
        Some(_) => low.checked_add(group(caps, 2)?)?.checked_div(Decimal::TWO),
        None => Some(low),
    }
}

fn scaled(value: Decimal, factor: i64) -> Option<Decimal> {
    value.checked_mul(Decimal::from(factor))
}

fn kdh_range(text: &str) -> Option<Decimal> {
    scaled(range_or_single(&KDH_RANGE.captures(text)?)?, 1_000)
}

fn kdh_single(text: &str) -> Option<Decimal> {
    scaled(group(&KDH_SINGLE.captures(text)?, 1)?, 1_000)
}

fn mdh_range(text: &str) -> Option<Decimal> {
    scaled(range_or_single(&MDH_RANGE.captures(text)?)?, 1_000_000)
}

fn mdh_labelled(text: &str) -> Option<Decimal> {
    scaled(group(&MDH_LABELLED.captures(text)?, 1)?, 1_000_000)
}

fn mdh_single(text: &str) -> Option<Decimal> {
    scaled(group(&MDH_SINGLE.captures(text)?, 1)?, 1_000_000)
}

fn dh_labelled(text: &str) -> Option<Decimal> {
    group(&DH_LABELLED.captures(text)?, 1)
}

fn dh_before_turnover(text: &str) -> Option<Decimal> {
    group(&DH_BEFORE_TURNOVER.captures(text)?, 1)
}

fn dh_first_standalone(text: &str) -> Option<Decimal> {
    group(&DH_STANDALONE.captures(text)?, 1)
}

fn land_m2_range(text: &str) -> Option<Decimal> {
    range_or_single(&LAND_M2_RANGE.captures(text)?)
}

fn land_m2_single(text: &str) -> Option<Decimal> {
    group(&LAND_M2_SINGLE.captures(text)?, 1)
}

fn land_hectares(text: &str) -> Option<Decimal> {
    scaled(range_or_single(&LAND_HECTARES.captures(text)?)?, 10_000)
}

fn building_m2(text: &str) -> Option<Decimal> {
    group(&BUILDING_M2.captures(text)?, 1)
}

fn tri_percent(text: &str) -> Option<Decimal> {
    range_or_single(&TRI.captures(text)?)
}

fn pbp_years(text: &str) -> Option<Decimal> {
    range_or_single(&PBP.captures(text)?)
}

fn roi_years(text: &str) -> Option<Decimal> {
    range_or_single(&ROI_YEARS.captures(text)?)
}
