use fiches_core::model::ProjectRecord;
use rust_decimal::Decimal;

pub fn print(records: &[ProjectRecord]) {
    if records.is_empty() {
        println!("No projects found.");
        return;
    }

    for (i, r) in records.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!(
            "=== #{} {} (page {}) ===\n",
            r.project_id,
            r.project_title.as_deref().unwrap_or("(untitled)"),
            r.pdf_page_number
        );

        let rows: [(&str, String); 12] = [
            ("Reference", r.project_reference.clone()),
            ("Sector", text(&r.sector)),
            ("Sub-sector", text(&r.sub_sector)),
            ("Province", text(&r.province)),
            ("Zone", text(&r.industrial_zone)),
            ("Investment", amount(r.estimated_investment_mad, &r.currency)),
            ("Minimum", amount(r.min_investment_mad, &r.currency)),
            (
                "Range",
                r.investment_range.map(|x| x.to_string()).unwrap_or_else(dash),
            ),
            ("ROI", suffixed(r.roi_estimated, "%")),
            ("Payback", suffixed(r.payback_period_years, " years")),
            ("Land", suffixed(r.required_land_area_m2, " m²")),
            ("Building", suffixed(r.required_building_area_m2, " m²")),
        ];
        for (label, value) in &rows {
            println!("  {:<12} {}", label, value);
        }

        if let Some(ref desc) = r.project_description {
            println!();
            println!("  {}", desc);
        }
    }
}

fn dash() -> String {
    "-".into()
}

fn text(v: &Option<String>) -> String {
    v.clone().unwrap_or_else(dash)
}

fn amount(v: Option<Decimal>, currency: &str) -> String {
    v.map(|d| format!("{} {}", group_thousands(d), currency))
        .unwrap_or_else(dash)
}

fn suffixed(v: Option<Decimal>, suffix: &str) -> String {
    v.map(|d| format!("{}{}", d.normalize(), suffix))
        .unwrap_or_else(dash)
}

// 25000000 -> "25 000 000"; fractional digits are kept as-is.
fn group_thousands(d: Decimal) -> String {
    let s = d.normalize().to_string();
    let (int, frac) = match s.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (s, None),
    };
    let (sign, digits) = match int.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", int),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    match frac {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
