use fiches_core::profiles::builtin;
use fiches_core::profiles::schema::{Column, ProfileDef, TitleStrategy};
use std::path::Path;

use crate::error::CliError;

pub fn list() -> Result<(), CliError> {
    println!("Available built-in profiles:\n");
    for name in builtin::PRESETS {
        let def = builtin::load_preset(name)?;
        let shape = if def.segmenter.is_some() {
            "multi-project"
        } else {
            "one project per PDF"
        };
        println!("  {:<12} {} (v{}) [{}]", name, def.source_type, def.version, shape);
        if let Some(ref desc) = def.description {
            println!("               {}", desc);
        }
        println!();
    }
    Ok(())
}

pub fn show(preset: &str) -> Result<(), CliError> {
    let def = builtin::load_preset(preset)?;
    describe(&def);
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), CliError> {
    let def = fiches_core::profiles::load_profile(file)?;

    println!("Profile '{}' (v{}) is valid.", def.name, def.version);
    println!("  Source: {} / {}", def.source_type, def.region);

    // Potential issues (warnings, not errors)
    let mut warnings = Vec::new();
    if def.location.provinces.is_empty() {
        warnings.push("no provinces listed; province comes from the location label only".to_string());
    }
    if def.zones.prefixes.is_empty() && def.zones.names.is_empty() {
        warnings.push("no zone prefixes or names; industrial_zone will always be empty".to_string());
    }
    if def.sector.default.is_none() && def.sector.filename_hints.is_empty() {
        warnings.push("sector has no default or file-name hints".to_string());
    }
    if def.segmenter.is_none() && def.layout.max_pages > 4 {
        warnings.push(format!(
            "layout.max_pages is {}; single-project sheets rarely exceed two pages",
            def.layout.max_pages
        ));
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }

    Ok(())
}

fn describe(def: &ProfileDef) {
    println!("{} (version {})\n", def.source_type, def.version);

    if let Some(ref desc) = def.description {
        println!("{}\n", desc);
    }

    println!("  Region:        {}", def.region);
    println!("  Language:      {}", def.language);
    println!("  Currency:      {}", def.currency);
    match &def.segmenter {
        Some(seg) => println!(
            "  Documents:     several projects per PDF, {} page(s) each",
            seg.window
        ),
        None => println!(
            "  Documents:     one project per PDF, first {} page(s)",
            def.layout.max_pages
        ),
    }
    println!(
        "  Columns:       split at {:.0}% of page width",
        def.layout.left_ratio * 100.0
    );
    println!();

    let strategies: Vec<&str> = def
        .title
        .strategies
        .iter()
        .map(|s| match s {
            TitleStrategy::NextLine => "line after project marker",
            TitleStrategy::Inline => "text after project marker",
        })
        .collect();
    println!("  Title:         {}, then file name", strategies.join(", then "));
    println!(
        "  Sector:        {} column{}",
        column_name(def.sector.column),
        def.sector
            .default
            .as_ref()
            .map(|d| format!(", default \"{d}\""))
            .unwrap_or_default()
    );
    println!("  Sub-sector:    {} column", column_name(def.sub_sector.column));
    if !def.location.provinces.is_empty() {
        println!("  Provinces:     {}", def.location.provinces.join(", "));
    }
    if !def.zones.names.is_empty() {
        println!("  Zones:         {}", def.zones.names.join(", "));
    }
    println!();

    println!("Investment bands (MAD):");
    println!("  Low      below {}", def.thresholds.low_max);
    println!(
        "  Medium   {} to {}",
        def.thresholds.low_max, def.thresholds.medium_max
    );
    println!("  High     above {}", def.thresholds.medium_max);
    println!(
        "  Minimum investment is {}% of the estimate.",
        (def.thresholds.min_investment_ratio * rust_decimal::Decimal::ONE_HUNDRED).normalize()
    );

    if let Some(ref crawl) = def.crawl {
        println!();
        println!("Listing: {} (up to {} pages)", crawl.start_url, crawl.max_pages);
    }
    println!();
}

fn column_name(column: Column) -> &'static str {
    match column {
        Column::Left => "left",
        Column::Right => "right",
        Column::Full => "whole-page",
    }
}
