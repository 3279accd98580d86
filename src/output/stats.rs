//! Run statistics reporting
//!
//! Formats the statistics carried by an `AggregatedResult` for humans.

use crate::output::{AggregatedResult, RunHealth};
use std::fmt::Write as _;

/// Renders run statistics as a multi-line report
pub fn format_statistics(target: &str, result: &AggregatedResult, from_cache: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===", target);
    let _ = writeln!(
        out,
        "  Source: {}",
        if from_cache { "cache" } else { "fresh crawl" }
    );
    let _ = writeln!(
        out,
        "  Aggregated at: {}",
        result.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(
        out,
        "  Listing pages: {} ({} ok, {} failed)",
        result.total_pages,
        result.successful_pages(),
        result.failed_pages
    );
    let _ = writeln!(
        out,
        "  URLs: {} unique / {} raw ({} duplicates removed)",
        result.unique_count,
        result.raw_count,
        result.duplicates_removed()
    );

    if result.probe_truncated {
        let _ = writeln!(
            out,
            "  Warning: page count hit the probe bound; later pages may exist"
        );
    }

    let failed: Vec<_> = result.pages.iter().filter(|p| p.failure.is_some()).collect();
    if !failed.is_empty() {
        let _ = writeln!(out, "  Failed pages:");
        for page in failed {
            let _ = writeln!(
                out,
                "    - {}: {}",
                page.url,
                page.failure.as_deref().unwrap_or("unknown")
            );
        }
    }

    let health = match result.health() {
        RunHealth::Complete => "complete".to_string(),
        RunHealth::Partial {
            failed_pages,
            total_pages,
        } => format!("partial ({} of {} pages failed)", failed_pages, total_pages),
        RunHealth::Failed { total_pages } => format!("failed (all {} pages failed)", total_pages),
    };
    let _ = writeln!(out, "  Health: {}", health);

    out
}

/// Prints run statistics to stdout
pub fn print_statistics(target: &str, result: &AggregatedResult, from_cache: bool) {
    print!("{}", format_statistics(target, result, from_cache));
}
