//! Output module for aggregated crawl results
//!
//! This module handles:
//! - Merging per-page results into one deduplicated URL list
//! - Reporting run statistics
//! - Exporting the URL list for downstream processing

mod aggregator;
mod stats;

pub use aggregator::{aggregate, AggregatedResult, PageStat, RunHealth};
pub use stats::{format_statistics, print_statistics};

use std::io::Write;
use std::path::Path;

/// Writes the unique URLs, one per line, to `writer`
pub fn write_url_list<W: Write>(result: &AggregatedResult, writer: &mut W) -> std::io::Result<()> {
    for url in &result.urls {
        writeln!(writer, "{}", url)?;
    }
    writer.flush()
}

/// Writes the unique URLs of each result, one per line, to a file
///
/// Results are written in the order given. Creates parent directories as
/// needed and overwrites any existing file.
pub fn export_url_list(results: &[AggregatedResult], path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for result in results {
        write_url_list(result, &mut file)?;
    }
    Ok(())
}
