//! URL aggregation across listing pages
//!
//! Merges per-page URL lists into one deduplicated list that keeps each
//! URL at the position of its first occurrence, and records the statistics
//! callers use to judge how complete a run was.

use crate::state::PageResult;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Summary of one listing page within an aggregated result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStat {
    /// The listing page URL
    pub url: String,

    /// Number of item URLs the page contributed before dedup
    pub url_count: usize,

    /// Failure description, if the page failed
    pub failure: Option<String>,
}

/// Overall health of a run, derived from page statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunHealth {
    /// Every planned page succeeded (including runs with no pages)
    Complete,

    /// Some pages failed; the URL list is incomplete
    Partial { failed_pages: usize, total_pages: usize },

    /// Every planned page failed
    Failed { total_pages: usize },
}

/// Merged outcome of a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedResult {
    /// Unique item URLs, ordered by first occurrence
    pub urls: Vec<String>,

    /// Item URLs across all successful pages before dedup
    pub raw_count: usize,

    /// Length of `urls`
    pub unique_count: usize,

    /// Listing pages attempted
    pub total_pages: usize,

    /// Listing pages that failed (including cancelled ones)
    pub failed_pages: usize,

    /// The page count came from a probe that hit its bound
    pub probe_truncated: bool,

    /// Per-page statistics, in page order
    pub pages: Vec<PageStat>,

    /// When the result was aggregated
    pub created_at: DateTime<Utc>,
}

impl AggregatedResult {
    /// Classifies the run from its page statistics
    pub fn health(&self) -> RunHealth {
        if self.failed_pages == 0 {
            RunHealth::Complete
        } else if self.failed_pages == self.total_pages {
            RunHealth::Failed {
                total_pages: self.total_pages,
            }
        } else {
            RunHealth::Partial {
                failed_pages: self.failed_pages,
                total_pages: self.total_pages,
            }
        }
    }

    /// Number of duplicate URLs removed
    pub fn duplicates_removed(&self) -> usize {
        self.raw_count - self.unique_count
    }

    /// Listing pages that succeeded
    pub fn successful_pages(&self) -> usize {
        self.total_pages - self.failed_pages
    }
}

/// Aggregates page results into a single deduplicated result
///
/// Never fails: a run where every page failed yields an empty URL list.
///
/// # Arguments
///
/// * `results` - Page results in page order
/// * `created_at` - Timestamp recorded on the result
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use pagesweep::output::aggregate;
/// use pagesweep::PageResult;
///
/// let results = vec![
///     PageResult::success("https://x/a", vec!["u1".into(), "u2".into()], 1),
///     PageResult::success("https://x/b", vec!["u2".into(), "u3".into()], 1),
/// ];
/// let merged = aggregate(&results, Utc::now());
/// assert_eq!(merged.urls, vec!["u1", "u2", "u3"]);
/// assert_eq!(merged.raw_count, 4);
/// ```
pub fn aggregate(results: &[PageResult], created_at: DateTime<Utc>) -> AggregatedResult {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut urls = Vec::new();
    let mut raw_count = 0;
    let mut failed_pages = 0;
    let mut pages = Vec::with_capacity(results.len());

    for result in results {
        if let Some(failure) = &result.failure {
            failed_pages += 1;
            pages.push(PageStat {
                url: result.url.clone(),
                url_count: 0,
                failure: Some(failure.to_string()),
            });
            continue;
        }

        raw_count += result.item_urls.len();
        for url in &result.item_urls {
            if seen.insert(url.as_str()) {
                urls.push(url.clone());
            }
        }

        pages.push(PageStat {
            url: result.url.clone(),
            url_count: result.item_urls.len(),
            failure: None,
        });
    }

    let unique_count = urls.len();
    tracing::debug!(
        "Aggregated {} pages: {} raw URLs, {} unique, {} failed pages",
        results.len(),
        raw_count,
        unique_count,
        failed_pages
    );

    AggregatedResult {
        urls,
        raw_count,
        unique_count,
        total_pages: results.len(),
        failed_pages,
        probe_truncated: false,
        pages,
        created_at,
    }
}
