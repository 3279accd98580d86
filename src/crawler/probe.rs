//! Page-count discovery for auto-detected pagination
//!
//! The probe walks a pagination template one page at a time, starting at
//! the target's start page, until a page lists no items or the probe bound
//! is reached. Pages are fetched sequentially with a pause in between and
//! are never retried; the probe only needs a page count, so a failed page
//! is logged and skipped rather than stopping the scan.

use crate::crawler::planner::{last_probe_page, require_template, resolve_page_url};
use crate::crawler::{ListingExtractor, PageFetcher};
use crate::target::CrawlTarget;
use crate::ConfigResult;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a probe found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// First page index that was probed
    pub start_page: u32,

    /// Last page index known to list items (0 if the start page was empty)
    pub last_page: u32,

    /// The bound was reached before an empty page was seen
    pub truncated: bool,

    /// The run was cancelled before the probe finished
    pub cancelled: bool,

    /// Number of pages fetched
    pub fetches: u32,

    /// Page indexes whose fetch or extraction failed
    pub failed_pages: Vec<u32>,
}

impl ProbeOutcome {
    /// Number of pages in `[start_page, last_page]`
    pub fn page_count(&self) -> u32 {
        if self.last_page < self.start_page {
            0
        } else {
            self.last_page - self.start_page + 1
        }
    }
}

/// Probes the target's template for the last non-empty listing page
///
/// # Arguments
///
/// * `fetcher` - Fetches each probed page once
/// * `extractor` - Decides whether a page lists any items
/// * `target` - Supplies the template, page parameter, start page and bound
/// * `delay` - Pause between consecutive probe fetches
/// * `token` - Stops the probe early when cancelled
///
/// # Returns
///
/// * `Ok(ProbeOutcome)` - The detected page range
/// * `Err(ConfigError)` - The target has no usable template
pub async fn probe(
    fetcher: &dyn PageFetcher,
    extractor: &dyn ListingExtractor,
    target: &CrawlTarget,
    delay: Duration,
    token: &CancellationToken,
) -> ConfigResult<ProbeOutcome> {
    let template = require_template(target)?;
    let start = target.start_page;
    let bound = target.max_check_pages;
    let last_allowed = last_probe_page(target)?;

    let mut outcome = ProbeOutcome {
        start_page: start,
        last_page: 0,
        truncated: false,
        cancelled: false,
        fetches: 0,
        failed_pages: Vec::new(),
    };

    tracing::info!(
        "Probing '{}' for its page count (start {}, bound {})",
        target.name,
        start,
        bound
    );

    let mut reached_empty = false;
    for offset in 0..bound {
        if token.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        if offset > 0 && !delay.is_zero() {
            tokio::select! {
                _ = token.cancelled() => {
                    outcome.cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let page = start + offset;
        let url = resolve_page_url(template, &target.page_param, page)?;

        let content = tokio::select! {
            _ = token.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            content = fetcher.fetch(&url) => content,
        };
        outcome.fetches += 1;

        let items = match content {
            Ok(body) => extractor.extract(&body, &url).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match items {
            Ok(items) if items.is_empty() => {
                tracing::debug!("Probe page {} is empty", page);
                reached_empty = true;
                break;
            }
            Ok(items) => {
                tracing::debug!("Probe page {} lists {} items", page, items.len());
                outcome.last_page = page;
            }
            Err(e) => {
                tracing::warn!("Probe page {} failed, skipping: {}", page, e);
                outcome.failed_pages.push(page);
            }
        }
    }

    if !reached_empty && !outcome.cancelled && bound > 0 {
        outcome.truncated = true;
        outcome.last_page = last_allowed;
        tracing::warn!(
            "Probe for '{}' reached its bound of {} pages without an empty page; \
             the page count may be underestimated",
            target.name,
            bound
        );
    }

    if outcome.cancelled {
        tracing::warn!("Probe for '{}' cancelled after {} fetches", target.name, outcome.fetches);
    } else {
        tracing::info!(
            "Probe for '{}' found {} pages ({} fetches)",
            target.name,
            outcome.page_count(),
            outcome.fetches
        );
    }

    Ok(outcome)
}
