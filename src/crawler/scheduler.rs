//! Batched fetch scheduling
//!
//! This module handles:
//! - Splitting listing pages into fixed-size batches
//! - Fetching each batch concurrently, pausing between batches
//! - Retrying transport failures with exponential backoff
//! - Isolating per-page failures from the rest of the run
//! - Run-level cancellation
//!
//! Results come back in the same order as the input URLs, one per URL.

use crate::config::SchedulerConfig;
use crate::crawler::{ListingExtractor, PageFetcher};
use crate::state::{PageFailure, PageResult};
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs listing page fetches in batches
pub struct Scheduler {
    config: SchedulerConfig,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ListingExtractor>,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `config` - Batch size, pacing, retry and cancellation settings
    /// * `fetcher` - Fetches listing pages
    /// * `extractor` - Pulls item URLs out of fetched pages
    pub fn new(
        config: SchedulerConfig,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ListingExtractor>,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
        }
    }

    /// Processes every URL and returns one result per URL, in input order
    ///
    /// A batch starts only after the previous batch has fully finished.
    /// Once `token` is cancelled no further batch is dispatched and every
    /// page not yet processed is reported as cancelled.
    pub async fn run(&self, urls: &[String], token: &CancellationToken) -> Vec<PageResult> {
        let batch_size = self.config.batch_size.max(1);
        let batch_count = urls.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(urls.len());

        for (index, batch) in urls.chunks(batch_size).enumerate() {
            if index > 0 {
                let delay = self.config.batch_delay();
                if !delay.is_zero() {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }

            if token.is_cancelled() {
                tracing::warn!(
                    "Run cancelled, {} of {} pages not dispatched",
                    urls.len() - results.len(),
                    urls.len()
                );
                break;
            }

            tracing::info!(
                "Batch {}/{}: fetching {} pages",
                index + 1,
                batch_count,
                batch.len()
            );

            let batch_results = join_all(batch.iter().map(|url| self.process_page(url, token))).await;

            let failed = batch_results.iter().filter(|r| r.is_failed()).count();
            if failed > 0 {
                tracing::warn!("Batch {}/{}: {} pages failed", index + 1, batch_count, failed);
            }

            results.extend(batch_results);
        }

        for url in &urls[results.len()..] {
            results.push(PageResult::cancelled(url.as_str(), 0));
        }

        results
    }

    /// Fetches and extracts one page, retrying transport failures
    async fn process_page(&self, url: &str, token: &CancellationToken) -> PageResult {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let fetched = if self.config.drain_in_flight {
                self.fetcher.fetch(url).await
            } else {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Abandoned {} on cancellation", url);
                        return PageResult::cancelled(url, attempt);
                    }
                    fetched = self.fetcher.fetch(url) => fetched,
                }
            };

            let error = match fetched {
                Ok(body) => {
                    return match self.extractor.extract(&body, url) {
                        Ok(items) => {
                            tracing::debug!("Fetched {}: {} item URLs", url, items.len());
                            PageResult::success(url, items, attempt)
                        }
                        Err(e) => {
                            tracing::warn!("Extraction failed for {}: {}", url, e);
                            PageResult::failed(url, PageFailure::Extraction(e), attempt)
                        }
                    };
                }
                Err(e) => e,
            };

            if token.is_cancelled() {
                tracing::debug!("Attempt {} for {} failed after cancellation: {}", attempt, url, error);
                return PageResult::cancelled(url, attempt);
            }

            if attempt >= max_attempts {
                tracing::warn!("Giving up on {} after {} attempts: {}", url, attempt, error);
                return PageResult::failed(url, PageFailure::Transport(error), attempt);
            }

            let backoff = self.config.backoff_for(attempt);
            tracing::debug!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempt,
                max_attempts,
                url,
                error,
                backoff
            );

            tokio::select! {
                _ = token.cancelled() => return PageResult::cancelled(url, attempt),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }
}
