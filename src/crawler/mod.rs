//! Crawler module for listing page planning, fetching and aggregation
//!
//! This module contains the core crawl pipeline, including:
//! - Planning listing page URLs from a crawl target
//! - Probing the page count of auto-detected targets
//! - HTTP fetching and item URL extraction
//! - Batched scheduling with retries
//! - Overall orchestration through the `Engine`

mod coordinator;
mod extractor;
mod fetcher;
mod planner;
mod probe;
mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Engine, EngineSettings, SweepOutcome};
pub use extractor::{resolve_link, ListingExtractor, SelectorExtractor, DEFAULT_ATTRIBUTE};
pub use fetcher::{build_http_client, user_agent_string, HttpFetcher, PageFetcher};
pub use planner::{generate_page_urls, plan, resolve_page_url, PAGE_PLACEHOLDER};
pub use probe::{probe, ProbeOutcome};
pub use scheduler::Scheduler;
