use crate::crawler::SelectorExtractor;
use crate::target::{CrawlTarget, PaginationMode, DEFAULT_MAX_CHECK_PAGES, DEFAULT_PAGE_PARAM};
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Main configuration structure for pagesweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
}

impl Config {
    /// Looks up a target by name
    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Batch scheduling and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of listing pages fetched concurrently
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Pause between batches (milliseconds)
    #[serde(rename = "batch-delay-ms")]
    pub batch_delay_ms: u64,

    /// Fetch attempts per page, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry (milliseconds)
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single backoff (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Growth factor between consecutive backoffs
    #[serde(rename = "backoff-multiplier")]
    pub backoff_multiplier: f64,

    /// Let in-flight fetches finish when a run is cancelled
    #[serde(rename = "drain-in-flight")]
    pub drain_in_flight: bool,

    /// Cancel the run after this many seconds
    #[serde(rename = "run-timeout-secs")]
    pub run_timeout_secs: Option<u64>,

    /// Per-request HTTP timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            batch_delay_ms: 2000,
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            drain_in_flight: true,
            run_timeout_secs: None,
            request_timeout_secs: 30,
        }
    }
}

impl SchedulerConfig {
    /// Pause between batches
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Backoff to wait after failed attempt number `attempt` (1-based)
    ///
    /// `initial * multiplier^(attempt - 1)`, capped at `max_backoff_ms`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Run-level timeout, if configured
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    /// Per-request HTTP timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Page-count probing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Default probe bound for targets that don't set their own
    #[serde(rename = "max-check-pages")]
    pub max_check_pages: u32,

    /// Pause between probe fetches (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_check_pages: DEFAULT_MAX_CHECK_PAGES,
            delay_ms: 500,
        }
    }
}

impl ProbeConfig {
    /// Pause between probe fetches
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a cached result (seconds)
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,

    /// SQLite file for a persistent cache; in-memory when unset
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            database_path: None,
        }
    }
}

impl CacheConfig {
    /// Lifetime of a cached result
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// One named crawl target
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Unique target name
    pub name: String,

    /// Pagination mode: "explicit", "templated" or "auto-detect"
    pub mode: PaginationMode,

    /// Listing page URLs for explicit mode
    #[serde(default)]
    pub urls: Vec<String>,

    /// Pagination template for templated and auto-detect modes
    pub template: Option<String>,

    /// Query parameter carrying the page index
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// First page index
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Number of pages for templated mode
    #[serde(rename = "page-count")]
    pub page_count: Option<u32>,

    /// Probe bound override for auto-detect mode
    #[serde(rename = "max-check-pages")]
    pub max_check_pages: Option<u32>,

    /// How item URLs are pulled out of listing pages
    pub extractor: ExtractorConfig,
}

fn default_page_param() -> String {
    DEFAULT_PAGE_PARAM.to_string()
}

fn default_start_page() -> u32 {
    crate::target::DEFAULT_START_PAGE
}

impl TargetConfig {
    /// Builds the crawl target, falling back to the global probe bound
    pub fn to_target(&self, probe: &ProbeConfig) -> CrawlTarget {
        CrawlTarget {
            name: self.name.clone(),
            mode: self.mode,
            urls: self.urls.clone(),
            template: self.template.clone(),
            page_param: self.page_param.clone(),
            start_page: self.start_page,
            page_count: self.page_count,
            max_check_pages: self.max_check_pages.unwrap_or(probe.max_check_pages),
        }
    }
}

/// CSS-selector extraction rules for a target
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// CSS selector matching item links
    pub selector: String,

    /// Attribute holding the link
    #[serde(default = "default_attribute")]
    pub attribute: String,

    /// Keep only links containing this substring
    pub contains: Option<String>,

    /// Base URL for resolving relative links (defaults to the page URL)
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,
}

fn default_attribute() -> String {
    crate::crawler::DEFAULT_ATTRIBUTE.to_string()
}

impl ExtractorConfig {
    /// Builds the extractor described by this configuration
    pub fn build(&self) -> ConfigResult<SelectorExtractor> {
        let mut extractor = SelectorExtractor::new(&self.selector)
            .map_err(|e| ConfigError::InvalidSelector(e.to_string()))?
            .with_attribute(self.attribute.clone());

        if let Some(needle) = &self.contains {
            extractor = extractor.with_contains(needle.clone());
        }

        if let Some(base) = &self.base_url {
            let base = Url::parse(base)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base, e)))?;
            extractor = extractor.with_base_url(base);
        }

        Ok(extractor)
    }
}
