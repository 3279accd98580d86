//! Crawl engine - end-to-end orchestration for one target
//!
//! The engine ties the pipeline together:
//! - Deriving the cache key and serving fresh cached results
//! - Probing the page count of auto-detected targets
//! - Planning listing page URLs
//! - Scheduling fetches and extraction
//! - Aggregating page results and storing them in the cache

use crate::cache::{CacheKey, CacheStore, CrawlCache, MemoryCacheStore, SqliteCacheStore, SystemClock};
use crate::config::{Config, ProbeConfig, SchedulerConfig};
use crate::crawler::planner::{last_probe_page, plan, require_template};
use crate::crawler::probe::probe;
use crate::crawler::{HttpFetcher, ListingExtractor, PageFetcher, Scheduler};
use crate::output::{aggregate, AggregatedResult, RunHealth};
use crate::target::{CrawlTarget, PaginationMode};
use crate::ConfigError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runtime settings of the engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Batching, retry and cancellation behavior
    pub scheduler: SchedulerConfig,

    /// Probe pacing
    pub probe: ProbeConfig,

    /// Lifetime of cached results
    pub cache_ttl: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            probe: ProbeConfig::default(),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            scheduler: config.scheduler.clone(),
            probe: config.probe.clone(),
            cache_ttl: config.cache.ttl(),
        }
    }
}

/// Outcome of one engine call
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// The aggregated result
    pub result: AggregatedResult,

    /// The result was served from the cache
    pub from_cache: bool,

    /// The run was cancelled before it completed
    pub cancelled: bool,
}

/// Paginated crawl engine
///
/// One engine can serve many targets, concurrently if needed; the cache is
/// its only shared mutable state.
pub struct Engine {
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<CrawlCache>,
    settings: EngineSettings,
}

impl Engine {
    /// Creates an engine from its collaborators
    pub fn new(fetcher: Arc<dyn PageFetcher>, cache: Arc<CrawlCache>, settings: EngineSettings) -> Self {
        Self {
            fetcher,
            cache,
            settings,
        }
    }

    /// Creates an engine with an HTTP fetcher and the configured cache store
    ///
    /// The cache is persisted to SQLite when `cache.database-path` is set and
    /// kept in memory otherwise.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let fetcher = HttpFetcher::from_config(&config.user_agent, config.scheduler.request_timeout())?;

        let store: Box<dyn CacheStore> = match &config.cache.database_path {
            Some(path) => {
                tracing::info!("Using persistent cache at {}", path);
                Box::new(SqliteCacheStore::new(Path::new(path))?)
            }
            None => Box::new(MemoryCacheStore::new()),
        };
        let cache = Arc::new(CrawlCache::new(store, Arc::new(SystemClock)));

        Ok(Self::new(Arc::new(fetcher), cache, EngineSettings::from(config)))
    }

    /// The result cache
    pub fn cache(&self) -> &CrawlCache {
        &self.cache
    }

    /// The engine settings
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the unique item URLs of a target
    ///
    /// Serves a fresh cached result when one exists; otherwise runs the
    /// crawl and caches its result.
    ///
    /// # Returns
    ///
    /// * `Ok(AggregatedResult)` - Complete or partial result; see `health()`
    /// * `Err(SweepError)` - The target configuration was rejected
    pub async fn get_urls(
        &self,
        target: &CrawlTarget,
        extractor: Arc<dyn ListingExtractor>,
    ) -> crate::Result<AggregatedResult> {
        self.get_urls_with_cancel(target, extractor, &CancellationToken::new())
            .await
    }

    /// Same as [`Engine::get_urls`], stopping early when `token` is cancelled
    pub async fn get_urls_with_cancel(
        &self,
        target: &CrawlTarget,
        extractor: Arc<dyn ListingExtractor>,
        token: &CancellationToken,
    ) -> crate::Result<AggregatedResult> {
        Ok(self.sweep(target, extractor, false, token).await?.result)
    }

    /// Recomputes a target's URLs without reading the cache
    ///
    /// The fresh result replaces any cached one.
    pub async fn refresh(
        &self,
        target: &CrawlTarget,
        extractor: Arc<dyn ListingExtractor>,
    ) -> crate::Result<AggregatedResult> {
        Ok(self
            .sweep(target, extractor, true, &CancellationToken::new())
            .await?
            .result)
    }

    /// Runs the full pipeline for a target
    ///
    /// # Arguments
    ///
    /// * `target` - The crawl target
    /// * `extractor` - Pulls item URLs out of the target's listing pages
    /// * `fresh` - Skip the cache read
    /// * `token` - Cancels the run
    pub async fn sweep(
        &self,
        target: &CrawlTarget,
        extractor: Arc<dyn ListingExtractor>,
        fresh: bool,
        token: &CancellationToken,
    ) -> crate::Result<SweepOutcome> {
        // Configuration problems surface before the cache or the network
        let planned = check_target(target)?;

        // Results depend on the extraction rules as well as the pagination
        let key = match extractor.identity() {
            Some(identity) => Some(CacheKey::for_target(target, &identity)),
            None => {
                tracing::debug!("Extractor for '{}' has no identity; cache bypassed", target.name);
                None
            }
        };

        if let Some(key) = key.as_ref().filter(|_| !fresh) {
            match self.cache.get(key) {
                Ok(Some(result)) => {
                    tracing::info!(
                        "Cache hit for '{}' ({}): {} URLs",
                        target.name,
                        key.short(),
                        result.unique_count
                    );
                    return Ok(SweepOutcome {
                        result,
                        from_cache: true,
                        cancelled: false,
                    });
                }
                Ok(None) => tracing::debug!("Cache miss for '{}' ({})", target.name, key.short()),
                Err(e) => tracing::warn!("Cache read failed for '{}', recomputing: {}", target.name, e),
            }
        }

        let run_token = token.child_token();
        let timer = self.settings.scheduler.run_timeout().map(|timeout| {
            let run_token = run_token.clone();
            let name = target.name.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!("Run for '{}' exceeded its timeout of {:?}, cancelling", name, timeout);
                run_token.cancel();
            })
        });

        let outcome = self.crawl(target, extractor, planned, &run_token).await;

        if let Some(timer) = timer {
            timer.abort();
        }
        let (result, cancelled) = outcome?;

        if cancelled {
            tracing::warn!("Run for '{}' was cancelled; result not cached", target.name);
        } else if let Some(key) = &key {
            if let Err(e) = self.cache.put(key, &result, self.settings.cache_ttl) {
                tracing::warn!("Failed to cache result for '{}': {}", target.name, e);
            }
        }

        Ok(SweepOutcome {
            result,
            from_cache: false,
            cancelled,
        })
    }

    /// Probe, plan, schedule and aggregate
    async fn crawl(
        &self,
        target: &CrawlTarget,
        extractor: Arc<dyn ListingExtractor>,
        planned: Option<Vec<String>>,
        token: &CancellationToken,
    ) -> crate::Result<(AggregatedResult, bool)> {
        let mut cancelled = false;
        let mut truncated = false;

        let urls = match planned {
            Some(urls) => urls,
            None => {
                let outcome = probe(
                    self.fetcher.as_ref(),
                    extractor.as_ref(),
                    target,
                    self.settings.probe.delay(),
                    token,
                )
                .await?;
                cancelled |= outcome.cancelled;
                truncated = outcome.truncated;
                plan(target, Some(outcome.page_count()))?
            }
        };

        tracing::info!(
            "Crawling '{}' ({} pagination): {} listing pages",
            target.name,
            target.mode,
            urls.len()
        );

        let scheduler = Scheduler::new(
            self.settings.scheduler.clone(),
            Arc::clone(&self.fetcher),
            extractor,
        );
        let results = scheduler.run(&urls, token).await;
        cancelled |= results
            .iter()
            .any(|r| r.failure.as_ref().is_some_and(|f| f.is_cancelled()));

        let mut result = aggregate(&results, self.cache.clock().now());
        result.probe_truncated = truncated;

        match result.health() {
            RunHealth::Complete => tracing::info!(
                "'{}' complete: {} unique URLs from {} pages",
                target.name,
                result.unique_count,
                result.total_pages
            ),
            RunHealth::Partial {
                failed_pages,
                total_pages,
            } => tracing::warn!(
                "'{}' partial: {} of {} pages failed, {} unique URLs",
                target.name,
                failed_pages,
                total_pages,
                result.unique_count
            ),
            RunHealth::Failed { total_pages } => {
                tracing::error!("'{}' failed: all {} pages failed", target.name, total_pages)
            }
        }

        Ok((result, cancelled))
    }
}

/// Validates a target for its mode, returning the plan when it needs no probe
fn check_target(target: &CrawlTarget) -> Result<Option<Vec<String>>, ConfigError> {
    match target.mode {
        PaginationMode::AutoDetect => {
            require_template(target)?;
            if target.max_check_pages == 0 {
                return Err(ConfigError::Validation(format!(
                    "Target '{}' must have max-check-pages of at least 1",
                    target.name
                )));
            }
            last_probe_page(target)?;
            Ok(None)
        }
        PaginationMode::Explicit | PaginationMode::Templated => plan(target, None).map(Some),
    }
}
