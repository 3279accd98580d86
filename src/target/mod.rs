//! Crawl target definitions
//!
//! A `CrawlTarget` describes which listing pages make up one logical crawl.
//! It is plain data: the planner interprets it, the cache derives its key
//! from it, and nothing mutates it while a run is in progress.

use serde::Deserialize;
use std::fmt;

/// Default query parameter carrying the page index
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Default first page index
pub const DEFAULT_START_PAGE: u32 = 1;

/// Default upper bound on probe fetches for auto-detected pagination
pub const DEFAULT_MAX_CHECK_PAGES: u32 = 50;

/// How the listing pages of a target are determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    /// A fixed, configured list of listing page URLs
    Explicit,

    /// A template expanded for a configured number of pages
    Templated,

    /// A template expanded for a page count discovered by probing
    AutoDetect,
}

impl PaginationMode {
    /// Stable name used in cache keys and log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Templated => "templated",
            Self::AutoDetect => "auto-detect",
        }
    }

    /// Returns true if this mode expands a pagination template
    pub fn uses_template(&self) -> bool {
        matches!(self, Self::Templated | Self::AutoDetect)
    }
}

impl fmt::Display for PaginationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies what is being crawled
///
/// Only the fields relevant to `mode` are consulted: `urls` for explicit
/// targets, `template`/`page_param`/`start_page`/`page_count` for templated
/// targets, and additionally `max_check_pages` for auto-detected targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// Human-readable name, used in logs only
    pub name: String,

    /// Pagination mode
    pub mode: PaginationMode,

    /// Explicit listing page URLs
    pub urls: Vec<String>,

    /// Pagination template (may contain a `{}` placeholder)
    pub template: Option<String>,

    /// Query parameter carrying the page index
    pub page_param: String,

    /// First page index
    pub start_page: u32,

    /// Number of pages to generate in templated mode
    pub page_count: Option<u32>,

    /// Maximum number of probe fetches in auto-detect mode
    pub max_check_pages: u32,
}

impl CrawlTarget {
    fn base(name: impl Into<String>, mode: PaginationMode) -> Self {
        Self {
            name: name.into(),
            mode,
            urls: Vec::new(),
            template: None,
            page_param: DEFAULT_PAGE_PARAM.to_string(),
            start_page: DEFAULT_START_PAGE,
            page_count: None,
            max_check_pages: DEFAULT_MAX_CHECK_PAGES,
        }
    }

    /// Creates a target that visits the given listing pages verbatim
    pub fn explicit(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            urls,
            ..Self::base(name, PaginationMode::Explicit)
        }
    }

    /// Creates a target that expands `template` for `page_count` pages
    pub fn templated(
        name: impl Into<String>,
        template: impl Into<String>,
        start_page: u32,
        page_count: u32,
    ) -> Self {
        Self {
            template: Some(template.into()),
            start_page,
            page_count: Some(page_count),
            ..Self::base(name, PaginationMode::Templated)
        }
    }

    /// Creates a target whose page count is discovered by probing
    pub fn auto_detect(
        name: impl Into<String>,
        template: impl Into<String>,
        start_page: u32,
        max_check_pages: u32,
    ) -> Self {
        Self {
            template: Some(template.into()),
            start_page,
            max_check_pages,
            ..Self::base(name, PaginationMode::AutoDetect)
        }
    }

    /// Overrides the page query parameter name
    pub fn with_page_param(mut self, page_param: impl Into<String>) -> Self {
        self.page_param = page_param.into();
        self
    }
}
