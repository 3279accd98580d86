/// Per-page outcome definitions for a crawl run
///
/// Every listing page handed to the scheduler produces exactly one
/// `PageResult`, whether it succeeded, failed, or was never dispatched.
use crate::{ExtractionError, TransportError};
use std::fmt;

/// Why a listing page did not contribute item URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailure {
    /// Fetch kept failing at the transport level until the retry budget ran out
    Transport(TransportError),

    /// The page was fetched but its content could not be parsed
    Extraction(ExtractionError),

    /// The run was cancelled before this page completed
    Cancelled,
}

impl PageFailure {
    /// Returns true if the failure was caused by run cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short machine-friendly label, used for persistence and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Extraction(_) => "extraction",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {}", e),
            Self::Extraction(e) => write!(f, "extraction: {}", e),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of processing one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// The listing page URL
    pub url: String,

    /// Item URLs found on the page, in page order (empty on failure)
    pub item_urls: Vec<String>,

    /// Set when the page failed
    pub failure: Option<PageFailure>,

    /// Number of fetch attempts made for this page
    pub attempts: u32,
}

impl PageResult {
    /// Creates a successful page result
    pub fn success(url: impl Into<String>, item_urls: Vec<String>, attempts: u32) -> Self {
        Self {
            url: url.into(),
            item_urls,
            failure: None,
            attempts,
        }
    }

    /// Creates a failed page result
    pub fn failed(url: impl Into<String>, failure: PageFailure, attempts: u32) -> Self {
        Self {
            url: url.into(),
            item_urls: Vec::new(),
            failure: Some(failure),
            attempts,
        }
    }

    /// Creates a result for a page that was cancelled before it finished
    pub fn cancelled(url: impl Into<String>, attempts: u32) -> Self {
        Self::failed(url, PageFailure::Cancelled, attempts)
    }

    /// Returns true if the page produced a usable (possibly empty) URL list
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Returns true if the page failed for any reason
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}
