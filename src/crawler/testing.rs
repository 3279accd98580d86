//! In-process fetcher and extractor for unit tests

use crate::crawler::{ListingExtractor, PageFetcher};
use crate::{ExtractionError, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Body that makes `word_extractor` fail
pub const MALFORMED: &str = "<<malformed>>";

#[derive(Default)]
struct Script {
    body: Option<String>,
    failures_left: u32,
    always_fail: bool,
}

/// Fetcher answering from a script keyed by URL
///
/// Unknown URLs answer with HTTP 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `url` answers with `body`
    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.script(url).body = Some(body.to_string());
        self
    }

    /// The first `times` fetches of `url` time out
    pub fn fail_times(mut self, url: &str, times: u32) -> Self {
        self.script(url).failures_left = times;
        self
    }

    /// Every fetch of `url` times out
    pub fn always_fail(mut self, url: &str) -> Self {
        self.script(url).always_fail = true;
        self
    }

    fn script(&mut self, url: &str) -> &mut Script {
        self.scripts
            .get_mut()
            .unwrap()
            .entry(url.to_string())
            .or_default()
    }

    /// Number of fetches made for `url`
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    /// Total number of fetches
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(url) else {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: 404,
            });
        };

        if script.always_fail || script.failures_left > 0 {
            script.failures_left = script.failures_left.saturating_sub(1);
            return Err(TransportError::Timeout {
                url: url.to_string(),
            });
        }

        Ok(script.body.clone().unwrap_or_default())
    }
}

/// Extractor treating each whitespace-separated word of the body as a URL
///
/// With a suffix set, only words ending in it are kept.
#[derive(Default)]
pub struct WordExtractor {
    suffix: Option<String>,
}

impl ListingExtractor for WordExtractor {
    fn extract(&self, content: &str, page_url: &str) -> Result<Vec<String>, ExtractionError> {
        if content == MALFORMED {
            return Err(ExtractionError::Parse {
                url: page_url.to_string(),
                message: "malformed listing".to_string(),
            });
        }
        Ok(content
            .split_whitespace()
            .filter(|word| self.suffix.as_deref().map_or(true, |s| word.ends_with(s)))
            .map(String::from)
            .collect())
    }

    fn identity(&self) -> Option<String> {
        Some(format!("words;suffix={:?}", self.suffix))
    }
}

pub fn word_extractor() -> Arc<dyn ListingExtractor> {
    Arc::new(WordExtractor::default())
}

/// Word extractor keeping only words ending in `suffix`
pub fn suffix_extractor(suffix: &str) -> Arc<dyn ListingExtractor> {
    Arc::new(WordExtractor {
        suffix: Some(suffix.to_string()),
    })
}
