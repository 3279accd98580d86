//! Cache key derivation
//!
//! A cache key is the hex SHA-256 of a canonical rendering of the target's
//! pagination configuration and the identity of its extractor. Only the
//! fields the target's mode actually uses take part, and the target name is
//! left out, so two targets with the same pagination and extraction rules
//! share a cache slot.

use crate::target::{CrawlTarget, PaginationMode};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable identity of a crawl target's configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a target read with the given extractor
    ///
    /// `extractor` is the extractor's identity string (see
    /// `ListingExtractor::identity`).
    ///
    /// # Example
    ///
    /// ```
    /// use pagesweep::{CacheKey, CrawlTarget};
    ///
    /// let a = CrawlTarget::templated("a", "https://x/list?page={}", 1, 5);
    /// let b = CrawlTarget::templated("b", "https://x/list?page={}", 1, 5);
    /// let c = CrawlTarget::templated("a", "https://x/list?page={}", 1, 6);
    /// assert_eq!(CacheKey::for_target(&a, "a.item"), CacheKey::for_target(&b, "a.item"));
    /// assert_ne!(CacheKey::for_target(&a, "a.item"), CacheKey::for_target(&c, "a.item"));
    /// assert_ne!(CacheKey::for_target(&a, "a.item"), CacheKey::for_target(&a, "a.pdf"));
    /// ```
    pub fn for_target(target: &CrawlTarget, extractor: &str) -> Self {
        let mut fields = canonical_fields(target);
        fields.push(("extractor", extractor.to_string()));

        let mut hasher = Sha256::new();
        for (field, value) in fields {
            // Length prefixes keep field boundaries unambiguous
            hasher.update(format!("{}:{}:", field, value.len()).as_bytes());
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps a previously derived key (e.g. one read back from storage)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log output
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The configuration fields that identify a target, in a fixed order
fn canonical_fields(target: &CrawlTarget) -> Vec<(&'static str, String)> {
    let mut fields = vec![("mode", target.mode.as_str().to_string())];

    match target.mode {
        PaginationMode::Explicit => {
            fields.push(("url_count", target.urls.len().to_string()));
            fields.extend(target.urls.iter().map(|url| ("url", url.clone())));
        }
        PaginationMode::Templated | PaginationMode::AutoDetect => {
            fields.push(("template", target.template.clone().unwrap_or_default()));
            fields.push(("page_param", target.page_param.clone()));
            fields.push(("start_page", target.start_page.to_string()));

            if target.mode == PaginationMode::Templated {
                let count = target
                    .page_count
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string());
                fields.push(("page_count", count));
            } else {
                fields.push(("max_check_pages", target.max_check_pages.to_string()));
            }
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let target = CrawlTarget::explicit("t", vec!["https://x/a".into(), "https://x/b".into()]);
        assert_eq!(CacheKey::for_target(&target, "a"), CacheKey::for_target(&target, "a"));
        assert_eq!(CacheKey::for_target(&target, "a").as_str().len(), 64);
    }

    #[test]
    fn test_name_does_not_affect_key() {
        let a = CrawlTarget::explicit("first", vec!["https://x/a".into()]);
        let b = CrawlTarget::explicit("second", vec!["https://x/a".into()]);
        assert_eq!(CacheKey::for_target(&a, "a"), CacheKey::for_target(&b, "a"));
    }

    #[test]
    fn test_list_order_affects_key() {
        let a = CrawlTarget::explicit("t", vec!["https://x/a".into(), "https://x/b".into()]);
        let b = CrawlTarget::explicit("t", vec!["https://x/b".into(), "https://x/a".into()]);
        assert_ne!(CacheKey::for_target(&a, "a"), CacheKey::for_target(&b, "a"));
    }

    #[test]
    fn test_template_and_bounds_affect_key() {
        let base = CrawlTarget::templated("t", "https://x/list?page={}", 1, 5);
        let other_template = CrawlTarget::templated("t", "https://x/news?page={}", 1, 5);
        let other_start = CrawlTarget::templated("t", "https://x/list?page={}", 2, 5);
        let other_param = base.clone().with_page_param("p");

        let key = CacheKey::for_target(&base, "a");
        assert_ne!(key, CacheKey::for_target(&other_template, "a"));
        assert_ne!(key, CacheKey::for_target(&other_start, "a"));
        assert_ne!(key, CacheKey::for_target(&other_param, "a"));
    }

    #[test]
    fn test_mode_affects_key() {
        let templated = CrawlTarget::templated("t", "https://x/list?page={}", 1, 50);
        let auto = CrawlTarget::auto_detect("t", "https://x/list?page={}", 1, 50);
        assert_ne!(CacheKey::for_target(&templated, "a"), CacheKey::for_target(&auto, "a"));
    }

    #[test]
    fn test_unused_fields_do_not_affect_key() {
        let a = CrawlTarget::templated("t", "https://x/list?page={}", 1, 5);
        let mut b = a.clone();
        b.max_check_pages = 999;
        b.urls = vec!["https://ignored".into()];
        assert_eq!(CacheKey::for_target(&a, "a"), CacheKey::for_target(&b, "a"));
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        let a = CrawlTarget::explicit("t", vec!["https://x/a".into(), "b".into()]);
        let b = CrawlTarget::explicit("t", vec!["https://x/a\nurl:1:b".into()]);
        assert_ne!(CacheKey::for_target(&a, "a"), CacheKey::for_target(&b, "a"));
    }

    #[test]
    fn test_extractor_identity_affects_key() {
        let target = CrawlTarget::templated("t", "https://x/list?page={}", 1, 5);
        assert_ne!(
            CacheKey::for_target(&target, "selector=a;contains=.html"),
            CacheKey::for_target(&target, "selector=a;contains=.pdf")
        );
    }

    #[test]
    fn test_short_prefix() {
        let key = CacheKey::for_target(&CrawlTarget::explicit("t", vec!["https://x/a".into()]), "a");
        assert_eq!(key.short().len(), 12);
        assert!(key.as_str().starts_with(key.short()));

        assert_eq!(CacheKey::from_raw("abc").short(), "abc");
        // Multi-byte characters must not split a char boundary
        assert_eq!(CacheKey::from_raw("ééééééééééééé").short(), "éééééééééééé");
    }
}
