//! Listing page extraction
//!
//! The engine does not know the markup of a listing page. Each crawl target
//! supplies a `ListingExtractor` that turns page content into item URLs.
//! `SelectorExtractor` covers the common case of "links matching a CSS
//! selector"; any closure with the right signature works as well.

use crate::ExtractionError;
use scraper::{Html, Selector};
use url::Url;

/// Extracts item URLs from listing page content
pub trait ListingExtractor: Send + Sync {
    /// Returns the item URLs found in `content`, in page order
    ///
    /// An empty vector is a valid result and means the page lists no items.
    fn extract(&self, content: &str, page_url: &str) -> Result<Vec<String>, ExtractionError>;

    /// Stable description of the extraction rules
    ///
    /// Part of the cache key, so extractors with different rules never
    /// share cached results. Extractors returning `None` (such as plain
    /// closures) are never served from or stored in the cache.
    fn identity(&self) -> Option<String> {
        None
    }
}

impl<F> ListingExtractor for F
where
    F: Fn(&str, &str) -> Result<Vec<String>, ExtractionError> + Send + Sync,
{
    fn extract(&self, content: &str, page_url: &str) -> Result<Vec<String>, ExtractionError> {
        self(content, page_url)
    }
}

/// Default attribute read from selected elements
pub const DEFAULT_ATTRIBUTE: &str = "href";

/// Extracts links from elements matching a CSS selector
///
/// # Extraction Rules
///
/// - The configured attribute (default `href`) is read from every match
/// - Relative links resolve against `base_url`, or the listing page URL
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links are skipped
/// - Only HTTP(S) results are kept
/// - If `contains` is set, links not containing it are skipped
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    selector: String,
    attribute: String,
    contains: Option<String>,
    base_url: Option<Url>,
}

impl SelectorExtractor {
    /// Creates an extractor for the given CSS selector
    ///
    /// # Example
    ///
    /// ```
    /// use pagesweep::crawler::{ListingExtractor, SelectorExtractor};
    ///
    /// let extractor = SelectorExtractor::new("a.item").unwrap();
    /// let html = r#"<a class="item" href="/article/1">One</a><a href="/about">About</a>"#;
    /// let urls = extractor.extract(html, "https://example.com/list?page=1").unwrap();
    /// assert_eq!(urls, vec!["https://example.com/article/1".to_string()]);
    /// ```
    pub fn new(selector: &str) -> Result<Self, ExtractionError> {
        parse_selector(selector)?;
        Ok(Self {
            selector: selector.to_string(),
            attribute: DEFAULT_ATTRIBUTE.to_string(),
            contains: None,
            base_url: None,
        })
    }

    /// Reads `attribute` instead of `href`
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    /// Keeps only links containing `needle`
    pub fn with_contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    /// Resolves relative links against `base_url` instead of the page URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

impl ListingExtractor for SelectorExtractor {
    fn identity(&self) -> Option<String> {
        Some(format!(
            "selector={:?};attribute={:?};contains={:?};base-url={:?}",
            self.selector,
            self.attribute,
            self.contains,
            self.base_url.as_ref().map(Url::as_str)
        ))
    }

    fn extract(&self, content: &str, page_url: &str) -> Result<Vec<String>, ExtractionError> {
        let selector = parse_selector(&self.selector)?;
        let base_url = match &self.base_url {
            Some(base) => base.clone(),
            None => Url::parse(page_url).map_err(|e| ExtractionError::Parse {
                url: page_url.to_string(),
                message: format!("Cannot resolve links against page URL: {}", e),
            })?,
        };

        let document = Html::parse_document(content);
        let mut links = Vec::new();

        for element in document.select(&selector) {
            let Some(raw) = element.value().attr(&self.attribute) else {
                continue;
            };

            let Some(absolute) = resolve_link(raw, &base_url) else {
                continue;
            };

            if let Some(needle) = &self.contains {
                if !absolute.contains(needle.as_str()) {
                    continue;
                }
            }

            links.push(absolute);
        }

        Ok(links)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Resolves a link to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://example.com/news/list?page=2";

    #[test]
    fn test_extracts_matching_links_in_order() {
        let html = r#"
            <ul>
                <li><a class="item" href="/article/2">Two</a></li>
                <li><a class="item" href="https://example.com/article/1">One</a></li>
                <li><a href="/about">About</a></li>
            </ul>
        "#;
        let extractor = SelectorExtractor::new("a.item").unwrap();
        let urls = extractor.extract(html, PAGE).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com/article/2",
                "https://example.com/article/1"
            ]
        );
    }

    #[test]
    fn test_relative_path_resolves_against_page() {
        let html = r#"<a href="detail?id=3">Three</a>"#;
        let extractor = SelectorExtractor::new("a").unwrap();
        let urls = extractor.extract(html, PAGE).unwrap();
        assert_eq!(urls, vec!["https://example.com/news/detail?id=3"]);
    }

    #[test]
    fn test_configured_base_url() {
        let html = r#"<a href="/article/9">Nine</a>"#;
        let extractor = SelectorExtractor::new("a")
            .unwrap()
            .with_base_url(Url::parse("https://cdn.example.org/").unwrap());
        let urls = extractor.extract(html, PAGE).unwrap();
        assert_eq!(urls, vec!["https://cdn.example.org/article/9"]);
    }

    #[test]
    fn test_contains_filter() {
        let html = r#"
            <a href="/article/1">One</a>
            <a href="/tag/rust">Tag</a>
        "#;
        let extractor = SelectorExtractor::new("a").unwrap().with_contains("/article/");
        let urls = extractor.extract(html, PAGE).unwrap();
        assert_eq!(urls, vec!["https://example.com/article/1"]);
    }

    #[test]
    fn test_custom_attribute() {
        let html = r#"<div class="card" data-url="/article/5"></div>"#;
        let extractor = SelectorExtractor::new("div.card")
            .unwrap()
            .with_attribute("data-url");
        let urls = extractor.extract(html, PAGE).unwrap();
        assert_eq!(urls, vec!["https://example.com/article/5"]);
    }

    #[test]
    fn test_skips_non_http_links() {
        let html = r##"
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:a@example.com">Mail</a>
            <a href="tel:+123">Call</a>
            <a href="data:text/html,hi">Data</a>
            <a href="#top">Top</a>
            <a href="ftp://example.com/file">FTP</a>
        "##;
        let extractor = SelectorExtractor::new("a").unwrap();
        assert!(extractor.extract(html, PAGE).unwrap().is_empty());
    }

    #[test]
    fn test_empty_page_yields_empty_list() {
        let extractor = SelectorExtractor::new("a.item").unwrap();
        assert!(extractor
            .extract("<html><body></body></html>", PAGE)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        assert!(matches!(
            SelectorExtractor::new("a[[["),
            Err(ExtractionError::Selector { .. })
        ));
    }

    #[test]
    fn test_unresolvable_page_url_is_extraction_error() {
        let extractor = SelectorExtractor::new("a").unwrap();
        let result = extractor.extract(r#"<a href="/x">x</a>"#, "not a url");
        assert!(matches!(result, Err(ExtractionError::Parse { .. })));
    }

    #[test]
    fn test_closure_extractor() {
        let extractor = |content: &str, _page: &str| -> Result<Vec<String>, ExtractionError> {
            Ok(content.lines().map(str::to_string).collect())
        };
        let urls = ListingExtractor::extract(&extractor, "u1\nu2", PAGE).unwrap();
        assert_eq!(urls, vec!["u1", "u2"]);
    }

    #[test]
    fn test_identity_reflects_rules() {
        let html = SelectorExtractor::new("a").unwrap().with_contains(".html");
        let pdf = SelectorExtractor::new("a").unwrap().with_contains(".pdf");
        let same = SelectorExtractor::new("a").unwrap().with_contains(".html");

        assert_ne!(html.identity(), pdf.identity());
        assert_eq!(html.identity(), same.identity());
        assert_ne!(
            html.identity(),
            html.clone().with_attribute("data-href").identity()
        );
    }

    #[test]
    fn test_closures_have_no_identity() {
        let extractor = |_: &str, _: &str| -> Result<Vec<String>, ExtractionError> { Ok(vec![]) };
        assert!(ListingExtractor::identity(&extractor).is_none());
    }
}
