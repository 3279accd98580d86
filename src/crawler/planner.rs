//! Pagination planner
//!
//! This module turns a crawl target into the ordered list of listing page
//! URLs to visit. Planning is a pure function of the target (plus the probe
//! result for auto-detected targets), so identical configuration always
//! yields an identical plan.

use crate::target::{CrawlTarget, PaginationMode};
use crate::{ConfigError, ConfigResult};
use url::{form_urlencoded, Url};

/// Placeholder token substituted with the page index
pub const PAGE_PLACEHOLDER: &str = "{}";

/// Plans the listing page URLs for a target
///
/// # Arguments
///
/// * `target` - The crawl target
/// * `detected_count` - Page count discovered by the probe (auto-detect only)
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Listing page URLs in visiting order
/// * `Err(ConfigError)` - The target is incomplete for its mode
///
/// # Example
///
/// ```
/// use pagesweep::crawler::plan;
/// use pagesweep::CrawlTarget;
///
/// let target = CrawlTarget::templated("news", "https://example.com/list?page={}", 1, 2);
/// let urls = plan(&target, None).unwrap();
/// assert_eq!(urls, vec![
///     "https://example.com/list?page=1".to_string(),
///     "https://example.com/list?page=2".to_string(),
/// ]);
/// ```
pub fn plan(target: &CrawlTarget, detected_count: Option<u32>) -> ConfigResult<Vec<String>> {
    match target.mode {
        PaginationMode::Explicit => {
            if target.urls.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Target '{}' uses explicit pagination but lists no pages",
                    target.name
                )));
            }
            Ok(target.urls.clone())
        }
        PaginationMode::Templated => {
            let template = require_template(target)?;
            let count = target
                .page_count
                .ok_or_else(|| ConfigError::MissingPageCount {
                    target: target.name.clone(),
                })?;
            generate_page_urls(template, &target.page_param, target.start_page, count)
        }
        PaginationMode::AutoDetect => {
            let template = require_template(target)?;
            let count = detected_count.ok_or_else(|| ConfigError::MissingPageCount {
                target: target.name.clone(),
            })?;
            generate_page_urls(template, &target.page_param, target.start_page, count)
        }
    }
}

/// Returns the template of a templated target or a configuration error
pub(crate) fn require_template(target: &CrawlTarget) -> ConfigResult<&str> {
    target
        .template
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingTemplate {
            target: target.name.clone(),
            mode: target.mode.to_string(),
        })
}

/// Last page an auto-detect probe of `target` may fetch
pub(crate) fn last_probe_page(target: &CrawlTarget) -> ConfigResult<u32> {
    target
        .start_page
        .checked_add(target.max_check_pages.saturating_sub(1))
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "Target '{}' probe range from page {} exceeds the largest page index",
                target.name, target.start_page
            ))
        })
}

/// Generates one URL per page index in `[start_page, start_page + count)`
pub fn generate_page_urls(
    template: &str,
    page_param: &str,
    start_page: u32,
    count: u32,
) -> ConfigResult<Vec<String>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let last_page = start_page.checked_add(count - 1).ok_or_else(|| {
        ConfigError::Validation(format!(
            "Page range starting at {} with {} pages exceeds the largest page index",
            start_page, count
        ))
    })?;
    (start_page..=last_page)
        .map(|page| resolve_page_url(template, page_param, page))
        .collect()
}

/// Resolves a pagination template for a single page index
///
/// # Resolution Rules
///
/// Evaluated in order:
///
/// 1. The template contains `{}` → every occurrence becomes the page index
/// 2. The template already has `page_param` in its query → its value is
///    replaced, other parameters keep their order
/// 3. Otherwise `page_param=N` is appended with `?` or `&`, before any
///    fragment
pub fn resolve_page_url(template: &str, page_param: &str, page: u32) -> ConfigResult<String> {
    let page_str = page.to_string();

    if template.contains(PAGE_PLACEHOLDER) {
        return Ok(template.replace(PAGE_PLACEHOLDER, &page_str));
    }

    let mut url = Url::parse(template)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid template '{}': {}", template, e)))?;

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        // Only the matching segments change; the others stay byte-for-byte
        let mut replaced = false;
        let segments: Vec<String> = query
            .split('&')
            .map(|segment| {
                let raw_key = segment.split_once('=').map_or(segment, |(key, _)| key);
                let matches = form_urlencoded::parse(raw_key.as_bytes())
                    .next()
                    .is_some_and(|(key, _)| key == page_param);
                if matches {
                    replaced = true;
                    format!("{}={}", raw_key, page_str)
                } else {
                    segment.to_string()
                }
            })
            .collect();

        if replaced {
            url.set_query(Some(&segments.join("&")));
            return Ok(url.to_string());
        }
    }

    // Append as a new query parameter, keeping the rest of the template verbatim
    let (head, fragment) = match template.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (template, None),
    };
    let separator = match head.find('?') {
        None => "?",
        Some(_) if head.ends_with('?') || head.ends_with('&') => "",
        Some(_) => "&",
    };

    let mut resolved = format!("{}{}{}={}", head, separator, page_param, page_str);
    if let Some(fragment) = fragment {
        resolved.push('#');
        resolved.push_str(fragment);
    }
    Ok(resolved)
}
