//! Integration tests for the sweep engine
//!
//! These tests use wiremock to create mock HTTP servers and run targets
//! through the full pipeline: configuration, probing, fetching, extraction,
//! aggregation and caching.

use pagesweep::config::{parse_config, Config};
use pagesweep::crawler::{Engine, ListingExtractor};
use pagesweep::{CrawlTarget, RunHealth};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders a listing page with item links plus unrelated navigation
fn listing(items: &[u32]) -> String {
    let links: String = items
        .iter()
        .map(|i| format!(r#"<li><a class="item" href="/item/{}">Item {}</a></li>"#, i, i))
        .collect();
    format!(
        r#"<html><body><nav><a href="/about">About</a></nav><ul>{}</ul></body></html>"#,
        links
    )
}

/// Mounts a listing page answered for `?page=N` on `/list`
async fn mount_page(server: &MockServer, page: u32, items: &[u32], expected: u64) {
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(items))
                .insert_header("content-type", "text/html"),
        )
        .expect(expected)
        .mount(server)
        .await;
}

/// Builds a configuration with fast pacing and the given target tables
fn test_config(targets: &str, cache: &str) -> Config {
    let toml = format!(
        r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[scheduler]
batch-size = 2
batch-delay-ms = 0
max-attempts = 3
initial-backoff-ms = 1
max-backoff-ms = 5

[probe]
delay-ms = 0

[cache]
{}

{}
"#,
        cache, targets
    );
    parse_config(&toml).expect("test config should be valid")
}

fn target_and_extractor(config: &Config, name: &str) -> (CrawlTarget, Arc<dyn ListingExtractor>) {
    let target_config = config.target(name).expect("target should exist");
    let extractor = target_config
        .extractor
        .build()
        .expect("extractor should build");
    (target_config.to_target(&config.probe), Arc::new(extractor))
}

#[tokio::test]
async fn test_explicit_target_end_to_end() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[1, 2])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sports"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[2, 3])))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(
        &format!(
            r#"
[[target]]
name = "sections"
mode = "explicit"
urls = ["{base}/news", "{base}/sports"]

[target.extractor]
selector = "a.item"
"#
        ),
        "",
    );
    let engine = Engine::from_config(&config).unwrap();
    let (target, extractor) = target_and_extractor(&config, "sections");

    let result = engine.get_urls(&target, extractor).await.unwrap();

    assert_eq!(
        result.urls,
        vec![
            format!("{}/item/1", base),
            format!("{}/item/2", base),
            format!("{}/item/3", base),
        ]
    );
    assert_eq!(result.raw_count, 4);
    assert_eq!(result.unique_count, 3);
    assert_eq!(result.health(), RunHealth::Complete);
}

#[tokio::test]
async fn test_templated_target_appends_page_param() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, 1, &[1, 2], 1).await;
    mount_page(&server, 2, &[3, 4], 1).await;
    mount_page(&server, 3, &[5], 1).await;

    let config = test_config(
        &format!(
            r#"
[[target]]
name = "archive"
mode = "templated"
template = "{base}/list"
page-count = 3

[target.extractor]
selector = "a.item"
"#
        ),
        "",
    );
    let engine = Engine::from_config(&config).unwrap();
    let (target, extractor) = target_and_extractor(&config, "archive");

    let result = engine.get_urls(&target, extractor).await.unwrap();

    assert_eq!(result.total_pages, 3);
    assert_eq!(result.unique_count, 5);
    assert_eq!(result.urls[0], format!("{}/item/1", base));
    assert_eq!(result.urls[4], format!("{}/item/5", base));
}

#[tokio::test]
async fn test_auto_detect_target_end_to_end() {
    let server = MockServer::start().await;

    // Non-empty pages are fetched twice: once by the probe, once by the scheduler
    mount_page(&server, 1, &[1, 2], 2).await;
    mount_page(&server, 2, &[2, 3], 2).await;
    mount_page(&server, 3, &[], 1).await;
    mount_page(&server, 4, &[9], 0).await;

    let config = test_config(
        &format!(
            r#"
[[target]]
name = "latest"
mode = "auto-detect"
template = "{}/list?page={{}}"
max-check-pages = 10

[target.extractor]
selector = "a.item"
"#,
            server.uri()
        ),
        "",
    );
    let engine = Engine::from_config(&config).unwrap();
    let (target, extractor) = target_and_extractor(&config, "latest");

    let result = engine.get_urls(&target, extractor).await.unwrap();

    assert_eq!(result.total_pages, 2);
    assert_eq!(result.unique_count, 3);
    assert!(!result.probe_truncated);
}

#[tokio::test]
async fn test_cache_hit_skips_fetching() {
    let server = MockServer::start().await;

    mount_page(&server, 1, &[1], 1).await;
    mount_page(&server, 2, &[2], 1).await;

    let config = test_config(
        &format!(
            r#"
[[target]]
name = "archive"
mode = "templated"
template = "{}/list?page={{}}"
page-count = 2

[target.extractor]
selector = "a.item"
"#,
            server.uri()
        ),
        "ttl-secs = 600",
    );
    let engine = Engine::from_config(&config).unwrap();
    let (target, extractor) = target_and_extractor(&config, "archive");

    let first = engine.get_urls(&target, extractor.clone()).await.unwrap();
    let second = engine
        .sweep(&target, extractor, false, &CancellationToken::new())
        .await
        .unwrap();

    assert!(second.from_cache);
    assert_eq!(second.result, first);
}

#[tokio::test]
async fn test_persistent_cache_survives_new_engine() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cache.db");

    mount_page(&server, 1, &[1, 2], 1).await;

    let config = test_config(
        &format!(
            r#"
[[target]]
name = "archive"
mode = "templated"
template = "{}/list?page={{}}"
page-count = 1

[target.extractor]
selector = "a.item"
"#,
            server.uri()
        ),
        &format!("database-path = {:?}", db_path.to_string_lossy()),
    );
    let (target, extractor) = target_and_extractor(&config, "archive");

    let first = {
        let engine = Engine::from_config(&config).unwrap();
        engine.get_urls(&target, extractor.clone()).await.unwrap()
    };

    let engine = Engine::from_config(&config).unwrap();
    let outcome = engine
        .sweep(&target, extractor, false, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.from_cache);
    assert_eq!(outcome.result.urls, first.urls);
}

#[tokio::test]
async fn test_server_errors_give_partial_result() {
    let server = MockServer::start().await;

    mount_page(&server, 1, &[1], 1).await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, 3, &[3], 1).await;

    let config = test_config(
        &format!(
            r#"
[[target]]
name = "flaky"
mode = "templated"
template = "{}/list?page={{}}"
page-count = 3

[target.extractor]
selector = "a.item"
"#,
            server.uri()
        ),
        "",
    );
    let engine = Engine::from_config(&config).unwrap();
    let (target, extractor) = target_and_extractor(&config, "flaky");

    let result = engine.get_urls(&target, extractor).await.unwrap();

    assert_eq!(
        result.health(),
        RunHealth::Partial {
            failed_pages: 1,
            total_pages: 3
        }
    );
    assert_eq!(result.unique_count, 2);
    assert!(result.pages[1].failure.as_deref().unwrap().contains("503"));
}

#[tokio::test]
async fn test_same_listing_with_different_filters_cached_separately() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a href="/a.html">A</a><a href="/b.pdf">B</a></body></html>"#,
        ))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(
        &format!(
            r#"
[[target]]
name = "articles"
mode = "templated"
template = "{base}/list?page={{}}"
page-count = 1

[target.extractor]
selector = "a"
contains = ".html"

[[target]]
name = "pdfs"
mode = "templated"
template = "{base}/list?page={{}}"
page-count = 1

[target.extractor]
selector = "a"
contains = ".pdf"
"#
        ),
        "ttl-secs = 600",
    );
    let engine = Engine::from_config(&config).unwrap();
    let (articles, article_links) = target_and_extractor(&config, "articles");
    let (pdfs, pdf_links) = target_and_extractor(&config, "pdfs");

    let first = engine.get_urls(&articles, article_links).await.unwrap();
    let second = engine
        .sweep(&pdfs, pdf_links, false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.urls, vec![format!("{}/a.html", base)]);
    assert!(!second.from_cache);
    assert_eq!(second.result.urls, vec![format!("{}/b.pdf", base)]);
}
