//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full harvest cycle end-to-end: listing, AJAX continuation,
//! article extraction and corpus writes.

use corpus_harvest::config::{
    ArticleRule, Config, CorpusKind, CrawlerConfig, FieldRule, FixedPagerConfig, LinkRule,
    OffsetPagerConfig, OutputConfig, PaginationConfig, TargetConfig, UserAgentConfig,
};
use corpus_harvest::crawler::{harvest_target, CrawlEngine, HttpFetcher, SelectorExtractor};
use corpus_harvest::storage::{CorpusWriter, JsonlCorpus};
use corpus_harvest::StopReason;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with a single target
fn create_test_config(target: TargetConfig) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            max_concurrent_requests: 4,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            bangla_corpus: "bangla.jsonl".to_string(),
            english_corpus: "english.jsonl".to_string(),
        },
        targets: vec![target],
        batches: vec![],
    }
}

fn create_test_target(base_url: &str, pagination: PaginationConfig) -> TargetConfig {
    TargetConfig {
        name: "dhakatribune".to_string(),
        start_urls: vec![format!("{}/latest", base_url)],
        allowed_domains: vec![],
        corpus: CorpusKind::English,
        language: "en".to_string(),
        section: "World".to_string(),
        default_author: Some("Tribune Desk".to_string()),
        max_articles: 50,
        min_body_words: 5,
        links: LinkRule {
            selector: "h2.title a".to_string(),
            attribute: "href".to_string(),
        },
        article: ArticleRule {
            title: Some(FieldRule {
                selector: "h1".to_string(),
                attribute: None,
                strip_prefix: None,
            }),
            body: "div.content p".to_string(),
            date: Some(FieldRule {
                selector: "span.published".to_string(),
                attribute: Some("content".to_string()),
                strip_prefix: None,
            }),
            author: None,
        },
        pagination,
        divisions: vec![],
    }
}

fn offset_pagination(base_url: &str) -> PaginationConfig {
    PaginationConfig::OffsetPager(OffsetPagerConfig {
        api_url: format!("{}/api/more?start={{offset}}", base_url),
        start_offset: 20,
        page_size: 20,
        max_offset: 200,
        html_field: "html".to_string(),
        headers: BTreeMap::from([(
            "X-Requested-With".to_string(),
            "XMLHttpRequest".to_string(),
        )]),
    })
}

fn listing_html(links: &[&str]) -> String {
    let items: String = links
        .iter()
        .map(|l| format!(r#"<h2 class="title"><a href="{}">headline</a></h2>"#, l))
        .collect();
    format!("<html><body>{}</body></html>", items)
}

fn article_html(title: &str) -> String {
    format!(
        r#"<html><body>
        <h1>{}</h1>
        <span class="published" content="2026-01-10T08:00:00+06:00"></span>
        <div class="content">
            <p>The flood waters receded slowly across the northern districts.</p>
            <p>Relief work continued through the night.</p>
        </div>
        </body></html>"#,
        title
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_articles(server: &MockServer, ids: &[u32]) {
    for id in ids {
        mount_html(server, &format!("/news/{}", id), article_html(&format!("Story {}", id))).await;
    }
}

fn engine_for(config: &Config) -> CrawlEngine {
    let fetcher = HttpFetcher::new(config).expect("Failed to build fetcher");
    CrawlEngine::new(Arc::new(fetcher), Arc::new(SelectorExtractor))
        .with_concurrency(config.crawler.max_concurrent_requests as usize)
}

/// Mounts a listing with two stories and an offset API with one more page
async fn mount_offset_site(server: &MockServer) {
    mount_html(server, "/latest", listing_html(&["/news/1", "/news/2"])).await;
    mount_articles(server, &[1, 2, 3]).await;

    Mock::given(method("GET"))
        .and(path("/api/more"))
        .and(query_param("start", "20"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "html": listing_html(&["/news/2", "/news/3"])
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/more"))
        .and(query_param("start", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "html": "" })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/more"))
        .and(query_param("start", "60"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_with_offset_pagination() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_offset_site(&mock_server).await;

    let config = create_test_config(create_test_target(&base_url, offset_pagination(&base_url)));
    let engine = engine_for(&config);
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let corpus_path = temp_dir.path().join("english.jsonl");

    let summary = {
        let mut corpus = JsonlCorpus::open(&corpus_path);
        harvest_target(&engine, &config.targets[0], &mut corpus)
            .await
            .expect("Harvest failed")
    };

    assert_eq!(summary.written, 3);
    assert_eq!(summary.duplicates, 0);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].stop_reason, Some(StopReason::EmptyPayload));
    assert_eq!(summary.reports[0].seen_urls, 3);
    assert!(summary.requests_per_host.values().sum::<u32>() >= 6);

    let content = fs::read_to_string(&corpus_path).expect("Corpus not written");
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect();
    assert_eq!(records.len(), 3);

    let first = &records[0];
    assert_eq!(first["url"], format!("{}/news/1", base_url));
    assert_eq!(first["title"], "Story 1");
    assert_eq!(first["date"], "2026-01-10T08:00:00+06:00");
    assert_eq!(first["author"], "Tribune Desk");
    assert_eq!(first["section"], "world");
    assert_eq!(first["language"], "en");
    assert_eq!(first["tokens"], 15);
}

#[tokio::test]
async fn test_second_harvest_writes_nothing_new() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_html(&mock_server, "/latest", listing_html(&["/news/1", "/news/2"])).await;
    mount_articles(&mock_server, &[1, 2]).await;

    let config = create_test_config(create_test_target(&base_url, PaginationConfig::None));
    let engine = engine_for(&config);
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let corpus_path = temp_dir.path().join("english.jsonl");

    for expected_written in [2, 0] {
        let mut corpus = JsonlCorpus::open(&corpus_path);
        let summary = harvest_target(&engine, &config.targets[0], &mut corpus)
            .await
            .expect("Harvest failed");
        assert_eq!(summary.written, expected_written);
    }

    let corpus = JsonlCorpus::open(&corpus_path);
    assert_eq!(corpus.load_existing_urls().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_article_is_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_html(
        &mock_server,
        "/latest",
        listing_html(&["/news/1", "/news/broken", "/news/2"]),
    )
    .await;
    mount_articles(&mock_server, &[1, 2]).await;
    Mock::given(method("GET"))
        .and(path("/news/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(create_test_target(&base_url, PaginationConfig::None));
    let engine = engine_for(&config);
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut corpus = JsonlCorpus::open(temp_dir.path().join("english.jsonl"));
    let summary = harvest_target(&engine, &config.targets[0], &mut corpus)
        .await
        .expect("Harvest failed");

    assert_eq!(summary.written, 2);
    assert_eq!(summary.reports[0].stats.fetch_failures, 1);
    assert_eq!(summary.reports[0].stop_reason, Some(StopReason::NoPagination));
}

#[tokio::test]
async fn test_fixed_pager_stops_on_empty_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_html(&mock_server, "/latest", listing_html(&["/news/1"])).await;
    mount_html(&mock_server, "/latest/page/2", listing_html(&["/news/2"])).await;
    mount_html(&mock_server, "/latest/page/3", listing_html(&[])).await;
    mount_articles(&mock_server, &[1, 2]).await;

    Mock::given(method("GET"))
        .and(path("/latest/page/4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&["/news/9"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let pagination = PaginationConfig::FixedPager(FixedPagerConfig {
        page_url: format!("{}/latest/page/{{page}}", base_url),
        first_page: 2,
        max_pages: 10,
        headers: BTreeMap::new(),
    });
    let config = create_test_config(create_test_target(&base_url, pagination));
    let engine = engine_for(&config);
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut corpus = JsonlCorpus::open(temp_dir.path().join("english.jsonl"));
    let summary = harvest_target(&engine, &config.targets[0], &mut corpus)
        .await
        .expect("Harvest failed");

    assert_eq!(summary.written, 2);
    assert_eq!(summary.reports[0].stop_reason, Some(StopReason::NoNewLinks));
    assert_eq!(summary.reports[0].stats.continuation_pages, 2);
}

#[tokio::test]
async fn test_quota_limits_written_records() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_html(
        &mock_server,
        "/latest",
        listing_html(&["/news/1", "/news/2", "/news/3", "/news/4"]),
    )
    .await;
    mount_articles(&mock_server, &[1, 2, 3, 4]).await;

    let mut target = create_test_target(&base_url, PaginationConfig::None);
    target.max_articles = 2;
    let config = create_test_config(target);
    let engine = engine_for(&config);
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut corpus = JsonlCorpus::open(temp_dir.path().join("english.jsonl"));
    let summary = harvest_target(&engine, &config.targets[0], &mut corpus)
        .await
        .expect("Harvest failed");

    assert_eq!(summary.written, 2);
    assert_eq!(summary.reports[0].stats.articles_fetched, 2);
    assert_eq!(summary.reports[0].stop_reason, Some(StopReason::QuotaReached));
}
