//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the conditions API and run the
//! full crawl cycle end-to-end.

use condition_corpus::config::{
    ApiConfig, ChunkingConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig,
};
use condition_corpus::crawler::{run_crawl, CrawlOutcome, SUBSCRIPTION_KEY_HEADER};
use condition_corpus::output::read_corpus;
use condition_corpus::ExtractedDocument;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, output_dir: &std::path::Path) -> Config {
    Config {
        api: ApiConfig {
            base_url: format!("{}/conditions/", base_url),
            key_env: "CONDITION_CORPUS_TEST_KEY".to_string(),
            secrets_file: None,
        },
        crawler: CrawlerConfig {
            max_concurrent_requests: 4,
            download_delay: 5, // Very short for testing
            request_timeout: 5,
            max_retries: 0,
            retry_delay: 10,
            advance_when_all_children_fail: true,
            max_pages: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            corpus_path: output_dir.join("corpus.jsonl").display().to_string(),
            summary_path: output_dir.join("summary.md").display().to_string(),
            text_dir: None,
            chunks_path: None,
        },
        chunking: ChunkingConfig::default(),
    }
}

/// A listing body with `Result` links to `children` and an optional next page
fn listing(base_url: &str, children: &[&str], next: Option<&str>) -> String {
    let significant: Vec<String> = children
        .iter()
        .map(|p| {
            format!(
                r#"{{"linkRelationship":"Result","url":"{}{}","name":"{}"}}"#,
                base_url, p, p
            )
        })
        .collect();
    let related: Vec<String> = next
        .map(|p| format!(r#"{{"name":"Next Page","url":"{}{}"}}"#, base_url, p))
        .into_iter()
        .collect();

    format!(
        r#"{{"significantLink":[{}],"relatedLink":[{}]}}"#,
        significant.join(","),
        related.join(",")
    )
}

/// A condition payload in the markdown-tree layout
fn markdown_page(text: &str) -> String {
    format!(
        r#"{{"mainEntityOfPage":[{{"mainEntityOfPage":[{{"name":"markdown","text":"{}"}}]}}]}}"#,
        text
    )
}

async fn mount_json(server: &MockServer, at: &str, body: String, delay_ms: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .and(header(SUBSCRIPTION_KEY_HEADER, API_KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/json")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(server)
        .await;
}

fn texts(documents: &[ExtractedDocument]) -> Vec<&str> {
    documents.iter().map(|d| d.text.as_str()).collect()
}

#[tokio::test]
async fn test_documents_follow_listing_order() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_json(
        &server,
        "/conditions/",
        listing(
            &base_url,
            &["/conditions/acne/", "/conditions/bunions/", "/conditions/cough/"],
            Some("/conditions/page/2"),
        ),
        0,
    )
    .await;
    mount_json(
        &server,
        "/conditions/page/2",
        listing(&base_url, &["/conditions/dizziness/"], None),
        0,
    )
    .await;

    // Earlier positions answer last
    mount_json(&server, "/conditions/acne/", markdown_page("Acne"), 300).await;
    mount_json(&server, "/conditions/bunions/", markdown_page("Bunions"), 150).await;
    mount_json(&server, "/conditions/cough/", markdown_page("Cough"), 0).await;
    mount_json(&server, "/conditions/dizziness/", markdown_page("Dizziness"), 0).await;

    let config = create_test_config(&base_url, dir.path());
    let (report, documents) = run_crawl(config, API_KEY, Vec::<ExtractedDocument>::new())
        .await
        .expect("Crawl failed");

    assert!(report.is_success());
    assert_eq!(
        texts(&documents),
        vec!["Acne", "Bunions", "Cough", "Dizziness"]
    );
    assert_eq!(
        documents[0].source_url,
        format!("{}/conditions/acne/", base_url)
    );
    assert_eq!(report.stats.pages_requested, 2);
    assert_eq!(report.stats.pages_completed, 2);
    assert_eq!(report.stats.documents_emitted, 4);
}

#[tokio::test]
async fn test_failed_and_unparseable_children_are_skipped() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_json(
        &server,
        "/conditions/",
        listing(
            &base_url,
            &[
                "/conditions/acne/",
                "/conditions/broken/",
                "/conditions/html/",
                "/conditions/empty/",
                "/conditions/gout/",
            ],
            None,
        ),
        0,
    )
    .await;
    mount_json(&server, "/conditions/acne/", markdown_page("Acne"), 100).await;
    Mock::given(method("GET"))
        .and(path("/conditions/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/conditions/html/",
        "<html>Service unavailable</html>".to_string(),
        0,
    )
    .await;
    mount_json(&server, "/conditions/empty/", r#"{"about":{}}"#.to_string(), 0).await;
    mount_json(
        &server,
        "/conditions/gout/",
        r#"{"hasPart":[{"headline":"Gout","description":"Joint pain","text":"Sudden"}]}"#
            .to_string(),
        0,
    )
    .await;

    let config = create_test_config(&base_url, dir.path());
    let (report, documents) = run_crawl(config, API_KEY, Vec::<ExtractedDocument>::new())
        .await
        .expect("Crawl failed");

    assert!(report.is_success());
    assert_eq!(texts(&documents), vec!["Acne", "Gout Joint pain Sudden "]);
    assert_eq!(report.stats.child_fetch_failures, 1);
    assert_eq!(report.stats.extraction_failures, 1);
    assert_eq!(report.stats.empty_documents, 3);
}

#[tokio::test]
async fn test_empty_listing_page_advances() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_json(
        &server,
        "/conditions/",
        listing(&base_url, &[], Some("/conditions/page/2")),
        0,
    )
    .await;
    mount_json(
        &server,
        "/conditions/page/2",
        listing(&base_url, &["/conditions/acne/"], None),
        0,
    )
    .await;
    mount_json(&server, "/conditions/acne/", markdown_page("Acne"), 0).await;

    let config = create_test_config(&base_url, dir.path());
    let (report, documents) = run_crawl(config, API_KEY, Vec::<ExtractedDocument>::new())
        .await
        .expect("Crawl failed");

    assert!(report.is_success());
    assert_eq!(texts(&documents), vec!["Acne"]);
    assert_eq!(report.stats.children_requested, 1);
}

#[tokio::test]
async fn test_malformed_listing_halts_and_keeps_earlier_documents() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_json(
        &server,
        "/conditions/",
        listing(&base_url, &["/conditions/acne/"], Some("/conditions/page/2")),
        0,
    )
    .await;
    mount_json(
        &server,
        "/conditions/page/2",
        "<html>maintenance</html>".to_string(),
        0,
    )
    .await;
    mount_json(&server, "/conditions/acne/", markdown_page("Acne"), 0).await;

    let config = create_test_config(&base_url, dir.path());
    let (report, documents) = run_crawl(config, API_KEY, Vec::<ExtractedDocument>::new())
        .await
        .expect("Crawl failed");

    assert!(!report.is_success());
    match &report.outcome {
        CrawlOutcome::Failed { url, .. } => {
            assert_eq!(url, &format!("{}/conditions/page/2", base_url))
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(texts(&documents), vec!["Acne"]);
    assert_eq!(report.stats.pages_failed, 1);
}

#[tokio::test]
async fn test_missing_key_is_rejected_by_api() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_json(
        &server,
        "/conditions/",
        listing(&base_url, &["/conditions/acne/"], None),
        0,
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = create_test_config(&base_url, dir.path());
    let (report, documents) = run_crawl(config, "wrong-key", Vec::<ExtractedDocument>::new())
        .await
        .expect("Crawl failed");

    assert!(documents.is_empty());
    assert!(matches!(
        report.outcome,
        CrawlOutcome::Failed { ref reason, .. } if reason == "HTTP 401"
    ));
}

#[tokio::test]
async fn test_transient_child_failure_is_retried() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_json(
        &server,
        "/conditions/",
        listing(&base_url, &["/conditions/acne/"], None),
        0,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/conditions/acne/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_json(&server, "/conditions/acne/", markdown_page("Acne"), 0).await;

    let mut config = create_test_config(&base_url, dir.path());
    config.crawler.max_retries = 2;
    let (report, documents) = run_crawl(config, API_KEY, Vec::<ExtractedDocument>::new())
        .await
        .expect("Crawl failed");

    assert!(report.is_success());
    assert_eq!(texts(&documents), vec!["Acne"]);
    assert_eq!(report.stats.child_fetch_failures, 0);
}

#[tokio::test]
async fn test_crawl_writes_jsonl_corpus() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_json(
        &server,
        "/conditions/",
        listing(&base_url, &["/conditions/acne/", "/conditions/gout/"], None),
        0,
    )
    .await;
    mount_json(&server, "/conditions/acne/", markdown_page("Acne"), 50).await;
    mount_json(&server, "/conditions/gout/", markdown_page("Gout"), 0).await;

    let mut config = create_test_config(&base_url, dir.path());
    config.api.key_env = "CONDITION_CORPUS_JSONL_TEST_KEY".to_string();
    config.output.text_dir = Some(dir.path().join("docs").display().to_string());
    std::env::set_var("CONDITION_CORPUS_JSONL_TEST_KEY", API_KEY);

    let corpus_path = dir.path().join("corpus.jsonl");
    let report = condition_corpus::crawler::crawl(config, None)
        .await
        .expect("Crawl failed");
    assert!(report.is_success());

    let documents = read_corpus(&corpus_path).unwrap();
    assert_eq!(texts(&documents), vec!["Acne", "Gout"]);

    let gout = std::fs::read_to_string(dir.path().join("docs").join("gout.txt")).unwrap();
    assert_eq!(gout, "Gout");
}
