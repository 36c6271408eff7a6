//! Full run over the HTTP backend against a local mock of Trustpilot.

use review_crawler::models::SourceStatus;
use review_crawler::pagination::PaginationDriver;
use review_crawler::retry::RetryPolicy;
use review_crawler::session::{HttpSession, Session, SessionBackend, SessionConfig};
use review_crawler::sites::TrustpilotAdapter;
use review_crawler::{Aggregator, RunRequest, Source};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_config() -> SessionConfig {
    SessionConfig {
        backend: SessionBackend::Http,
        headless: true,
        block_resources: Vec::new(),
        min_delay_ms: 0,
        max_delay_ms: 0,
        rotate_user_agent: true,
        proxy: None,
        timeout_secs: 5,
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_trustpilot_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("query", "Acme"))
        .respond_with(html(include_str!("fixtures/trustpilot_search.html")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/review/acme.com"))
        .and(query_param("sort", "recency"))
        .respond_with(html(include_str!("fixtures/trustpilot_reviews.html")))
        .expect(1)
        .mount(&server)
        .await;

    let session = HttpSession::open(&session_config()).unwrap();
    let adapter = TrustpilotAdapter::with_base_url(
        PaginationDriver::new(10, RetryPolicy::new(0, 0)),
        server.uri(),
    );
    let aggregator = Aggregator::with_adapters(vec![Box::new(adapter)], None);
    let request = RunRequest::parse("Acme", "2024-01-01", "2024-12-31", &["trustpilot"]).unwrap();

    let doc = aggregator.run(&session, &request).await;
    session.close().await.unwrap();

    let result = &doc.sources[&Source::Trustpilot];
    assert_eq!(result.status, SourceStatus::Success);
    assert_eq!(result.total_reviews, 5);
    assert_eq!(result.reviews[0].reviewer.as_deref(), Some("Hannah W."));
    assert_eq!(result.reviews[0].date.to_string(), "2024-12-02");
}

#[tokio::test]
async fn test_rate_limited_search_is_retried_then_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let session = HttpSession::open(&session_config()).unwrap();
    let adapter = TrustpilotAdapter::with_base_url(
        PaginationDriver::new(10, RetryPolicy::new(2, 0)),
        server.uri(),
    );
    let aggregator = Aggregator::with_adapters(vec![Box::new(adapter)], None);
    let request = RunRequest::parse("Acme", "2024-01-01", "2024-12-31", &["trustpilot"]).unwrap();

    let doc = aggregator.run(&session, &request).await;

    let result = &doc.sources[&Source::Trustpilot];
    assert_eq!(result.status, SourceStatus::Failed);
    assert_eq!(result.total_reviews, 0);
    assert!(result.error.as_ref().unwrap().message.contains("429"));
}
