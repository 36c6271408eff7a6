//! End-to-end runs over recorded pages served by an in-memory session.

use async_trait::async_trait;
use review_crawler::models::{FailureKind, SourceStatus};
use review_crawler::pagination::PaginationDriver;
use review_crawler::retry::RetryPolicy;
use review_crawler::session::Session;
use review_crawler::sites::{CapterraAdapter, SiteAdapter, TrustpilotAdapter};
use review_crawler::{Aggregator, DateRange, RunRequest, ScrapeError, Source};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

const CAPTERRA: &str = "http://capterra.test";
const TRUSTPILOT: &str = "http://trustpilot.test";

/// Serves fixed HTML per URL; anything else is a 404.
struct FixtureSession {
    pages: HashMap<String, &'static str>,
    calls: AtomicU32,
}

impl FixtureSession {
    fn new(pages: &[(&str, &'static str)]) -> Self {
        Self {
            pages: pages.iter().map(|(url, html)| (url.to_string(), *html)).collect(),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for FixtureSession {
    async fn navigate(&self, url: &str) -> Result<String, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .map(|html| html.to_string())
            .ok_or_else(|| ScrapeError::UnexpectedStatus { status: 404, url: url.to_string() })
    }
}

fn driver(max_pages: u32) -> PaginationDriver {
    PaginationDriver::new(max_pages, RetryPolicy::new(1, 0))
}

fn capterra_pages() -> Vec<(&'static str, &'static str)> {
    vec![
        ("http://capterra.test/search/?query=Acme", include_str!("fixtures/capterra_search.html")),
        ("http://capterra.test/p/4242/Acme/reviews/", include_str!("fixtures/capterra_reviews_p1.html")),
        (
            "http://capterra.test/p/4242/Acme/reviews/?page=2",
            include_str!("fixtures/capterra_reviews_p2.html"),
        ),
        (
            "http://capterra.test/p/4242/Acme/reviews/?page=3",
            include_str!("fixtures/capterra_reviews_p3.html"),
        ),
    ]
}

fn trustpilot_pages() -> Vec<(&'static str, &'static str)> {
    vec![
        ("http://trustpilot.test/search?query=Acme", include_str!("fixtures/trustpilot_search.html")),
        (
            "http://trustpilot.test/review/acme.com?sort=recency",
            include_str!("fixtures/trustpilot_reviews.html"),
        ),
    ]
}

fn request(sources: &[&str]) -> RunRequest {
    RunRequest::parse("Acme", "2024-01-01", "2024-12-31", sources).unwrap()
}

#[tokio::test]
async fn test_capterra_three_pages_drops_unparseable_date() {
    let session = FixtureSession::new(&capterra_pages());
    let aggregator = Aggregator::with_adapters(
        vec![Box::new(CapterraAdapter::with_base_url(driver(50), CAPTERRA))],
        None,
    );

    let doc = aggregator.run(&session, &request(&["capterra"])).await;

    let result = &doc.sources[&Source::Capterra];
    assert_eq!(result.status, SourceStatus::Success);
    assert_eq!(result.total_reviews, 4);
    assert_eq!(result.pages_visited, 3);
    assert!(result.error.is_none());

    let range = DateRange::parse("2024-01-01", "2024-12-31").unwrap();
    assert!(result.reviews.iter().all(|r| range.contains(r.date)));
    assert!(result.reviews.iter().all(|r| r.source == Source::Capterra));
    assert!(!result.reviews.iter().any(|r| r.title.as_deref() == Some("Date got lost")));

    let titles: Vec<&str> = result.reviews.iter().filter_map(|r| r.title.as_deref()).collect();
    assert_eq!(
        titles,
        vec![
            "Our pipeline finally makes sense",
            "Good value",
            "Solid support team",
            "Steep start, worth it"
        ]
    );

    let first = &result.reviews[0];
    assert_eq!(first.rating, Some(5.0));
    assert_eq!(first.pros.as_deref(), Some("Clean pipeline views."));
    assert_eq!(first.cons.as_deref(), Some("Email templates are limited."));
}

#[tokio::test]
async fn test_product_not_found_does_not_block_other_sources() {
    // Capterra search page lists nothing named Acme
    let mut pages = trustpilot_pages();
    pages.push(("http://capterra.test/search/?query=Acme", "<html><body><main></main></body></html>"));
    let session = FixtureSession::new(&pages);

    let adapters: Vec<Box<dyn SiteAdapter>> = vec![
        Box::new(CapterraAdapter::with_base_url(driver(50), CAPTERRA)),
        Box::new(TrustpilotAdapter::with_base_url(driver(50), TRUSTPILOT)),
    ];
    let aggregator = Aggregator::with_adapters(adapters, None);

    let doc = aggregator.run(&session, &request(&["capterra", "trustpilot"])).await;

    let capterra = &doc.sources[&Source::Capterra];
    assert_eq!(capterra.total_reviews, 0);
    assert_eq!(capterra.status, SourceStatus::Failed);
    assert_eq!(capterra.error.as_ref().unwrap().kind, FailureKind::ProductNotFound);

    let trustpilot = &doc.sources[&Source::Trustpilot];
    assert_eq!(trustpilot.total_reviews, 5);
    assert_eq!(trustpilot.status, SourceStatus::Success);
    assert!(trustpilot.reviews.iter().all(|r| r.pros.is_none() && r.cons.is_none()));

    let keys: Vec<Source> = doc.sources.keys().copied().collect();
    assert_eq!(keys, vec![Source::Capterra, Source::Trustpilot]);
}

#[tokio::test]
async fn test_trustpilot_stops_at_first_page_past_range() {
    let session = FixtureSession::new(&trustpilot_pages());
    let aggregator = Aggregator::with_adapters(
        vec![Box::new(TrustpilotAdapter::with_base_url(driver(50), TRUSTPILOT))],
        None,
    );

    let doc = aggregator.run(&session, &request(&["trustpilot"])).await;

    // Search page + one review page; page 2 is never requested
    assert_eq!(session.calls(), 2);
    let result = &doc.sources[&Source::Trustpilot];
    assert_eq!(result.pages_visited, 1);
    assert_eq!(result.total_reviews, 5);
    assert_eq!(result.reviews[3].rating, Some(3.0));
}

#[tokio::test]
async fn test_failed_page_keeps_earlier_pages() {
    // Page 3 is missing, so the session answers 404 for it
    let pages: Vec<_> = capterra_pages().into_iter().take(3).collect();
    let session = FixtureSession::new(&pages);
    let aggregator = Aggregator::with_adapters(
        vec![Box::new(CapterraAdapter::with_base_url(driver(50), CAPTERRA))],
        None,
    );

    let doc = aggregator.run(&session, &request(&["capterra"])).await;

    let result = &doc.sources[&Source::Capterra];
    assert_eq!(result.status, SourceStatus::Partial);
    assert_eq!(result.total_reviews, 3);
    assert_eq!(result.pages_visited, 2);
    assert_eq!(result.error.as_ref().unwrap().kind, FailureKind::PageFetch);
}

#[tokio::test]
async fn test_page_cap_bounds_capterra() {
    let session = FixtureSession::new(&capterra_pages());
    let aggregator = Aggregator::with_adapters(
        vec![Box::new(CapterraAdapter::with_base_url(driver(2), CAPTERRA))],
        None,
    );

    let doc = aggregator.run(&session, &request(&["capterra"])).await;

    let result = &doc.sources[&Source::Capterra];
    assert_eq!(result.pages_visited, 2);
    assert_eq!(result.total_reviews, 3);
    assert_eq!(result.status, SourceStatus::Success);
}

#[tokio::test]
async fn test_invalid_range_fails_before_any_navigation() {
    let session = FixtureSession::new(&capterra_pages());

    let err = RunRequest::parse("Acme", "2024-12-31", "2024-01-01", &["capterra"]).unwrap_err();

    assert!(matches!(err, ScrapeError::Configuration(_)));
    assert!(err.is_fatal());
    assert_eq!(session.calls(), 0);
}

#[tokio::test]
async fn test_output_document_serializes_to_contract_shape() {
    let session = FixtureSession::new(&capterra_pages());
    let aggregator = Aggregator::with_adapters(
        vec![Box::new(CapterraAdapter::with_base_url(driver(50), CAPTERRA))],
        None,
    );

    let doc = aggregator.run(&session, &request(&["capterra"])).await;
    let json = serde_json::to_value(&doc).unwrap();

    assert_eq!(json["company_name"], "Acme");
    assert_eq!(json["date_range"]["start"], "2024-01-01");
    assert_eq!(json["date_range"]["end"], "2024-12-31");
    assert!(json["scraping_timestamp"].is_string());

    let review = &json["sources"]["capterra"]["reviews"][1];
    assert_eq!(review["date"], "2024-08-03");
    assert_eq!(review["source"], "capterra");
    assert!(review.get("cons").is_none());
}
