//! Capterra adapter.
//!
//! Product profiles live at `/p/{id}/{slug}/` and their reviews at
//! `/p/{id}/{slug}/reviews/`, paginated with `?page=N`. Review order is
//! whatever sort Capterra applies, so the driver walks to the last page or
//! the page cap.

pub mod parser;
pub mod selectors;

pub use parser::{CapterraReview, Parser};

use crate::error::ScrapeError;
use crate::models::Source;
use crate::pagination::PaginationDriver;
use crate::retry::retry_with_backoff;
use crate::session::Session;
use crate::sites::{matching, ProductRef, ReviewPage, ReviewPages, SiteAdapter};
use async_trait::async_trait;
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.capterra.com";

static PRODUCT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?/p/(\d+)/[^/?#]+)").unwrap());

pub struct CapterraAdapter {
    base_url: String,
    driver: PaginationDriver,
    parser: Parser,
}

impl CapterraAdapter {
    pub fn new(driver: PaginationDriver) -> Self {
        Self::with_base_url(driver, DEFAULT_BASE_URL)
    }

    /// Creates an adapter against a custom origin (for testing).
    pub fn with_base_url(driver: PaginationDriver, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            driver,
            parser: Parser::new(),
        }
    }

    fn search_url(&self, company: &str) -> String {
        format!("{}/search/?query={}", self.base_url, urlencoding::encode(company))
    }
}

/// Splits a profile URL into `(profile_root, product_id)`.
fn product_path(url: &str) -> Option<(String, String)> {
    let caps = PRODUCT_PATH.captures(url)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

impl ReviewPages for CapterraAdapter {
    fn source(&self) -> Source {
        Source::Capterra
    }

    fn first_page_url(&self, product: &ProductRef) -> String {
        format!("{}/reviews/", product.url.trim_end_matches('/'))
    }

    fn check_page(&self, html: &str, url: &str) -> Result<(), ScrapeError> {
        self.parser.check_for_errors(html, url)?;
        self.parser.check_rendered(html, url)
    }

    fn parse_page(&self, html: &str, url: &str) -> ReviewPage {
        self.parser.parse_reviews(html, url)
    }
}

#[async_trait]
impl SiteAdapter for CapterraAdapter {
    async fn resolve_product(
        &self,
        session: &dyn Session,
        company: &str,
    ) -> Result<ProductRef, ScrapeError> {
        let url = self.search_url(company);
        info!("Searching Capterra for \"{}\"", company);

        let search_url = url.as_str();
        let html = retry_with_backoff(self.driver.retry_policy(), || async move {
            let html = session.navigate(search_url).await?;
            self.parser.check_for_errors(&html, search_url)?;
            Ok::<_, ScrapeError>(html)
        })
        .await?;

        let hits = self.parser.parse_search(&html, &url);
        let not_found = || ScrapeError::ProductNotFound { site: Source::Capterra, company: company.to_string() };

        let hit = matching::best_match(company, &hits).ok_or_else(not_found)?;
        let Some((profile, id)) = product_path(&hit.url) else {
            warn!("Capterra hit without product id: {}", hit.url);
            return Err(not_found());
        };

        info!("Resolved Capterra product \"{}\" ({})", hit.name, id);

        Ok(ProductRef { source: Source::Capterra, id, name: hit.name.clone(), url: profile })
    }

    fn driver(&self) -> &PaginationDriver {
        &self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockSession {
        pages: HashMap<String, String>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Session for MockSession {
        async fn navigate(&self, url: &str) -> Result<String, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScrapeError::UnexpectedStatus { status: 404, url: url.to_string() })
        }
    }

    fn adapter() -> CapterraAdapter {
        CapterraAdapter::with_base_url(PaginationDriver::new(10, RetryPolicy::new(1, 0)), "http://capterra.test/")
    }

    fn session_with(search_html: &str) -> MockSession {
        let mut pages = HashMap::new();
        pages.insert("http://capterra.test/search/?query=Acme%20Inc".to_string(), search_html.to_string());
        MockSession { pages, calls: AtomicU32::new(0) }
    }

    #[test]
    fn test_product_path() {
        assert_eq!(
            product_path("https://www.capterra.com/p/123/Acme-CRM/?src=search"),
            Some(("https://www.capterra.com/p/123/Acme-CRM".to_string(), "123".to_string()))
        );
        assert_eq!(product_path("https://www.capterra.com/categories/crm/"), None);
    }

    #[test]
    fn test_first_page_url() {
        let product = ProductRef {
            source: Source::Capterra,
            id: "123".into(),
            name: "Acme".into(),
            url: "https://www.capterra.com/p/123/Acme".into(),
        };
        assert_eq!(adapter().first_page_url(&product), "https://www.capterra.com/p/123/Acme/reviews/");
    }

    #[tokio::test]
    async fn test_resolve_product_picks_matching_hit() {
        let session = session_with(
            r#"<div data-testid="product-card"><a href="/p/9/Zendesk/"><h2>Zendesk</h2></a></div>
               <div data-testid="product-card"><a href="/p/42/Acme/"><h2>Acme</h2></a></div>"#,
        );

        let product = adapter().resolve_product(&session, "Acme Inc").await.unwrap();

        assert_eq!(product.id, "42");
        assert_eq!(product.name, "Acme");
        assert_eq!(product.url, "http://capterra.test/p/42/Acme");
    }

    #[tokio::test]
    async fn test_resolve_product_not_found() {
        let session =
            session_with(r#"<div data-testid="product-card"><a href="/p/9/Zendesk/"><h2>Zendesk</h2></a></div>"#);

        let err = adapter().resolve_product(&session, "Acme Inc").await.unwrap_err();
        assert!(matches!(err, ScrapeError::ProductNotFound { site: Source::Capterra, .. }));
    }

    #[tokio::test]
    async fn test_resolve_product_search_failure_is_not_retried_on_404() {
        let session = MockSession { pages: HashMap::new(), calls: AtomicU32::new(0) };

        let err = adapter().resolve_product(&session, "Acme").await.unwrap_err();
        assert!(matches!(err, ScrapeError::UnexpectedStatus { status: 404, .. }));
        assert_eq!(session.calls.load(Ordering::SeqCst), 1);
    }
}
