//! Trustpilot adapter.
//!
//! Businesses are keyed by domain (`/review/{domain}`). Reviews are requested
//! with `sort=recency`, so pages run newest first and harvesting can stop at
//! the first page that reaches past the start of the date range.

pub mod parser;
pub mod selectors;

pub use parser::{Parser, TrustpilotReview};

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

pub const DEFAULT_BASE_URL: &str = "https://www.trustpilot.com";

static BUSINESS_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/review/([^/?#]+)").unwrap());

pub struct TrustpilotAdapter {
    base_url: String,
    driver: PaginationDriver,
    parser: Parser,
}

impl TrustpilotAdapter {
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
        format!("{}/search?query={}", self.base_url, urlencoding::encode(company))
    }
}

fn business_domain(url: &str) -> Option<String> {
    BUSINESS_PATH.captures(url).map(|caps| caps[1].to_string())
}

impl ReviewPages for TrustpilotAdapter {
    fn source(&self) -> Source {
        Source::Trustpilot
    }

    fn first_page_url(&self, product: &ProductRef) -> String {
        format!("{}/review/{}?sort=recency", self.base_url, product.id)
    }

    fn check_page(&self, html: &str, url: &str) -> Result<(), ScrapeError> {
        self.parser.check_for_errors(html, url)?;
        self.parser.check_rendered(html, url)
    }

    fn parse_page(&self, html: &str, url: &str) -> ReviewPage {
        self.parser.parse_reviews(html, url)
    }

    fn date_descending(&self) -> bool {
        true
    }
}

#[async_trait]
impl SiteAdapter for TrustpilotAdapter {
    async fn resolve_product(
        &self,
        session: &dyn Session,
        company: &str,
    ) -> Result<ProductRef, ScrapeError> {
        let url = self.search_url(company);
        info!("Searching Trustpilot for \"{}\"", company);

        let search_url = url.as_str();
        let html = retry_with_backoff(self.driver.retry_policy(), || async move {
            let html = session.navigate(search_url).await?;
            self.parser.check_for_errors(&html, search_url)?;
            Ok::<_, ScrapeError>(html)
        })
        .await?;

        let hits = self.parser.parse_search(&html, &url);
        let not_found =
            || ScrapeError::ProductNotFound { site: Source::Trustpilot, company: company.to_string() };

        let hit = matching::best_match(company, &hits).ok_or_else(not_found)?;
        let Some(domain) = business_domain(&hit.url) else {
            warn!("Trustpilot hit without business domain: {}", hit.url);
            return Err(not_found());
        };

        info!("Resolved Trustpilot business \"{}\" ({})", hit.name, domain);

        Ok(ProductRef {
            source: Source::Trustpilot,
            url: format!("{}/review/{}", self.base_url, domain),
            id: domain,
            name: hit.name.clone(),
        })
    }

    fn driver(&self) -> &PaginationDriver {
        &self.driver
    }
}
