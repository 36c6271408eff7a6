//! Site adapters: per-site product resolution and review page parsing.

pub mod capterra;
pub mod matching;
pub mod trustpilot;

pub use capterra::CapterraAdapter;
pub use trustpilot::TrustpilotAdapter;

use crate::error::ScrapeError;
use crate::models::{RawReview, Source};
use crate::pagination::{Harvest, HarvestContext, PaginationDriver};
use crate::session::Session;
use async_trait::async_trait;
use url::Url;

/// A product page resolved on one site. Only meaningful to the adapter that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub source: Source,
    /// Site-native identifier (Capterra product id, Trustpilot domain)
    pub id: String,
    /// Display name as listed by the site
    pub name: String,
    pub url: String,
}

/// One entry of a site search result list, in site order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub name: String,
    pub url: String,
}

/// Reviews extracted from a single page plus the link to the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<RawReview>,
    pub next_url: Option<String>,
}

/// Page-level knowledge of a site, used by the [`PaginationDriver`].
pub trait ReviewPages: Send + Sync {
    fn source(&self) -> Source;

    /// First reviews page for a resolved product.
    fn first_page_url(&self, product: &ProductRef) -> String;

    /// Fails with [`ScrapeError::Blocked`] when `html` is an anti-bot
    /// challenge instead of the requested page, and with a transient
    /// [`ScrapeError::PageFetch`] when the review list has not rendered.
    fn check_page(&self, html: &str, url: &str) -> Result<(), ScrapeError>;

    /// Extracts the site-native review records and the next-page link.
    fn parse_page(&self, html: &str, url: &str) -> ReviewPage;

    /// Whether review pages are ordered newest first. Enables stopping
    /// once a page reaches past the start of the date range.
    fn date_descending(&self) -> bool {
        false
    }
}

/// Full adapter contract: resolve a company to a product, then harvest its
/// reviews through the shared session.
#[async_trait]
pub trait SiteAdapter: ReviewPages {
    async fn resolve_product(
        &self,
        session: &dyn Session,
        company: &str,
    ) -> Result<ProductRef, ScrapeError>;

    fn driver(&self) -> &PaginationDriver;

    async fn fetch_reviews(
        &self,
        session: &dyn Session,
        product: &ProductRef,
        ctx: &HarvestContext,
    ) -> Harvest {
        self.driver().run(session, self, product, ctx).await
    }
}

/// Resolves `href` against the URL of the page it was found on.
///
/// Returns `None` when either side is not a valid URL reference.
pub fn resolve_href(page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href.trim()).ok().map(String::from)
}

/// Collapses whitespace in the text content of an element.
pub(crate) fn element_text(element: scraper::ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_href_absolute() {
        assert_eq!(
            resolve_href("https://www.capterra.com/p/1/x/", "https://other.com/a").as_deref(),
            Some("https://other.com/a")
        );
    }

    #[test]
    fn test_resolve_href_root_relative() {
        assert_eq!(
            resolve_href("https://www.trustpilot.com/review/acme.com?page=2", "/review/acme.com?page=3")
                .as_deref(),
            Some("https://www.trustpilot.com/review/acme.com?page=3")
        );
        assert_eq!(
            resolve_href("http://127.0.0.1:8080/search?query=a", "/p/12/acme/").as_deref(),
            Some("http://127.0.0.1:8080/p/12/acme/")
        );
    }

    #[test]
    fn test_resolve_href_query_only() {
        assert_eq!(
            resolve_href("https://www.capterra.com/p/1/acme/reviews/?page=1", "?page=2").as_deref(),
            Some("https://www.capterra.com/p/1/acme/reviews/?page=2")
        );
        assert_eq!(
            resolve_href("https://www.trustpilot.com?x=1", "?page=2").as_deref(),
            Some("https://www.trustpilot.com/?page=2")
        );
    }

    #[test]
    fn test_resolve_href_path_relative() {
        assert_eq!(
            resolve_href("https://example.com/a/b/page", "next").as_deref(),
            Some("https://example.com/a/b/next")
        );
        assert_eq!(resolve_href("https://example.com", "next").as_deref(), Some("https://example.com/next"));
        assert_eq!(
            resolve_href("https://example.com/x", "//cdn.example.com/y").as_deref(),
            Some("https://cdn.example.com/y")
        );
    }

    #[test]
    fn test_resolve_href_removes_dot_segments() {
        assert_eq!(
            resolve_href("https://www.capterra.com/p/1/acme/reviews/", "../reviews/?page=2").as_deref(),
            Some("https://www.capterra.com/p/1/acme/reviews/?page=2")
        );
        assert_eq!(
            resolve_href("https://www.capterra.com/p/1/acme/reviews/", "./?page=3").as_deref(),
            Some("https://www.capterra.com/p/1/acme/reviews/?page=3")
        );
        assert_eq!(
            resolve_href("https://www.trustpilot.com/review/acme.com", "/review/./acme.com?page=2").as_deref(),
            Some("https://www.trustpilot.com/review/acme.com?page=2")
        );
    }

    #[test]
    fn test_resolve_href_invalid_base() {
        assert_eq!(resolve_href("not a url", "/p/1/acme/"), None);
    }
}
