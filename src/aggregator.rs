//! Runs the selected site adapters and assembles the output document.

use crate::config::Config;
use crate::dates::filter_by_date;
use crate::error::ScrapeError;
use crate::models::{OutputDocument, RunRequest, ScrapeResult, Source};
use crate::normalize::Normalizer;
use crate::pagination::{HarvestContext, PaginationDriver};
use crate::session::{self, Session, SessionConfig};
use crate::sites::{CapterraAdapter, SiteAdapter, TrustpilotAdapter};
use chrono::Utc;
use indexmap::IndexMap;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Owns one adapter per supported site.
pub struct Aggregator {
    adapters: Vec<Box<dyn SiteAdapter>>,
    run_timeout: Option<Duration>,
}

impl Aggregator {
    /// Registers the Capterra and Trustpilot adapters configured from `config`.
    pub fn new(config: &Config) -> Self {
        let driver = PaginationDriver::new(config.max_pages, config.retry_policy());
        Self::with_adapters(
            vec![
                Box::new(CapterraAdapter::new(driver.clone())),
                Box::new(TrustpilotAdapter::new(driver)),
            ],
            config.run_timeout(),
        )
    }

    /// Uses the given adapters instead of the default ones (for testing).
    pub fn with_adapters(adapters: Vec<Box<dyn SiteAdapter>>, run_timeout: Option<Duration>) -> Self {
        Self { adapters, run_timeout }
    }

    fn adapter(&self, source: Source) -> Option<&dyn SiteAdapter> {
        self.adapters.iter().find(|a| a.source() == source).map(|a| &**a)
    }

    /// Runs every requested source in request order over one session.
    ///
    /// Never fails: each source's failure is recorded in its [`ScrapeResult`].
    pub async fn run(&self, session: &dyn Session, request: &RunRequest) -> OutputDocument {
        let scraped_at = Utc::now();
        let deadline = self.run_timeout.map(|budget| Instant::now() + budget);
        let ctx = HarvestContext::new(request.date_range, Normalizer::new(scraped_at), deadline);

        info!(
            "Scraping reviews for \"{}\" from {} to {} ({} sources)",
            request.company_name,
            request.date_range.start(),
            request.date_range.end(),
            request.sources.len()
        );

        let mut sources = IndexMap::new();
        for &source in &request.sources {
            let result = if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!("{}: skipped, run deadline already reached", source);
                ScrapeResult::failed(source, &ScrapeError::Timeout(source))
            } else {
                self.run_source(session, source, &request.company_name, &ctx).await
            };

            match &result.error {
                None => info!("{}: {} reviews in range", source, result.total_reviews),
                Some(failure) => warn!(
                    "{}: {} reviews in range, {:?}: {}",
                    source, result.total_reviews, failure.kind, failure.message
                ),
            }
            sources.insert(source, result);
        }

        OutputDocument {
            company_name: request.company_name.clone(),
            date_range: request.date_range,
            scraping_timestamp: scraped_at,
            sources,
        }
    }

    async fn run_source(
        &self,
        session: &dyn Session,
        source: Source,
        company: &str,
        ctx: &HarvestContext,
    ) -> ScrapeResult {
        let Some(adapter) = self.adapter(source) else {
            let err = ScrapeError::Configuration(format!("no adapter registered for {}", source));
            return ScrapeResult::failed(source, &err);
        };

        let product = match adapter.resolve_product(session, company).await {
            Ok(product) => product,
            Err(err) => return ScrapeResult::failed(source, &err),
        };

        let harvest = adapter.fetch_reviews(session, &product, ctx).await;
        let harvested = harvest.records.len();
        let reviews = filter_by_date(harvest.records, &ctx.range);
        info!(
            "{}: kept {} of {} harvested reviews ({} unparseable)",
            source,
            reviews.len(),
            harvested,
            harvest.dropped
        );

        ScrapeResult::completed(source, reviews, harvest.pages_visited, harvest.failure.as_ref())
    }
}

/// Opens a session, runs every requested source and releases the session.
///
/// Only configuration and session start-up failures are returned as errors.
pub async fn scrape(config: &Config, request: &RunRequest) -> Result<OutputDocument, ScrapeError> {
    config.validate()?;

    let session = session::open(&SessionConfig::from(config)).await?;
    let document = Aggregator::new(config).run(session.as_ref(), request).await;

    if let Err(e) = session.close().await {
        error!("Failed to close session cleanly: {}", e);
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, FailureKind, RawReview, SourceStatus};
    use crate::retry::RetryPolicy;
    use crate::sites::{ProductRef, ReviewPage, ReviewPages};
    use async_trait::async_trait;

    struct NullSession;

    #[async_trait]
    impl Session for NullSession {
        async fn navigate(&self, url: &str) -> Result<String, ScrapeError> {
            Ok(url.to_string())
        }
    }

    /// Echoes the URL after a fixed delay.
    struct SlowSession(Duration);

    #[async_trait]
    impl Session for SlowSession {
        async fn navigate(&self, url: &str) -> Result<String, ScrapeError> {
            tokio::time::sleep(self.0).await;
            Ok(url.to_string())
        }
    }

    /// Adapter serving pages of reviews dated `dates`, or failing resolution.
    struct StubAdapter {
        source: Source,
        dates: Vec<&'static str>,
        missing: bool,
        /// Every page links to another page
        endless: bool,
        driver: PaginationDriver,
    }

    impl StubAdapter {
        fn new(source: Source, dates: Vec<&'static str>) -> Self {
            Self {
                source,
                dates,
                missing: false,
                endless: false,
                driver: PaginationDriver::new(5, RetryPolicy::new(0, 0)),
            }
        }
    }

    impl ReviewPages for StubAdapter {
        fn source(&self) -> Source {
            self.source
        }

        fn first_page_url(&self, product: &ProductRef) -> String {
            product.url.clone()
        }

        fn check_page(&self, _html: &str, _url: &str) -> Result<(), ScrapeError> {
            Ok(())
        }

        fn parse_page(&self, _html: &str, url: &str) -> ReviewPage {
            let reviews = self
                .dates
                .iter()
                .map(|d| RawReview {
                    date: Some(d.to_string()),
                    text: Some("fine".to_string()),
                    ..Default::default()
                })
                .collect();
            let next_url = self.endless.then(|| format!("{}+", url));
            ReviewPage { reviews, next_url }
        }
    }

    #[async_trait]
    impl SiteAdapter for StubAdapter {
        async fn resolve_product(
            &self,
            _session: &dyn Session,
            company: &str,
        ) -> Result<ProductRef, ScrapeError> {
            if self.missing {
                return Err(ScrapeError::ProductNotFound { site: self.source, company: company.into() });
            }
            Ok(ProductRef {
                source: self.source,
                id: "1".into(),
                name: company.into(),
                url: format!("stub://{}", self.source),
            })
        }

        fn driver(&self) -> &PaginationDriver {
            &self.driver
        }
    }

    fn request(sources: &[&str]) -> RunRequest {
        RunRequest::parse("Acme", "2024-01-01", "2024-12-31", sources).unwrap()
    }

    #[tokio::test]
    async fn test_dates_are_filtered_per_source() {
        let capterra = StubAdapter::new(Source::Capterra, vec!["2024-03-01", "2023-12-31", "2025-01-01"]);
        let aggregator = Aggregator::with_adapters(vec![Box::new(capterra)], None);

        let doc = aggregator.run(&NullSession, &request(&["capterra"])).await;

        let result = &doc.sources[&Source::Capterra];
        assert_eq!(result.total_reviews, 1);
        assert_eq!(result.status, SourceStatus::Success);
        assert_eq!(doc.date_range, DateRange::parse("2024-01-01", "2024-12-31").unwrap());
    }

    #[tokio::test]
    async fn test_failed_source_does_not_stop_others() {
        let mut capterra = StubAdapter::new(Source::Capterra, vec![]);
        capterra.missing = true;
        let trustpilot = StubAdapter::new(Source::Trustpilot, vec!["2024-05-01", "2024-05-02"]);
        let aggregator =
            Aggregator::with_adapters(vec![Box::new(capterra), Box::new(trustpilot)], None);

        let doc = aggregator.run(&NullSession, &request(&["capterra", "trustpilot"])).await;

        assert_eq!(doc.sources[&Source::Capterra].total_reviews, 0);
        assert!(doc.sources[&Source::Capterra].error.is_some());
        assert_eq!(doc.sources[&Source::Trustpilot].total_reviews, 2);
        assert_eq!(doc.total_reviews(), 2);
    }

    #[tokio::test]
    async fn test_sources_keep_request_order() {
        let aggregator = Aggregator::with_adapters(
            vec![
                Box::new(StubAdapter::new(Source::Capterra, vec![])),
                Box::new(StubAdapter::new(Source::Trustpilot, vec![])),
            ],
            None,
        );

        let doc = aggregator.run(&NullSession, &request(&["trustpilot", "capterra"])).await;

        let order: Vec<Source> = doc.sources.keys().copied().collect();
        assert_eq!(order, vec![Source::Trustpilot, Source::Capterra]);
    }

    #[tokio::test]
    async fn test_exhausted_budget_skips_sources() {
        let aggregator = Aggregator::with_adapters(
            vec![Box::new(StubAdapter::new(Source::Capterra, vec!["2024-03-01"]))],
            Some(Duration::ZERO),
        );

        let doc = aggregator.run(&NullSession, &request(&["capterra"])).await;

        let result = &doc.sources[&Source::Capterra];
        assert_eq!(result.status, SourceStatus::Failed);
        assert_eq!(result.error.as_ref().unwrap().kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_budget_running_out_mid_source_keeps_reviews() {
        let mut capterra = StubAdapter::new(Source::Capterra, vec!["2024-03-01", "2024-04-01"]);
        capterra.endless = true;
        let trustpilot = StubAdapter::new(Source::Trustpilot, vec!["2024-05-01"]);
        let aggregator = Aggregator::with_adapters(
            vec![Box::new(capterra), Box::new(trustpilot)],
            Some(Duration::from_millis(20)),
        );

        let doc = aggregator
            .run(&SlowSession(Duration::from_millis(80)), &request(&["capterra", "trustpilot"]))
            .await;

        let capterra = &doc.sources[&Source::Capterra];
        assert_eq!(capterra.status, SourceStatus::Partial);
        assert_eq!(capterra.pages_visited, 1);
        assert_eq!(capterra.total_reviews, 2);
        assert_eq!(capterra.error.as_ref().unwrap().kind, FailureKind::Timeout);

        let trustpilot = &doc.sources[&Source::Trustpilot];
        assert_eq!(trustpilot.status, SourceStatus::Failed);
        assert_eq!(trustpilot.total_reviews, 0);
        assert_eq!(trustpilot.error.as_ref().unwrap().kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_missing_adapter_is_contained() {
        let aggregator = Aggregator::with_adapters(vec![], None);

        let doc = aggregator.run(&NullSession, &request(&["all"])).await;

        assert_eq!(doc.sources.len(), 2);
        assert!(doc.sources.values().all(|r| r.status == SourceStatus::Failed));
        assert!(doc
            .sources
            .values()
            .all(|r| r.error.as_ref().unwrap().kind == FailureKind::Configuration));
    }

    #[tokio::test]
    async fn test_scrape_rejects_invalid_config_before_session() {
        let config = Config { min_delay_ms: 10, max_delay_ms: 1, ..Config::default() };
        let err = scrape(&config, &request(&["capterra"])).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Configuration(_)));
    }
}
