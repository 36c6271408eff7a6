//! Page-by-page harvesting of one product's reviews.
//!
//! The driver is an explicit state machine:
//!
//! ```text
//! FetchingPage -> Extracting -> HasNextPage -> FetchingPage ...
//!       |              |              |
//!       +--------------+--------------+--> Terminal(StopReason)
//! ```
//!
//! Retries happen inside `FetchingPage`; every terminal state keeps the
//! records already collected.

use crate::error::ScrapeError;
use crate::models::{DateRange, ReviewRecord};
use crate::normalize::Normalizer;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::session::Session;
use crate::sites::{ProductRef, ReviewPages};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Why pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last page had no next-page link.
    NoNextPage,
    /// A page kept failing after the retry budget was spent.
    FetchFailed,
    /// The page cap was reached with more pages still linked.
    PageCap,
    /// A date-descending page reached past the start of the range.
    BeforeRange,
    /// The run's wall-clock budget ran out.
    Deadline,
}

/// Per-run inputs shared by every harvest.
#[derive(Debug, Clone)]
pub struct HarvestContext {
    pub range: DateRange,
    pub normalizer: Normalizer,
    pub deadline: Option<Instant>,
}

impl HarvestContext {
    pub fn new(range: DateRange, normalizer: Normalizer, deadline: Option<Instant>) -> Self {
        Self { range, normalizer, deadline }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Outcome of one harvest: records in page-visit order, not yet date-filtered.
#[derive(Debug)]
pub struct Harvest {
    pub records: Vec<ReviewRecord>,
    pub pages_visited: u32,
    /// Records dropped because they could not be normalized
    pub dropped: usize,
    pub stop: StopReason,
    /// Set when the harvest ended on a failure (retries exhausted or deadline).
    pub failure: Option<ScrapeError>,
}

#[derive(Debug)]
enum PageState {
    FetchingPage { url: String, page: u32, attempt: u32 },
    Extracting { url: String, page: u32, html: String },
    HasNextPage { url: String, page: u32 },
    Terminal(StopReason),
}

/// Walks the review pages of one product. Each adapter owns one.
#[derive(Debug, Clone)]
pub struct PaginationDriver {
    max_pages: u32,
    retry: RetryPolicy,
}

impl PaginationDriver {
    pub fn new(max_pages: u32, retry: RetryPolicy) -> Self {
        Self { max_pages: max_pages.max(1), retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Harvests every page reachable from the product's first reviews page
    /// until a [`StopReason`] triggers.
    pub async fn run<P>(
        &self,
        session: &dyn Session,
        pages: &P,
        product: &ProductRef,
        ctx: &HarvestContext,
    ) -> Harvest
    where
        P: ReviewPages + ?Sized,
    {
        let source = pages.source();
        let mut records: Vec<ReviewRecord> = Vec::new();
        let mut pages_visited = 0u32;
        let mut dropped = 0usize;
        let mut failure: Option<ScrapeError> = None;

        let mut state = PageState::FetchingPage {
            url: pages.first_page_url(product),
            page: 1,
            attempt: 0,
        };

        let stop = loop {
            state = match state {
                PageState::FetchingPage { url, page, attempt } => {
                    if ctx.expired() {
                        warn!("{}: run deadline reached before page {}", source, page);
                        failure = Some(ScrapeError::Timeout(source));
                        PageState::Terminal(StopReason::Deadline)
                    } else {
                        debug!("{}: fetching page {} (attempt {}): {}", source, page, attempt + 1, url);
                        let fetched = match session.navigate(&url).await {
                            Ok(html) => pages.check_page(&html, &url).map(|_| html),
                            Err(e) => Err(e),
                        };

                        match fetched {
                            Ok(html) => PageState::Extracting { url, page, html },
                            Err(err) => match self.retry.next(attempt, &err) {
                                RetryDecision::Retry { attempt, delay } => {
                                    warn!(
                                        attempt,
                                        max_retries = self.retry.max_retries,
                                        delay_ms = delay.as_millis() as u64,
                                        error = %err,
                                        "{}: page {} failed, retrying",
                                        source,
                                        page
                                    );
                                    tokio::time::sleep(delay).await;
                                    PageState::FetchingPage { url, page, attempt }
                                }
                                RetryDecision::GiveUp => {
                                    warn!("{}: giving up on page {}: {}", source, page, err);
                                    failure = Some(err);
                                    PageState::Terminal(StopReason::FetchFailed)
                                }
                            },
                        }
                    }
                }

                PageState::Extracting { url, page, html } => {
                    let parsed = pages.parse_page(&html, &url);
                    pages_visited += 1;

                    let mut reached_before_range = false;
                    let found = parsed.reviews.len();
                    for raw in parsed.reviews {
                        match ctx.normalizer.normalize(raw, source) {
                            Ok(record) => {
                                trace!("{}: {} {:?}", source, record.date, record.title);
                                reached_before_range |= record.date < ctx.range.start();
                                records.push(record);
                            }
                            Err(e) => {
                                dropped += 1;
                                warn!("{}: dropping review on page {}: {}", source, page, e);
                            }
                        }
                    }
                    debug!("{}: page {} yielded {} reviews", source, page, found);

                    if pages.date_descending() && reached_before_range {
                        PageState::Terminal(StopReason::BeforeRange)
                    } else {
                        match parsed.next_url {
                            Some(next) if next != url => PageState::HasNextPage { url: next, page },
                            _ => PageState::Terminal(StopReason::NoNextPage),
                        }
                    }
                }

                PageState::HasNextPage { url, page } => {
                    if page >= self.max_pages {
                        info!("{}: page cap of {} reached", source, self.max_pages);
                        PageState::Terminal(StopReason::PageCap)
                    } else {
                        PageState::FetchingPage { url, page: page + 1, attempt: 0 }
                    }
                }

                PageState::Terminal(reason) => break reason,
            };
        };

        info!(
            "{}: harvested {} reviews from {} pages ({:?}, {} dropped)",
            source,
            records.len(),
            pages_visited,
            stop,
            dropped
        );

        Harvest { records, pages_visited, dropped, stop, failure }
    }
}
