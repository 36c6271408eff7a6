//! HTML parser for Capterra search results and review pages.

use super::selectors::{errors, reviews, search};
use crate::error::ScrapeError;
use crate::models::RawReview;
use crate::sites::{element_text, resolve_href, ReviewPage, SearchHit};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

/// A review as Capterra lays it out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapterraReview {
    pub reviewer: Option<String>,
    pub title: Option<String>,
    pub written_on: Option<String>,
    pub overall_rating: Option<String>,
    pub comments: Option<String>,
    pub pros: Option<String>,
    pub cons: Option<String>,
}

impl From<CapterraReview> for RawReview {
    fn from(review: CapterraReview) -> Self {
        RawReview {
            reviewer: review.reviewer,
            title: review.title,
            date: review.written_on,
            rating: review.overall_rating,
            text: review.comments,
            pros: review.pros,
            cons: review.cons,
        }
    }
}

/// Parser for Capterra HTML pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Fails with [`ScrapeError::Blocked`] on a captcha or bot-check page.
    pub fn check_for_errors(&self, html: &str, url: &str) -> Result<(), ScrapeError> {
        let document = Html::parse_document(html);

        if document.select(&errors::CHALLENGE).next().is_some() {
            return Err(ScrapeError::Blocked { url: url.to_string() });
        }

        let title = document
            .select(&errors::PAGE_TITLE)
            .next()
            .map(|t| element_text(t).to_lowercase())
            .unwrap_or_default();
        if title.contains("just a moment")
            || title.contains("access denied")
            || title.contains("access to this page has been denied")
        {
            return Err(ScrapeError::Blocked { url: url.to_string() });
        }

        Ok(())
    }

    /// Fails with a transient [`ScrapeError::PageFetch`] when the review list
    /// has not rendered: no review cards and no empty-state notice.
    pub fn check_rendered(&self, html: &str, url: &str) -> Result<(), ScrapeError> {
        let document = Html::parse_document(html);

        let rendered = document.select(&reviews::CARD).next().is_some()
            || document.select(&reviews::EMPTY).next().is_some();
        if !rendered {
            return Err(ScrapeError::PageFetch {
                url: url.to_string(),
                reason: "review list not rendered".to_string(),
            });
        }

        Ok(())
    }

    /// Extracts product hits from a search page, in page order.
    pub fn parse_search(&self, html: &str, page_url: &str) -> Vec<SearchHit> {
        let document = Html::parse_document(html);
        let mut hits = Vec::new();

        for card in document.select(&search::RESULT) {
            let Some(link) = card.select(&search::LINK).next() else {
                trace!("Skipping product card without profile link");
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };

            let name = card
                .select(&search::NAME)
                .next()
                .map(element_text)
                .unwrap_or_else(|| element_text(link));
            if name.is_empty() {
                continue;
            }

            if let Some(url) = resolve_href(page_url, href) {
                hits.push(SearchHit { name, url });
            }
        }

        debug!("Parsed {} Capterra search hits", hits.len());
        hits
    }

    /// Extracts reviews and the next-page link from a reviews page.
    pub fn parse_reviews(&self, html: &str, page_url: &str) -> ReviewPage {
        let document = Html::parse_document(html);

        let reviews: Vec<RawReview> = document
            .select(&reviews::CARD)
            .map(|card| self.parse_review_card(card).into())
            .collect();

        let next_url = document
            .select(&reviews::NEXT_PAGE)
            .find_map(|a| a.value().attr("href"))
            .and_then(|href| resolve_href(page_url, href));

        debug!("Parsed {} Capterra reviews (next: {:?})", reviews.len(), next_url);

        ReviewPage { reviews, next_url }
    }

    fn parse_review_card(&self, card: ElementRef<'_>) -> CapterraReview {
        CapterraReview {
            reviewer: first_text(card, &reviews::REVIEWER),
            title: first_text(card, &reviews::TITLE),
            written_on: card.select(&reviews::DATE).next().map(|el| {
                el.value()
                    .attr("datetime")
                    .map(str::to_string)
                    .unwrap_or_else(|| element_text(el))
            }),
            overall_rating: card.select(&reviews::RATING).next().map(|el| {
                let value = el.value();
                value
                    .attr("data-rating")
                    .or_else(|| value.attr("aria-label"))
                    .map(str::to_string)
                    .unwrap_or_else(|| element_text(el))
            }),
            comments: first_text(card, &reviews::TEXT),
            pros: first_text(card, &reviews::PROS).map(|t| strip_label(&t, "Pros")),
            cons: first_text(card, &reviews::CONS).map(|t| strip_label(&t, "Cons")),
        }
    }
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector).next().map(element_text).filter(|t| !t.is_empty())
}

/// Removes a leading "Pros"/"Pros:" heading from a section's text.
fn strip_label(text: &str, label: &str) -> String {
    match (text.get(..label.len()), text.get(label.len()..)) {
        (Some(head), Some(rest))
            if head.eq_ignore_ascii_case(label)
                && !rest.starts_with(|c: char| c.is_alphanumeric()) =>
        {
            rest.trim_start_matches(':').trim().to_string()
        }
        _ => text.to_string(),
    }
}
