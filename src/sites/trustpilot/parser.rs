//! HTML parser for Trustpilot search results and review pages.

use super::selectors::{errors, reviews, search};
use crate::error::ScrapeError;
use crate::models::RawReview;
use crate::sites::{element_text, resolve_href, ReviewPage, SearchHit};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// A review as Trustpilot lays it out. Trustpilot has no pros/cons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrustpilotReview {
    pub consumer_name: Option<String>,
    pub headline: Option<String>,
    pub published: Option<String>,
    pub stars: Option<String>,
    pub body: Option<String>,
}

impl From<TrustpilotReview> for RawReview {
    fn from(review: TrustpilotReview) -> Self {
        RawReview {
            reviewer: review.consumer_name,
            title: review.headline,
            date: review.published,
            rating: review.stars,
            text: review.body,
            pros: None,
            cons: None,
        }
    }
}

/// Parser for Trustpilot HTML pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Fails with [`ScrapeError::Blocked`] on a Cloudflare or captcha page.
    pub fn check_for_errors(&self, html: &str, url: &str) -> Result<(), ScrapeError> {
        let document = Html::parse_document(html);

        let challenged = document.select(&errors::CHALLENGE).next().is_some()
            || document
                .select(&errors::PAGE_TITLE)
                .next()
                .map(|t| element_text(t).to_lowercase())
                .is_some_and(|title| {
                    title.contains("just a moment") || title.contains("attention required")
                });

        if challenged {
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

    /// Extracts business hits from a search page, in page order.
    pub fn parse_search(&self, html: &str, page_url: &str) -> Vec<SearchHit> {
        let document = Html::parse_document(html);

        let hits: Vec<SearchHit> = document
            .select(&search::RESULT)
            .filter_map(|card| {
                let href = card.value().attr("href")?;
                let name = card
                    .select(&search::NAME)
                    .next()
                    .map(element_text)
                    .unwrap_or_else(|| element_text(card));
                if name.is_empty() {
                    return None;
                }
                Some(SearchHit { name, url: resolve_href(page_url, href)? })
            })
            .collect();

        debug!("Parsed {} Trustpilot search hits", hits.len());
        hits
    }

    /// Extracts reviews and the next-page link from a review page.
    pub fn parse_reviews(&self, html: &str, page_url: &str) -> ReviewPage {
        let document = Html::parse_document(html);

        let reviews: Vec<RawReview> = document
            .select(&reviews::CARD)
            .map(|card| parse_review_card(card).into())
            .collect();

        let next_url = document
            .select(&reviews::NEXT_PAGE)
            .filter(|a| a.value().attr("aria-disabled") != Some("true"))
            .find_map(|a| a.value().attr("href"))
            .and_then(|href| resolve_href(page_url, href));

        debug!("Parsed {} Trustpilot reviews (next: {:?})", reviews.len(), next_url);

        ReviewPage { reviews, next_url }
    }
}

fn parse_review_card(card: ElementRef<'_>) -> TrustpilotReview {
    let stars = card
        .select(&reviews::RATING)
        .next()
        .and_then(|el| el.value().attr("data-service-review-rating"))
        .or_else(|| {
            card.select(&reviews::RATING_IMAGE).next().and_then(|img| img.value().attr("alt"))
        })
        .map(str::to_string);

    TrustpilotReview {
        consumer_name: first_text(card, &reviews::REVIEWER),
        headline: first_text(card, &reviews::TITLE),
        published: card.select(&reviews::DATE).next().map(|el| {
            el.value().attr("datetime").map(str::to_string).unwrap_or_else(|| element_text(el))
        }),
        stars,
        body: first_text(card, &reviews::TEXT),
    }
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector).next().map(element_text).filter(|t| !t.is_empty())
}
