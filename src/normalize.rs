//! Mapping of raw extracted reviews into the unified [`ReviewRecord`] schema.

use crate::dates::parse_review_date;
use crate::error::ScrapeError;
use crate::models::{RawReview, ReviewRecord, Source};
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").unwrap());

/// Normalizes raw reviews for one run. Relative dates resolve against the
/// scrape timestamp the normalizer was created with.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    scraped_at: DateTime<Utc>,
}

impl Normalizer {
    pub fn new(scraped_at: DateTime<Utc>) -> Self {
        Self { scraped_at }
    }

    /// Maps a raw review into the unified schema.
    ///
    /// Fails with [`ScrapeError::RecordParse`] when the date or text is missing
    /// or unusable. A bad rating is not fatal and becomes `None`.
    pub fn normalize(&self, raw: RawReview, source: Source) -> Result<ReviewRecord, ScrapeError> {
        let date_text = clean(raw.date)
            .ok_or_else(|| ScrapeError::RecordParse("review has no date".into()))?;
        let date = parse_review_date(&date_text, self.scraped_at).ok_or_else(|| {
            ScrapeError::RecordParse(format!("unparseable review date '{}'", date_text))
        })?;

        let text = clean(raw.text)
            .ok_or_else(|| ScrapeError::RecordParse("review has no text".into()))?;

        Ok(ReviewRecord {
            reviewer: clean(raw.reviewer),
            title: clean(raw.title),
            date,
            rating: raw.rating.as_deref().and_then(normalize_rating),
            text,
            pros: clean(raw.pros),
            cons: clean(raw.cons),
            source,
        })
    }
}

/// Extracts a star rating from text like "4.5", "4,5", "Rated 4 out of 5 stars"
/// or "4.5/5". Values outside [1.0, 5.0] yield `None`.
pub fn normalize_rating(text: &str) -> Option<f32> {
    let number = NUMBER.find(text)?.as_str().replace(',', ".");
    let value: f32 = number.parse().ok()?;

    (1.0..=5.0).contains(&value).then_some(value)
}

/// Collapses whitespace runs and maps blank strings to `None`.
fn clean(value: Option<String>) -> Option<String> {
    let value = value?;
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}
