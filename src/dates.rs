//! Review date parsing and the date-window filter.
//!
//! Review sites print dates in many shapes: ISO timestamps in `datetime`
//! attributes, "March 5, 2024", "05/03/2024", "3 days ago", Unix timestamps.
//! Everything resolves to a calendar date; relative phrases resolve against
//! the scrape timestamp so one run sees a single "now".

use crate::models::{DateRange, ReviewRecord};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::trace;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());

static UNIX_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{13}|\d{10})\s*$").unwrap());

static NOISE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(date of experience:|written on|reviewed on|posted on|updated on|reviewed|posted|updated|on)\s+")
        .unwrap()
});

static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*").unwrap());

/// Absolute formats tried in order; the first that parses wins.
///
/// Two-digit years come first: `%Y` also accepts "24" as year 24.
const ABSOLUTE_FORMATS: &[&str] = &[
    "%B %d, %Y", // January 1, 2023
    "%b %d, %Y", // Jan 1, 2023
    "%d %B %Y",  // 1 January 2023
    "%d %b %Y",  // 1 Jan 2023
    "%m/%d/%y",  // 01/31/23
    "%d/%m/%y",  // 31/01/23
    "%m/%d/%Y",  // 01/31/2023
    "%d/%m/%Y",  // 31/01/2023
    "%m-%d-%Y",  // 01-31-2023
    "%d-%m-%Y",  // 31-01-2023
    "%Y/%m/%d",  // 2023/01/31
];

/// Month-and-day formats that take the scrape year.
const YEARLESS_FORMATS: &[&str] = &["%b %d %Y", "%B %d %Y"];

/// Parses a review date string into a calendar date.
///
/// Returns `None` when no strategy recognizes the text; callers drop the record.
pub fn parse_review_date(text: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parsed = parse_iso(text)
        .or_else(|| parse_relative(text, now))
        .or_else(|| parse_absolute(text, now))
        .or_else(|| parse_timestamp(text));

    if parsed.is_none() {
        trace!("Unrecognized date string: {:?}", text);
    }

    parsed
}

fn parse_iso(text: &str) -> Option<NaiveDate> {
    let caps = ISO_DATE.captures(text)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_absolute(text: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    let cleaned = NOISE_PREFIX.replace(text, "");
    let cleaned = PARENTHESIZED.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();

    for format in ABSOLUTE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return Some(date);
        }
    }

    let with_year = format!("{} {}", cleaned.trim_end_matches(','), now.format("%Y"));
    YEARLESS_FORMATS.iter().find_map(|format| NaiveDate::parse_from_str(&with_year, format).ok())
}

fn parse_timestamp(text: &str) -> Option<NaiveDate> {
    let caps = UNIX_TIMESTAMP.captures(text)?;
    let raw: i64 = caps[1].parse().ok()?;
    let secs = if caps[1].len() == 13 { raw / 1000 } else { raw };
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    fn from_token(token: &str) -> Option<Self> {
        let unit = match token {
            "second" | "seconds" | "sec" | "secs" => Unit::Second,
            "minute" | "minutes" | "min" | "mins" => Unit::Minute,
            "hour" | "hours" | "hr" | "hrs" => Unit::Hour,
            "day" | "days" => Unit::Day,
            "week" | "weeks" => Unit::Week,
            "month" | "months" => Unit::Month,
            "year" | "years" => Unit::Year,
            _ => return None,
        };
        Some(unit)
    }

    /// Length of `count` units. Months and years are fixed 30/365-day spans.
    fn span(self, count: i64) -> Option<TimeDelta> {
        match self {
            Unit::Second => TimeDelta::try_seconds(count),
            Unit::Minute => TimeDelta::try_minutes(count),
            Unit::Hour => TimeDelta::try_hours(count),
            Unit::Day => TimeDelta::try_days(count),
            Unit::Week => TimeDelta::try_weeks(count),
            Unit::Month => TimeDelta::try_days(count.checked_mul(30)?),
            Unit::Year => TimeDelta::try_days(count.checked_mul(365)?),
        }
    }
}

/// Recognizer states for "<count> <unit> ago" phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phrase {
    Idle,
    Count(i64),
    Span(i64, Unit),
    Ago(i64, Unit),
}

impl Phrase {
    fn step(self, token: &str) -> Phrase {
        match (self, token) {
            (Phrase::Span(count, unit), "ago") => Phrase::Ago(count, unit),
            (_, "a" | "an" | "one") => Phrase::Count(1),
            (Phrase::Count(count), _) => match Unit::from_token(token) {
                Some(unit) => Phrase::Span(count, unit),
                None => Phrase::start(token),
            },
            _ => Phrase::start(token),
        }
    }

    fn start(token: &str) -> Phrase {
        token.parse().map(Phrase::Count).unwrap_or(Phrase::Idle)
    }
}

fn parse_relative(text: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    let lower = text.to_lowercase();
    let today = now.date_naive();

    if lower.contains("just now") || lower.contains("today") {
        return Some(today);
    }
    if lower.contains("yesterday") {
        return today.pred_opt();
    }

    let mut state = Phrase::Idle;
    for token in lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
        state = state.step(token);
        if let Phrase::Ago(count, unit) = state {
            let moment = now.checked_sub_signed(unit.span(count)?)?;
            return Some(moment.date_naive());
        }
    }

    None
}

/// Keeps the reviews dated inside `range`, preserving their order.
pub fn filter_by_date(reviews: Vec<ReviewRecord>, range: &DateRange) -> Vec<ReviewRecord> {
    reviews.into_iter().filter(|review| range.contains(review.date)).collect()
}
