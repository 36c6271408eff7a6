//! Data models for reviews, date windows, per-source results and the run document.

use crate::error::ScrapeError;
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review websites with an implemented adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Capterra,
    Trustpilot,
}

impl Source {
    /// Returns every implemented source, in the order `all` expands to.
    pub fn all() -> &'static [Source] {
        &[Source::Capterra, Source::Trustpilot]
    }

    /// Returns the lowercase identifier used on the command line and in output keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Capterra => "capterra",
            Source::Trustpilot => "trustpilot",
        }
    }

    /// Expands a list of source names (`capterra`, `trustpilot`, `all`) into
    /// distinct sources, keeping the order in which they were first named.
    pub fn parse_selection<S: AsRef<str>>(names: &[S]) -> Result<Vec<Source>, ScrapeError> {
        if names.is_empty() {
            return Err(ScrapeError::Configuration("at least one source is required".into()));
        }

        let mut selected = Vec::new();
        for name in names {
            let name = name.as_ref().trim().to_lowercase();
            let expanded: Vec<Source> = if name == "all" {
                Source::all().to_vec()
            } else {
                vec![name.parse().map_err(ScrapeError::Configuration)?]
            };

            for source in expanded {
                if !selected.contains(&source) {
                    selected.push(source);
                }
            }
        }

        Ok(selected)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "capterra" => Ok(Source::Capterra),
            "trustpilot" => Ok(Source::Trustpilot),
            other => Err(format!(
                "Unsupported source '{}'. Supported sources: capterra, trustpilot, all",
                other
            )),
        }
    }
}

/// Review in the unified schema shared by every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Reviewer display name (None when anonymized)
    pub reviewer: Option<String>,
    /// Review headline
    pub title: Option<String>,
    /// Publication date
    pub date: NaiveDate,
    /// Star rating in [1.0, 5.0]
    pub rating: Option<f32>,
    /// Review body
    pub text: String,
    /// Structured pros, only for sources that collect them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pros: Option<String>,
    /// Structured cons, only for sources that collect them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cons: Option<String>,
    /// Site the review was collected from
    pub source: Source,
}

/// Site-neutral raw review as extracted from a page, before normalization.
///
/// Field names mirror [`ReviewRecord`] so a normalized record can be fed back
/// through the normalizer unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub reviewer: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub rating: Option<String>,
    pub text: Option<String>,
    pub pros: Option<String>,
    pub cons: Option<String>,
}

impl From<&ReviewRecord> for RawReview {
    fn from(record: &ReviewRecord) -> Self {
        Self {
            reviewer: record.reviewer.clone(),
            title: record.title.clone(),
            date: Some(record.date.format("%Y-%m-%d").to_string()),
            rating: record.rating.map(|r| r.to_string()),
            text: Some(record.text.clone()),
            pros: record.pros.clone(),
            cons: record.cons.clone(),
        }
    }
}

/// Inclusive publication date window. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ScrapeError> {
        if start > end {
            return Err(ScrapeError::Configuration(format!(
                "start date {} must be before or equal to end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses a range from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, ScrapeError> {
        Self::new(parse_cli_date("start", start)?, parse_cli_date("end", end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if `date` falls inside the window, bounds included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days between the bounds.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Bounds {
            start: NaiveDate,
            end: NaiveDate,
        }

        let bounds = Bounds::deserialize(deserializer)?;
        DateRange::new(bounds.start, bounds.end).map_err(serde::de::Error::custom)
    }
}

fn parse_cli_date(label: &str, value: &str) -> Result<NaiveDate, ScrapeError> {
    let value = value.trim();
    let well_formed = value.len() == 10
        && value.char_indices().all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(ScrapeError::Configuration(format!(
            "{} date must be in YYYY-MM-DD format, got '{}'",
            label, value
        )));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        ScrapeError::Configuration(format!("invalid {} date '{}': {}", label, value, e))
    })
}

/// Earliest start date accepted for a run.
pub const MIN_START_DATE: (i32, u32, u32) = (2010, 1, 1);

/// Longest accepted window, in days.
pub const MAX_SPAN_DAYS: i64 = 3650;

const INVALID_NAME_CHARS: &[char] = &['<', '>', '"', '\'', '{', '}', '[', ']'];

/// Validated inputs of one run. Constructing one performs every check that
/// must pass before any navigation happens.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub company_name: String,
    pub date_range: DateRange,
    pub sources: Vec<Source>,
}

impl RunRequest {
    /// Validates already-typed inputs against today's date.
    pub fn new(
        company_name: &str,
        date_range: DateRange,
        sources: Vec<Source>,
    ) -> Result<Self, ScrapeError> {
        Self::new_at(company_name, date_range, sources, Utc::now().date_naive())
    }

    /// Parses and validates raw CLI-style inputs.
    pub fn parse<S: AsRef<str>>(
        company_name: &str,
        start: &str,
        end: &str,
        sources: &[S],
    ) -> Result<Self, ScrapeError> {
        let date_range = DateRange::parse(start, end)?;
        let sources = Source::parse_selection(sources)?;
        Self::new(company_name, date_range, sources)
    }

    /// Validates inputs relative to a fixed `today`.
    pub fn new_at(
        company_name: &str,
        date_range: DateRange,
        sources: Vec<Source>,
        today: NaiveDate,
    ) -> Result<Self, ScrapeError> {
        let company_name = validate_company_name(company_name)?;

        let (y, m, d) = MIN_START_DATE;
        let min_start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
        if date_range.start() < min_start {
            return Err(ScrapeError::Configuration(format!(
                "start date cannot be before {}",
                min_start
            )));
        }

        let max_end = today.checked_add_months(Months::new(12)).unwrap_or(today + Duration::days(365));
        if date_range.end() > max_end {
            return Err(ScrapeError::Configuration(format!(
                "end date cannot be more than 1 year in the future (max: {})",
                max_end
            )));
        }

        if date_range.span_days() > MAX_SPAN_DAYS {
            return Err(ScrapeError::Configuration("date range cannot exceed 10 years".into()));
        }

        if sources.is_empty() {
            return Err(ScrapeError::Configuration("at least one source is required".into()));
        }

        Ok(Self { company_name, date_range, sources })
    }
}

fn validate_company_name(name: &str) -> Result<String, ScrapeError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();

    if len < 2 {
        return Err(ScrapeError::Configuration(
            "company name must be at least 2 characters long".into(),
        ));
    }
    if len > 100 {
        return Err(ScrapeError::Configuration(
            "company name must be less than 100 characters long".into(),
        ));
    }
    if trimmed.contains(INVALID_NAME_CHARS) {
        return Err(ScrapeError::Configuration("company name contains invalid characters".into()));
    }

    Ok(trimmed.to_string())
}

/// Outcome of one source in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    /// Reviews were kept but harvesting stopped on a failure.
    Partial,
    Failed,
}

/// Category of a contained per-source failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ProductNotFound,
    PageFetch,
    Blocked,
    Timeout,
    Parse,
    Session,
    Configuration,
}

/// Failure descriptor attached to a [`ScrapeResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ScrapeError> for SourceFailure {
    fn from(err: &ScrapeError) -> Self {
        let kind = match err {
            ScrapeError::ProductNotFound { .. } => FailureKind::ProductNotFound,
            ScrapeError::PageFetch { .. } | ScrapeError::UnexpectedStatus { .. } => {
                FailureKind::PageFetch
            }
            ScrapeError::Blocked { .. } => FailureKind::Blocked,
            ScrapeError::Timeout(_) => FailureKind::Timeout,
            ScrapeError::RecordParse(_) => FailureKind::Parse,
            ScrapeError::Configuration(_) => FailureKind::Configuration,
            ScrapeError::SessionStartup(_) => FailureKind::Session,
        };
        Self { kind, message: err.to_string() }
    }
}

/// Per-source outcome bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub source_name: Source,
    pub total_reviews: usize,
    pub reviews: Vec<ReviewRecord>,
    pub status: SourceStatus,
    #[serde(default)]
    pub pages_visited: u32,
    pub error: Option<SourceFailure>,
}

impl ScrapeResult {
    /// A source that produced no reviews because of `err`.
    pub fn failed(source: Source, err: &ScrapeError) -> Self {
        Self {
            source_name: source,
            total_reviews: 0,
            reviews: Vec::new(),
            status: SourceStatus::Failed,
            pages_visited: 0,
            error: Some(err.into()),
        }
    }

    /// Seals the reviews collected for a source.
    ///
    /// A failure with nothing collected is reported as failed, a failure after
    /// some pages were harvested as partial.
    pub fn completed(
        source: Source,
        reviews: Vec<ReviewRecord>,
        pages_visited: u32,
        failure: Option<&ScrapeError>,
    ) -> Self {
        let status = match failure {
            None => SourceStatus::Success,
            Some(_) if pages_visited == 0 => SourceStatus::Failed,
            Some(_) => SourceStatus::Partial,
        };

        Self {
            source_name: source,
            total_reviews: reviews.len(),
            reviews,
            status,
            pages_visited,
            error: failure.map(SourceFailure::from),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SourceStatus::Success
    }
}

/// Final artifact of one run, across all requested sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub company_name: String,
    pub date_range: DateRange,
    pub scraping_timestamp: DateTime<Utc>,
    /// Keyed by source, in the order the sources were requested
    pub sources: IndexMap<Source, ScrapeResult>,
}

impl OutputDocument {
    /// Sum of `total_reviews` over all sources.
    pub fn total_reviews(&self) -> usize {
        self.sources.values().map(|r| r.total_reviews).sum()
    }
}
