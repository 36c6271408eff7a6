//! Error taxonomy for a scraping run.
//!
//! Only [`ScrapeError::Configuration`] and [`ScrapeError::SessionStartup`]
//! abort a run. Everything else is contained at source or record level and
//! ends up inside the output document.

use crate::models::Source;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("browser session could not be started: {0}")]
    SessionStartup(String),

    #[error("no matching product for \"{company}\" on {site}")]
    ProductNotFound { site: Source, company: String },

    #[error("failed to fetch {url}: {reason}")]
    PageFetch { url: String, reason: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("anti-bot challenge served for {url}")]
    Blocked { url: String },

    #[error("could not normalize review record: {0}")]
    RecordParse(String),

    #[error("run time budget exhausted before {0} completed")]
    Timeout(Source),
}

impl ScrapeError {
    /// Returns `true` for failures worth retrying after a backoff delay:
    /// network/render failures, anti-bot challenges, 429 and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::PageFetch { .. } | ScrapeError::Blocked { .. } => true,
            ScrapeError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` for the two failures that end the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::Configuration(_) | ScrapeError::SessionStartup(_))
    }
}
