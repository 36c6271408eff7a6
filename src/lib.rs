//! review-crawler - Collects dated product reviews for a company from
//! Capterra and Trustpilot into one normalized JSON document.
//!
//! Pages are fetched through a stealth headless Chrome session, or a
//! TLS-fingerprint-emulating HTTP client, shared by all site adapters.

pub mod aggregator;
pub mod config;
pub mod dates;
pub mod error;
pub mod format;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod retry;
pub mod session;
pub mod sites;

pub use aggregator::{scrape, Aggregator};
pub use config::Config;
pub use error::ScrapeError;
pub use models::{DateRange, OutputDocument, ReviewRecord, RunRequest, ScrapeResult, Source};
