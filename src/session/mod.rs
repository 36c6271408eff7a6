//! Page-fetch sessions shared by the site adapters.
//!
//! A run owns exactly one [`Session`]. Two backends exist: a real headless
//! Chrome ([`BrowserSession`]) and a TLS-fingerprint-emulating HTTP client
//! ([`HttpSession`]). Both pace requests and rotate user agents; neither
//! changes what a page means, only how likely it is to be served.

pub mod browser;
pub mod http;
pub mod stealth;

pub use browser::BrowserSession;
pub use http::HttpSession;
pub use stealth::Pacer;

use crate::config::Config;
use crate::error::ScrapeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Trait for page fetching - enables mocking for tests.
#[async_trait]
pub trait Session: Send + Sync {
    /// Navigates to `url` and returns a snapshot of the loaded document as HTML.
    async fn navigate(&self, url: &str) -> Result<String, ScrapeError>;

    /// Releases resources held by the session. Dropping a session releases
    /// them too; this only makes the release explicit and observable.
    async fn close(&self) -> Result<(), ScrapeError> {
        Ok(())
    }
}

/// Which engine fetches pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Browser,
    Http,
}

impl FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "browser" | "chrome" => Ok(SessionBackend::Browser),
            "http" => Ok(SessionBackend::Http),
            _ => Err(format!("Unknown backend: {}. Use: browser, http", s)),
        }
    }
}

impl fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionBackend::Browser => write!(f, "browser"),
            SessionBackend::Http => write!(f, "http"),
        }
    }
}

/// Resource types that can be suppressed to speed up page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Font,
    Media,
    Stylesheet,
}

impl ResourceType {
    /// URL patterns matching this resource type, in Chrome's blocked-URL syntax.
    pub fn url_patterns(&self) -> &'static [&'static str] {
        match self {
            ResourceType::Image => {
                &["*.png*", "*.jpg*", "*.jpeg*", "*.gif*", "*.webp*", "*.svg*", "*.ico*", "*.avif*"]
            }
            ResourceType::Font => &["*.woff*", "*.woff2*", "*.ttf*", "*.otf*", "*.eot*"],
            ResourceType::Media => &["*.mp4*", "*.webm*", "*.mp3*", "*.ogg*", "*.wav*", "*.m3u8*"],
            ResourceType::Stylesheet => &["*.css*"],
        }
    }
}

/// Collects the blocked-URL patterns for a set of resource types.
pub fn blocked_url_patterns(types: &[ResourceType]) -> Vec<String> {
    let mut patterns: Vec<String> = Vec::new();
    for resource in types {
        for pattern in resource.url_patterns() {
            if !patterns.iter().any(|p| p == pattern) {
                patterns.push((*pattern).to_string());
            }
        }
    }
    patterns
}

/// Session settings derived from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub headless: bool,
    pub block_resources: Vec<ResourceType>,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub rotate_user_agent: bool,
    pub proxy: Option<String>,
    pub timeout_secs: u64,
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            backend: config.backend,
            headless: config.headless,
            block_resources: config.block_resources.clone(),
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms,
            rotate_user_agent: config.rotate_user_agent,
            proxy: config.proxy.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl SessionConfig {
    pub fn pacer(&self) -> Pacer {
        Pacer::new(self.min_delay_ms, self.max_delay_ms)
    }
}

/// Opens the session selected by `config.backend`.
///
/// Any failure is a [`ScrapeError::SessionStartup`]; no source can proceed
/// without a session.
pub async fn open(config: &SessionConfig) -> Result<Box<dyn Session>, ScrapeError> {
    info!("Opening {} session", config.backend);

    let session: Box<dyn Session> = match config.backend {
        SessionBackend::Browser => Box::new(BrowserSession::open(config).await?),
        SessionBackend::Http => Box::new(HttpSession::open(config)?),
    };

    Ok(session)
}
