//! HTTP session using wreq for TLS fingerprint emulation.

use super::stealth::{self, Pacer};
use super::{Session, SessionConfig};
use crate::error::ScrapeError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Plain HTTP backend impersonating Chrome at the TLS and header level.
///
/// No JavaScript runs, so pages that render reviews client-side come back
/// without them. Useful behind a proxy, for server-rendered pages and in tests.
pub struct HttpSession {
    client: Client,
    pacer: Pacer,
    rotate_user_agent: bool,
}

impl HttpSession {
    pub fn open(config: &SessionConfig) -> Result<Self, ScrapeError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).map_err(|e| {
                ScrapeError::SessionStartup(format!("invalid proxy '{}': {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ScrapeError::SessionStartup(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            pacer: config.pacer(),
            rotate_user_agent: config.rotate_user_agent,
        })
    }

    fn user_agent(&self) -> &'static str {
        if self.rotate_user_agent {
            stealth::random_user_agent()
        } else {
            stealth::DEFAULT_USER_AGENT
        }
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn navigate(&self, url: &str) -> Result<String, ScrapeError> {
        self.pacer.pause().await;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("User-Agent", self.user_agent())
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8")
            .header("Accept-Language", stealth::ACCEPT_LANGUAGE)
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| ScrapeError::PageFetch { url: url.to_string(), reason: e.to_string() })?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 429 || status == 503 {
            warn!("Rate limited ({}) at {}. Consider using a proxy or increasing the delay.", status, url);
        }

        if !status.is_success() {
            return Err(ScrapeError::UnexpectedStatus { status: status.as_u16(), url: url.to_string() });
        }

        response
            .text()
            .await
            .map_err(|e| ScrapeError::PageFetch { url: url.to_string(), reason: e.to_string() })
    }
}
