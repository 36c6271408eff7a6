//! Headless Chrome session with stealth settings.

use super::stealth::{self, Pacer};
use super::{blocked_url_patterns, ResourceType, Session, SessionConfig};
use crate::error::ScrapeError;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::{Network, Page};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A single Chrome process with one tab reused for every navigation.
///
/// The Chrome API is blocking, so every call runs on the blocking pool.
/// The process is killed when the session is closed or dropped.
pub struct BrowserSession {
    browser: Mutex<Option<Browser>>,
    tab: Arc<Tab>,
    pacer: Pacer,
    rotate_user_agent: bool,
}

impl BrowserSession {
    pub async fn open(config: &SessionConfig) -> Result<Self, ScrapeError> {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::launch(&config))
            .await
            .map_err(|e| ScrapeError::SessionStartup(format!("browser launch task: {}", e)))?
    }

    fn launch(config: &SessionConfig) -> Result<Self, ScrapeError> {
        let startup = |e: &dyn std::fmt::Display| ScrapeError::SessionStartup(e.to_string());

        let mut args: Vec<String> = stealth::LAUNCH_ARGS.iter().map(|a| a.to_string()).collect();
        if let Some(proxy) = &config.proxy {
            debug!("Configuring proxy: {}", proxy);
            args.push(format!("--proxy-server={}", proxy));
        }
        if config.block_resources.contains(&ResourceType::Image) {
            args.push("--blink-settings=imagesEnabled=false".to_string());
        }
        let arg_refs: Vec<&OsStr> = args.iter().map(OsStr::new).collect();

        let idle_timeout = Duration::from_secs(config.timeout_secs.max(30) * 4);
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(idle_timeout)
            .args(arg_refs)
            .build()
            .map_err(|e| startup(&e))?;

        let browser = Browser::new(options).map_err(|e| startup(&e))?;
        let tab = browser.new_tab().map_err(|e| startup(&e))?;
        tab.set_default_timeout(Duration::from_secs(config.timeout_secs));

        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: stealth::STEALTH_SCRIPT.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(|e| startup(&e))?;

        if !config.rotate_user_agent {
            tab.set_user_agent(stealth::DEFAULT_USER_AGENT, Some(stealth::ACCEPT_LANGUAGE), None)
                .map_err(|e| startup(&e))?;
        }

        let patterns = blocked_url_patterns(&config.block_resources);
        if !patterns.is_empty() {
            if let Err(e) = tab.call_method(Network::SetBlockedURLs { urls: patterns }) {
                warn!("Resource blocking unavailable: {}", e);
            }
        }

        info!(headless = config.headless, "Chrome session started");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            tab,
            pacer: config.pacer(),
            rotate_user_agent: config.rotate_user_agent,
        })
    }
}

#[async_trait]
impl Session for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<String, ScrapeError> {
        self.pacer.pause().await;

        debug!("Navigating to {}", url);

        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        let user_agent = self.rotate_user_agent.then(stealth::random_user_agent);

        let fetched = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
            if let Some(ua) = user_agent {
                tab.set_user_agent(ua, Some(stealth::ACCEPT_LANGUAGE), None)?;
            }
            tab.navigate_to(&target)?;
            tab.wait_until_navigated()?;
            tab.get_content()
        })
        .await;

        match fetched {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(ScrapeError::PageFetch { url: url.to_string(), reason: e.to_string() }),
            Err(e) => Err(ScrapeError::PageFetch { url: url.to_string(), reason: e.to_string() }),
        }
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        let browser = self
            .browser
            .lock()
            .map_err(|e| ScrapeError::SessionStartup(format!("browser state poisoned: {}", e)))?
            .take();

        if let Some(browser) = browser {
            tokio::task::spawn_blocking(move || drop(browser))
                .await
                .map_err(|e| ScrapeError::SessionStartup(format!("browser shutdown: {}", e)))?;
            info!("Chrome session closed");
        }

        Ok(())
    }
}
