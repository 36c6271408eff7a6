//! Anti-detection helpers: user-agent pool, launch flags, stealth script and
//! request pacing.

use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Realistic desktop user agents rotated per navigation.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// User agent used when rotation is disabled.
pub const DEFAULT_USER_AGENT: &str = USER_AGENTS[0];

/// Accept-Language sent with every request.
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Picks a user agent from the pool.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())]
}

/// Chrome flags that hide the usual automation fingerprints.
pub const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-default-apps",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--metrics-recording-only",
    "--mute-audio",
    "--no-pings",
    "--lang=en-US",
];

/// Injected before any page script runs on every new document.
pub const STEALTH_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined, configurable: true });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai' },
            { name: 'Native Client', filename: 'internal-nacl-plugin' }
        ]
    });
    Object.defineProperty(navigator, 'hardwareConcurrency', { get: () => 8 });
    Object.defineProperty(navigator, 'deviceMemory', { get: () => 8 });
    window.chrome = window.chrome || { runtime: {} };
    const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
    if (originalQuery) {
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : originalQuery(parameters)
        );
    }
    const getParameter = WebGLRenderingContext.prototype.getParameter;
    WebGLRenderingContext.prototype.getParameter = function(parameter) {
        if (parameter === 37445) return 'Intel Inc.';
        if (parameter === 37446) return 'Intel Iris OpenGL Engine';
        return getParameter.call(this, parameter);
    };
"#;

/// Randomized pause between requests to mimic human browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    min_ms: u64,
    max_ms: u64,
}

impl Pacer {
    /// Creates a pacer; swapped bounds are reordered.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms: min_ms.min(max_ms), max_ms: min_ms.max(max_ms) }
    }

    /// Draws the next delay from `[min_ms, max_ms]`.
    pub fn next_delay(&self) -> Duration {
        if self.max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }

    /// Sleeps for a freshly drawn delay.
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        debug!("Delaying {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}
