//! Headless-browser retrieval.
//!
//! The browser is abstracted behind [`BrowserLauncher`] / [`BrowserSession`]
//! so the retrieval sequence (navigate, wait, dwell, scroll, read) and the
//! session teardown guarantee can be exercised without Chromium installed.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

use crate::chain::{Retrieved, Retriever};
use crate::error::ScrapeError;
use crate::identity::IdentityProfile;
use crate::strategy::RetrievalStrategy;

/// Runs before any page script so `navigator.webdriver` reads as undefined.
const MASK_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Well-known install locations, checked after `PATH`.
const CHROME_LOCATIONS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub chrome_path: Option<PathBuf>,
    /// Upper bound on waiting for `body` after navigation.
    pub ready_timeout: Duration,
    /// Pause after the page is ready, before scrolling.
    pub dwell: Duration,
    /// Pause after scrolling, before reading the DOM.
    pub settle: Duration,
    pub scroll_y: u32,
    pub window: (u32, u32),
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            ready_timeout: Duration::from_secs(15),
            dwell: Duration::from_secs(3),
            settle: Duration::from_secs(2),
            scroll_y: 500,
            window: (1920, 1080),
        }
    }
}

/// One live browser instance owned by a single retrieval.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &Url) -> Result<(), ScrapeError>;
    /// Resolves once `selector` matches an element in the current page.
    async fn wait_for(&mut self, selector: &str) -> Result<(), ScrapeError>;
    async fn scroll_to(&mut self, y: u32) -> Result<(), ScrapeError>;
    /// Serialized live DOM.
    async fn content(&mut self) -> Result<String, ScrapeError>;
    /// Ends the session and its process. Safe to call more than once.
    async fn close(&mut self);
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(
        &self,
        identity: &IdentityProfile,
        options: &BrowserOptions,
    ) -> Result<Box<dyn BrowserSession>, ScrapeError>;
}

pub struct BrowserRetriever<L> {
    launcher: L,
    options: BrowserOptions,
}

impl<L: BrowserLauncher> BrowserRetriever<L> {
    pub fn new(launcher: L, options: BrowserOptions) -> Self {
        Self { launcher, options }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        strategy: &RetrievalStrategy,
        url: &Url,
    ) -> Result<Retrieved, ScrapeError> {
        timeout(strategy.timeout, session.navigate(url))
            .await
            .map_err(|_| ScrapeError::Timeout {
                what: "navigation",
                secs: strategy.timeout.as_secs(),
            })??;

        timeout(self.options.ready_timeout, session.wait_for("body"))
            .await
            .map_err(|_| ScrapeError::Timeout {
                what: "document body",
                secs: self.options.ready_timeout.as_secs(),
            })??;

        sleep(self.options.dwell).await;
        session.scroll_to(self.options.scroll_y).await?;
        sleep(self.options.settle).await;

        let html = session.content().await?;
        info!(strategy = %strategy.name, len = html.len(), "rendered page");
        Ok(Retrieved {
            html,
            final_url: url.clone(),
        })
    }
}

#[async_trait]
impl<L: BrowserLauncher> Retriever for BrowserRetriever<L> {
    async fn retrieve(
        &self,
        strategy: &RetrievalStrategy,
        url: &Url,
    ) -> Result<Retrieved, ScrapeError> {
        let mut session = self.launcher.launch(&strategy.identity, &self.options).await?;
        let outcome = self.drive(session.as_mut(), strategy, url).await;
        session.close().await;
        debug!(strategy = %strategy.name, "browser session closed");
        outcome
    }
}

/// Finds a Chrome/Chromium binary: `PATH` first, then the usual install
/// locations.
pub fn find_chromium() -> Option<PathBuf> {
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }
    CHROME_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Launches a fresh headless Chromium per session via chromiumoxide.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(
        &self,
        identity: &IdentityProfile,
        options: &BrowserOptions,
    ) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        let chrome = options
            .chrome_path
            .clone()
            .or_else(find_chromium)
            .ok_or_else(|| {
                ScrapeError::BrowserLaunch(
                    "no Chrome/Chromium binary found; set SCRAPER_CHROME_PATH".to_string(),
                )
            })?;
        let language = identity
            .accept_language
            .split(',')
            .next()
            .unwrap_or("en-US")
            .to_string();

        let config = BrowserConfig::builder()
            .chrome_executable(chrome)
            .window_size(options.window.0, options.window.1)
            .arg("--headless=new")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--disable-plugins")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", identity.user_agent))
            .arg(format!("--lang={language}"))
            .build()
            .map_err(ScrapeError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::BrowserLaunch(e.to_string()))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let mut session = ChromiumSession {
            browser: Some(browser),
            page: None,
            events,
        };
        if let Err(e) = session.open_page().await {
            session.close().await;
            return Err(e);
        }
        Ok(Box::new(session))
    }
}

pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    events: JoinHandle<()>,
}

impl ChromiumSession {
    async fn open_page(&mut self) -> Result<(), ScrapeError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("session already closed".to_string()))?;
        let page = browser.new_page("about:blank").await?;
        let mask = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(MASK_WEBDRIVER)
            .build()
            .map_err(ScrapeError::Browser)?;
        page.evaluate_on_new_document(mask).await?;
        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&Page, ScrapeError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("no open page".to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &Url) -> Result<(), ScrapeError> {
        self.page()?.goto(url.as_str()).await?;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str) -> Result<(), ScrapeError> {
        let page = self.page()?;
        while page.find_element(selector).await.is_err() {
            sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn scroll_to(&mut self, y: u32) -> Result<(), ScrapeError> {
        self.page()?
            .evaluate(format!("window.scrollTo(0, {y});"))
            .await?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, ScrapeError> {
        Ok(self.page()?.content().await?)
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser did not close cleanly");
            }
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "failed to reap browser process");
            }
        }
        self.events.abort();
    }
}
