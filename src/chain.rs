//! Runs retrieval strategies in priority order and turns the first page that
//! comes back into a [`ScrapeResult`].

use std::time::Duration;

use async_trait::async_trait;
use rand::{Rng, rng};
use scraper::Html;
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

use crate::error::ScrapeError;
use crate::extract::{element_text, extract_product_info, is_blank};
use crate::locator::{LocatorPath, locate};
use crate::price::parse_price;
use crate::result::{Payload, ScrapeResult};
use crate::strategy::{RenderMode, RetrievalStrategy};

/// A page as handed back by a retrieval capability.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub html: String,
    pub final_url: Url,
}

/// Fetches or renders a page for one strategy. Every failure is reported as
/// a [`ScrapeError`]; the runner decides what happens next.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        strategy: &RetrievalStrategy,
        url: &Url,
    ) -> Result<Retrieved, ScrapeError>;
}

/// Routes each strategy to the capability for its [`RenderMode`].
pub struct Dispatcher {
    http: Box<dyn Retriever>,
    browser: Box<dyn Retriever>,
}

impl Dispatcher {
    pub fn new(http: impl Retriever + 'static, browser: impl Retriever + 'static) -> Self {
        Self {
            http: Box::new(http),
            browser: Box::new(browser),
        }
    }
}

#[async_trait]
impl Retriever for Dispatcher {
    async fn retrieve(
        &self,
        strategy: &RetrievalStrategy,
        url: &Url,
    ) -> Result<Retrieved, ScrapeError> {
        match strategy.mode {
            RenderMode::Http => self.http.retrieve(strategy, url).await,
            RenderMode::Browser => self.browser.retrieve(strategy, url).await,
        }
    }
}

/// Jittered pause between consecutive attempts, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Pacing {
    pub const NONE: Self = Self { min_ms: 0, max_ms: 0 };

    fn delay(self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng().random_range(self.min_ms..=self.max_ms))
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_ms: 600,
            max_ms: 1500,
        }
    }
}

/// How a chain ended. `attempts` counts strategies actually invoked.
#[derive(Debug)]
pub enum ChainOutcome {
    Succeeded { result: ScrapeResult },
    Exhausted {
        attempts: usize,
        last_strategy: Option<String>,
        last_error: Option<ScrapeError>,
    },
}

impl ChainOutcome {
    pub fn attempts(&self) -> usize {
        match self {
            Self::Succeeded { result } => result.attempts,
            Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Collapses the outcome into a result; exhaustion becomes a failed
    /// result naming the attempt count and the last error.
    pub fn into_result(self, url: &Url) -> ScrapeResult {
        match self {
            Self::Succeeded { result } => result,
            Self::Exhausted {
                attempts,
                last_strategy,
                last_error,
            } => {
                let method = last_strategy.unwrap_or_else(|| "none".to_string());
                let error = exhaustion_message(attempts, &method, last_error.as_ref());
                ScrapeResult::failed(method, url.as_str(), attempts, error)
            }
        }
    }
}

/// Error text for a run where nothing was retrieved.
pub fn exhaustion_message(attempts: usize, method: &str, last_error: Option<&ScrapeError>) -> String {
    match last_error {
        Some(e) => format!("all {attempts} retrieval strategies failed; last error from {method}: {e}"),
        None => "no retrieval strategies configured".to_string(),
    }
}

/// Tries `strategies` in order and stops at the first one that retrieves a
/// non-blank page. Whatever that page yields (located price or fallback
/// fields) is the result; extraction never sends the chain onwards.
pub async fn run_chain(
    retriever: &dyn Retriever,
    strategies: &[RetrievalStrategy],
    url: &Url,
    paths: &[LocatorPath],
    pacing: Pacing,
) -> ChainOutcome {
    let mut attempts = 0;
    let mut last_strategy = None;
    let mut last_error = None;

    for strategy in strategies {
        if attempts > 0 {
            sleep(pacing.delay()).await;
        }
        attempts += 1;
        info!(
            strategy = %strategy.name,
            mode = %strategy.mode,
            attempt = attempts,
            of = strategies.len(),
            "trying retrieval strategy"
        );

        let outcome = match retriever.retrieve(strategy, url).await {
            Ok(page) => extract(&page, &strategy.name, attempts, url, paths),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                info!(strategy = %strategy.name, method = %result.method, "strategy succeeded");
                return ChainOutcome::Succeeded { result };
            }
            Err(e) => {
                warn!(strategy = %strategy.name, error = %e, "strategy failed");
                last_strategy = Some(strategy.name.clone());
                last_error = Some(e);
            }
        }
    }

    ChainOutcome::Exhausted {
        attempts,
        last_strategy,
        last_error,
    }
}

/// Locator first, field mining second. Only a blank page is an error.
fn extract(
    page: &Retrieved,
    strategy: &str,
    attempts: usize,
    url: &Url,
    paths: &[LocatorPath],
) -> Result<ScrapeResult, ScrapeError> {
    let doc = Html::parse_document(&page.html);
    if is_blank(&doc) {
        return Err(ScrapeError::EmptyDocument {
            url: page.final_url.to_string(),
        });
    }

    if let Some(found) = locate(&doc, paths) {
        let content = element_text(found.element);
        let used_path = paths[found.path_index].as_str().to_string();
        info!(path = %used_path, text = %content, "locator path resolved");
        let payload = Payload::Located {
            price_info: parse_price(&content),
            html: found.element.html(),
            content,
            used_path,
        };
        return Ok(ScrapeResult::succeeded(strategy, url.as_str(), attempts, payload));
    }

    info!(strategy, "no locator path resolved, extracting fields");
    let product_info = extract_product_info(&doc, &page.final_url);
    Ok(ScrapeResult::succeeded(
        format!("{strategy}_fallback"),
        url.as_str(),
        attempts,
        Payload::Fallback { product_info },
    ))
}
