use std::io::Write;

use tracing::{info, warn};

use crate::chain::{ChainOutcome, Retriever, exhaustion_message, run_chain};
use crate::config::Config;
use crate::report::publish;
use crate::result::{Payload, ScrapeResult};

/// One full scrape cycle: browser first, the HTTP rotation only when the
/// browser produced nothing usable.
pub struct Orchestrator<R> {
    config: Config,
    retriever: R,
}

impl<R: Retriever> Orchestrator<R> {
    pub fn new(config: Config, retriever: R) -> Self {
        Self { config, retriever }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Never fails; every problem ends up in the returned result.
    pub async fn run(&self) -> ScrapeResult {
        let url = &self.config.target_url;
        let paths = &self.config.locator_paths;
        let mut attempts = 0;
        let mut browser_result = None;
        let mut browser_failure = None;

        if let Some(strategy) = &self.config.browser_strategy {
            info!(url = %url, "starting browser stage");
            match run_chain(
                &self.retriever,
                std::slice::from_ref(strategy),
                url,
                paths,
                self.config.pacing,
            )
            .await
            {
                ChainOutcome::Succeeded { result } if has_content(&result) => return result,
                ChainOutcome::Succeeded { result } => {
                    warn!("browser rendered the page but nothing could be extracted");
                    attempts += result.attempts;
                    browser_result = Some(result);
                }
                ChainOutcome::Exhausted {
                    attempts: n,
                    last_strategy,
                    last_error,
                } => {
                    if let Some(e) = &last_error {
                        warn!(error = %e, "browser stage failed");
                    }
                    attempts += n;
                    browser_failure = last_strategy.zip(last_error);
                }
            }
        }

        info!(url = %url, strategies = self.config.http_strategies.len(), "starting http stage");
        let outcome = run_chain(
            &self.retriever,
            &self.config.http_strategies,
            url,
            paths,
            self.config.pacing,
        )
        .await;

        match (outcome, browser_result) {
            (ChainOutcome::Succeeded { mut result }, _) => {
                result.attempts += attempts;
                result
            }
            (ChainOutcome::Exhausted { attempts: n, .. }, Some(mut rendered)) => {
                rendered.attempts = attempts + n;
                rendered
            }
            (
                ChainOutcome::Exhausted {
                    attempts: n,
                    last_strategy,
                    last_error,
                },
                None,
            ) => {
                let total = attempts + n;
                let (method, error) = match (last_strategy.zip(last_error), browser_failure) {
                    (Some((method, e)), Some((_, browser_error))) => {
                        let error = format!(
                            "browser: {browser_error}; {}",
                            exhaustion_message(total, &method, Some(&e))
                        );
                        (method, error)
                    }
                    (Some((method, e)), None) | (None, Some((method, e))) => {
                        let error = exhaustion_message(total, &method, Some(&e));
                        (method, error)
                    }
                    (None, None) => ("none".to_string(), exhaustion_message(total, "none", None)),
                };
                ScrapeResult::failed(method, url.as_str(), total, error)
            }
        }
    }

    /// [`Self::run`], then persist the result and print the summary to `out`.
    /// Neither step can turn a finished run into a failure.
    pub async fn run_and_report(&self, out: &mut dyn Write) -> ScrapeResult {
        let result = self.run().await;
        publish(&result, &self.config.output_path, out);
        result
    }
}

/// A rendered page that yielded neither a located element nor any fallback
/// field counts as "no content resolved".
fn has_content(result: &ScrapeResult) -> bool {
    match &result.payload {
        Payload::Located { .. } => true,
        Payload::Fallback { product_info } => !product_info.is_empty(),
        Payload::Failed { .. } => false,
    }
}
