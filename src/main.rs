use std::path::Path;

use anyhow::Result;
use pricewatch::config::{DEFAULT_OUTPUT_PATH, DEFAULT_TARGET_URL};
use pricewatch::report::publish;
use pricewatch::{
    BrowserRetriever, ChromiumLauncher, Config, Dispatcher, HttpRetriever, Orchestrator,
    ScrapeResult,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout().lock();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            // Still leave a result file behind so callers see why nothing ran.
            error!(error = %e, "invalid configuration");
            let result = ScrapeResult::failed("config", DEFAULT_TARGET_URL, 0, e.to_string());
            publish(&result, Path::new(DEFAULT_OUTPUT_PATH), &mut stdout);
            return Ok(());
        }
    };

    eprintln!("Starting scrape of {} …", config.target_url);
    for (i, path) in config.locator_paths.iter().enumerate() {
        info!(n = i + 1, path = %path, "locator path");
    }

    let retriever = Dispatcher::new(
        HttpRetriever::new(),
        BrowserRetriever::new(ChromiumLauncher, config.browser.clone()),
    );
    let orchestrator = Orchestrator::new(config, retriever);
    orchestrator.run_and_report(&mut stdout).await;
    Ok(())
}
