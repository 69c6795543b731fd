use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::browser::BrowserOptions;
use crate::chain::Pacing;
use crate::error::ConfigError;
use crate::identity::IdentityProfile;
use crate::locator::{LocatorPath, default_paths};
use crate::strategy::RetrievalStrategy;

pub const DEFAULT_TARGET_URL: &str = "https://www.kkday.com/th/product/158964?qs=JR+TOKYO+Wide+Pass";
pub const DEFAULT_OUTPUT_PATH: &str = "scrape_results.json";

/// Everything one run needs, fixed at startup and handed to the
/// [`crate::Orchestrator`].
#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: Url,
    pub output_path: PathBuf,
    /// Tried first. `None` skips the browser stage entirely.
    pub browser_strategy: Option<RetrievalStrategy>,
    pub http_strategies: Vec<RetrievalStrategy>,
    pub browser: BrowserOptions,
    pub locator_paths: Vec<LocatorPath>,
    pub pacing: Pacing,
}

impl Default for Config {
    fn default() -> Self {
        let http_timeout = Duration::from_secs(30);
        Self {
            target_url: Url::parse(DEFAULT_TARGET_URL).expect("default target url"),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            browser_strategy: Some(RetrievalStrategy::browser(
                IdentityProfile::chrome_macos(),
                http_timeout,
            )),
            http_strategies: RetrievalStrategy::http_rotation(http_timeout),
            browser: BrowserOptions::default(),
            locator_paths: default_paths(),
            pacing: Pacing::default(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Reads the process environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        build_config(|key| std::env::var(key))
    }
}

/// Builds a [`Config`] from an env-style lookup. Every variable is optional;
/// unset ones keep the [`Config::default`] value.
pub fn build_config<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };
    let get = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());
    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match get(var) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| invalid(var, e.to_string())),
            None => Ok(default),
        }
    };
    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match get(var).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => Err(invalid(var, format!("expected a boolean, got \"{v}\""))),
        }
    };

    let parse_secs = |var: &str, default: u64| -> Result<Duration, ConfigError> {
        match parse_u64(var, default)? {
            0 => Err(invalid(var, "must be at least 1 second".to_string())),
            secs => Ok(Duration::from_secs(secs)),
        }
    };

    let defaults = Config::default();

    let target_url = match get("SCRAPER_TARGET_URL") {
        Some(raw) => Url::parse(raw.trim()).map_err(|e| invalid("SCRAPER_TARGET_URL", e.to_string()))?,
        None => defaults.target_url,
    };
    let output_path = get("SCRAPER_OUTPUT_PATH").map_or(defaults.output_path, PathBuf::from);

    let http_timeout = parse_secs("SCRAPER_HTTP_TIMEOUT_SECS", 30)?;
    let browser_enabled = parse_bool("SCRAPER_BROWSER_ENABLED", true)?;

    let browser = BrowserOptions {
        chrome_path: get("SCRAPER_CHROME_PATH").map(PathBuf::from),
        ready_timeout: parse_secs("SCRAPER_WAIT_TIMEOUT_SECS", 15)?,
        dwell: Duration::from_millis(parse_u64("SCRAPER_DWELL_MS", 3000)?),
        settle: Duration::from_millis(parse_u64("SCRAPER_SETTLE_MS", 2000)?),
        ..defaults.browser
    };

    let pacing = Pacing {
        min_ms: parse_u64("SCRAPER_PAUSE_MIN_MS", defaults.pacing.min_ms)?,
        max_ms: parse_u64("SCRAPER_PAUSE_MAX_MS", defaults.pacing.max_ms)?,
    };
    if pacing.max_ms < pacing.min_ms {
        return Err(invalid(
            "SCRAPER_PAUSE_MAX_MS",
            format!("{} is below SCRAPER_PAUSE_MIN_MS ({})", pacing.max_ms, pacing.min_ms),
        ));
    }

    let locator_paths = match get("SCRAPER_LOCATOR_PATHS") {
        Some(raw) => raw
            .split(';')
            .filter(|p| !p.trim().is_empty())
            .map(str::parse::<LocatorPath>)
            .collect::<Result<Vec<_>, _>>()?,
        None => defaults.locator_paths,
    };

    Ok(Config {
        target_url,
        output_path,
        browser_strategy: browser_enabled
            .then(|| RetrievalStrategy::browser(IdentityProfile::chrome_macos(), http_timeout)),
        http_strategies: RetrievalStrategy::http_rotation(http_timeout),
        browser,
        locator_paths,
        pacing,
    })
}
