use thiserror::Error;

/// Why a single retrieval strategy failed.
///
/// None of these escape the strategy chain: the runner logs them and folds
/// the last one into the aggregated failure of the [`crate::ScrapeResult`].
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("browser session error: {0}")]
    Browser(String),

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: &'static str, secs: u64 },

    #[error("retrieved an empty document from {url}")]
    EmptyDocument { url: String },
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("invalid locator path \"{path}\": {reason}")]
    InvalidLocator { path: String, reason: String },
}
