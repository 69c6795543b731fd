//! Plain HTTP retrieval.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::chain::{Retrieved, Retriever};
use crate::error::ScrapeError;
use crate::strategy::RetrievalStrategy;

/// Issues one GET per strategy. A fresh client is built per call so cookies
/// and connections from a rejected identity never leak into the next one.
#[derive(Debug, Clone, Default)]
pub struct HttpRetriever;

impl HttpRetriever {
    pub fn new() -> Self {
        Self
    }

    fn client(timeout: Duration) -> Result<reqwest::Client, ScrapeError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(8))
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(client)
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(
        &self,
        strategy: &RetrievalStrategy,
        url: &Url,
    ) -> Result<Retrieved, ScrapeError> {
        let client = Self::client(strategy.timeout)?;
        let rsp = client
            .get(url.as_str())
            .headers(strategy.identity.headers())
            .send()
            .await?;

        // Capture these before .text() consumes the response.
        let status = rsp.status();
        let final_url = rsp.url().clone();

        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = rsp.text().await?;
        info!(
            strategy = %strategy.name,
            status = status.as_u16(),
            final_url = %final_url,
            len = html.len(),
            "fetched page"
        );

        Ok(Retrieved { html, final_url })
    }
}
