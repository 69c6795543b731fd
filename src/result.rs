use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::extract::ProductInfo;
use crate::price::PriceInfo;

/// What a run produced. Exactly one shape per result, flattened into the
/// top-level JSON object when persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// A configured locator path resolved to the price element.
    Located {
        content: String,
        html: String,
        price_info: PriceInfo,
        used_path: String,
    },
    /// No path resolved; fields were mined from the page instead.
    Fallback { product_info: ProductInfo },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub method: String,
    pub url: String,
    pub attempts: usize,
    pub scraped_at: String,
    #[serde(flatten)]
    pub payload: Payload,
}

impl ScrapeResult {
    pub fn succeeded(method: impl Into<String>, url: &str, attempts: usize, payload: Payload) -> Self {
        Self {
            success: true,
            method: method.into(),
            url: url.to_string(),
            attempts,
            scraped_at: now_rfc3339(),
            payload,
        }
    }

    pub fn failed(method: impl Into<String>, url: &str, attempts: usize, error: impl Into<String>) -> Self {
        Self {
            success: false,
            method: method.into(),
            url: url.to_string(),
            attempts,
            scraped_at: now_rfc3339(),
            payload: Payload::Failed {
                error: error.into(),
            },
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.payload {
            Payload::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn price_info(&self) -> Option<&PriceInfo> {
        match &self.payload {
            Payload::Located { price_info, .. } => Some(price_info),
            Payload::Fallback { product_info } => product_info.price_info.as_ref(),
            Payload::Failed { .. } => None,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
