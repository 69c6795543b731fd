//! Persisted JSON output and the console summary.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::result::{Payload, ScrapeResult};

/// Writes `result` as indented UTF-8 JSON, replacing any previous file.
pub fn save_result(result: &ScrapeResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("serialize scrape result")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Saves `result` to `path`, then writes the summary to `out`. Failures are
/// logged; neither step can stop the other.
pub fn publish(result: &ScrapeResult, path: &Path, out: &mut dyn Write) {
    match save_result(result, path) {
        Ok(()) => info!(path = %path.display(), "results saved"),
        Err(e) => error!(error = ?e, "failed to save results"),
    }
    if let Err(e) = write_summary(result, out) {
        error!(error = %e, "failed to write summary");
    }
}

/// Human-readable run summary.
pub fn write_summary(result: &ScrapeResult, out: &mut dyn Write) -> io::Result<()> {
    let rule = "=".repeat(50);
    writeln!(out, "{rule}")?;
    writeln!(out, "SCRAPING SUMMARY")?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Success: {}", result.success)?;
    writeln!(out, "Method: {}", result.method)?;
    writeln!(out, "URL: {}", result.url)?;
    writeln!(out, "Attempts: {}", result.attempts)?;

    match &result.payload {
        Payload::Located {
            content, used_path, ..
        } => {
            writeln!(out, "Content length: {} characters", content.chars().count())?;
            writeln!(out, "Matched path: {used_path}")?;
        }
        Payload::Fallback { product_info } => {
            writeln!(
                out,
                "Product info extracted: [{}]",
                product_info.field_names().join(", ")
            )?;
            if let Some(title) = &product_info.title {
                writeln!(out, "Title: {title}")?;
            }
            if let Some(price) = &product_info.price {
                writeln!(out, "Price: {price}")?;
            }
            if !product_info.images.is_empty() {
                writeln!(out, "Images: {}", product_info.images.len())?;
            }
        }
        Payload::Failed { .. } => {}
    }

    if result.success {
        match result.price_info().filter(|p| p.has_price()) {
            Some(price) => {
                let rule = "=".repeat(30);
                writeln!(out)?;
                writeln!(out, "{rule}")?;
                writeln!(out, "PRICE INFORMATION")?;
                writeln!(out, "{rule}")?;
                writeln!(out, "Raw text: {}", price.raw_text)?;
                if let Some(formatted) = &price.formatted_price {
                    writeln!(out, "Formatted price: {formatted}")?;
                }
                if let Some(currency) = price.currency {
                    writeln!(out, "Currency: {currency}")?;
                }
                if let Some(value) = price.numeric_price {
                    writeln!(out, "Numeric value: {value}")?;
                }
                if let Some(error) = &price.error {
                    writeln!(out, "Price extraction error: {error}")?;
                }
            }
            None => {
                writeln!(out)?;
                writeln!(out, "No price information found")?;
            }
        }
    }

    if let Some(error) = result.error() {
        writeln!(out, "Error: {error}")?;
    }
    Ok(())
}
