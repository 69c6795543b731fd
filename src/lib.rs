//! Resilient single-price scraper for a travel product page.
//!
//! A run tries a headless browser first and then a rotation of plain HTTP
//! identities. The first page retrieved is searched with positional locator
//! paths; when none resolves, product fields are mined from the page
//! instead. The outcome is always a [`ScrapeResult`], never an error.

pub mod browser;
pub mod chain;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod identity;
pub mod locator;
pub mod orchestrator;
pub mod price;
pub mod report;
pub mod result;
pub mod strategy;

pub use browser::{BrowserOptions, BrowserRetriever, ChromiumLauncher};
pub use chain::{ChainOutcome, Dispatcher, Pacing, Retrieved, Retriever, run_chain};
pub use config::Config;
pub use error::{ConfigError, ScrapeError};
pub use extract::ProductInfo;
pub use fetch::HttpRetriever;
pub use identity::IdentityProfile;
pub use locator::LocatorPath;
pub use orchestrator::Orchestrator;
pub use price::{Currency, PriceInfo, parse_price};
pub use result::{Payload, ScrapeResult};
pub use strategy::{RenderMode, RetrievalStrategy};
