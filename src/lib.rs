//! Pricewren: a structured record scraper for fixed demo-site layouts
//!
//! This crate fetches pages from a small set of known, low-complexity HTML
//! templates, parses them into typed records, and cleans, validates and
//! deduplicates the result into an in-memory session dataset.

pub mod config;
pub mod output;
pub mod processing;
pub mod record;
pub mod scrape;
pub mod sites;

use thiserror::Error;

/// Main error type for Pricewren operations
#[derive(Debug, Error)]
pub enum PricewrenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("A scrape run is already active")]
    AlreadyRunning,

    #[error(transparent)]
    Fetch(#[from] scrape::FetchError),

    #[error(transparent)]
    Parse(#[from] sites::ParseError),

    #[error("Aborted after {count} consecutive errors (ceiling {ceiling})")]
    ConsecutiveErrors { count: u32, ceiling: u32 },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Pricewren operations
pub type Result<T> = std::result::Result<T, PricewrenError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{AppConfig, ScrapeConfig, SiteConfig};
pub use record::{CleanedRecord, Dataset, QualityFlag, RawRecord};
pub use scrape::{CancelFlag, Engine, RunState, ScrapeEvent, ScrapeOutcome};
