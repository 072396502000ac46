//! Configuration module for Pricewren
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, plus the per-run scrape configuration built from CLI arguments.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AppConfig, HttpConfig, PaginationKind, ParserKind, ProcessingConfig, ScrapeConfig,
    ScrapingConfig, SiteConfig,
};

// Re-export parser and validation functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, validate_scrape_config};
