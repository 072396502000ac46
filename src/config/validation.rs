use crate::config::types::{AppConfig, HttpConfig, ScrapeConfig, ScrapingConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire application configuration
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_scraping_config(&config.scraping)?;
    validate_sites(&config.site)?;
    Ok(())
}

/// Validates a per-run scrape configuration against the app configuration
pub fn validate_scrape_config(config: &ScrapeConfig, app: &AppConfig) -> Result<(), ConfigError> {
    if app.site(&config.site).is_none() {
        return Err(ConfigError::Validation(format!(
            "Unknown site '{}'; configured sites: {}",
            config.site,
            app.site
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    if config.max_products < 1 || config.max_products > 1000 {
        return Err(ConfigError::Validation(format!(
            "max_products must be between 1 and 1000, got {}",
            config.max_products
        )));
    }

    if !(0.5..=10.0).contains(&config.delay_secs) {
        return Err(ConfigError::Validation(format!(
            "delay_secs must be between 0.5 and 10.0, got {}",
            config.delay_secs
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if !(5..=120).contains(&config.timeout_secs) {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 5 and 120, got {}",
            config.timeout_secs
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_factor must be >= 1.0, got {}",
            config.backoff_factor
        )));
    }

    Ok(())
}

/// Validates scraping defaults
fn validate_scraping_config(config: &ScrapingConfig) -> Result<(), ConfigError> {
    if config.requests_per_minute < 1 {
        return Err(ConfigError::Validation(format!(
            "requests_per_minute must be >= 1, got {}",
            config.requests_per_minute
        )));
    }

    if config.max_consecutive_errors < 1 {
        return Err(ConfigError::Validation(format!(
            "max_consecutive_errors must be >= 1, got {}",
            config.max_consecutive_errors
        )));
    }

    if config.default_delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "default_delay_secs cannot be negative, got {}",
            config.default_delay_secs
        )));
    }

    Ok(())
}

/// Validates site entries
fn validate_sites(sites: &[SiteConfig]) -> Result<(), ConfigError> {
    for site in sites {
        if site.id.is_empty() {
            return Err(ConfigError::Validation(
                "site id cannot be empty".to_string(),
            ));
        }

        if !site
            .id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "site id must contain only lowercase letters, digits and hyphens, got '{}'",
                site.id
            )));
        }

        let url = Url::parse(&site.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base_url for '{}': {}", site.id, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "base_url for '{}' must use http or https, got '{}'",
                site.id,
                url.scheme()
            )));
        }

        if site.max_pages < 1 {
            return Err(ConfigError::Validation(format!(
                "max_pages for '{}' must be >= 1",
                site.id
            )));
        }

        if site.rate_limit_secs < 0.0 {
            return Err(ConfigError::Validation(format!(
                "rate_limit_secs for '{}' cannot be negative",
                site.id
            )));
        }
    }

    // Duplicate ids would make CLI site selection ambiguous
    for (i, site) in sites.iter().enumerate() {
        if sites[..i].iter().any(|s| s.id == site.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate site id '{}'",
                site.id
            )));
        }
    }

    Ok(())
}
