use crate::config::types::{Config, CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("index_url", &config.index_url)?;

    Selector::parse(&config.index_table_selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("'{}': {:?}", config.index_table_selector, e))
    })?;

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency_limit < 1 || config.concurrency_limit > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency_limit must be between 1 and 100, got {}",
            config.concurrency_limit
        )));
    }

    if config.delay_candidates.is_empty() {
        return Err(ConfigError::Validation(
            "delay_candidates must contain at least one delay".to_string(),
        ));
    }

    // Delays are milliseconds; anything past an hour is a unit mistake
    if let Some(max) = config.delay_candidates.iter().max() {
        if *max > 3_600_000 {
            return Err(ConfigError::Validation(format!(
                "delay_candidates are milliseconds, {}ms is more than an hour",
                max
            )));
        }
    }

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(referer) = &config.referer {
        validate_http_url("referer", referer)?;
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.retry_max_attempts < 1 || config.retry_max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_max_attempts must be between 1 and 10, got {}",
            config.retry_max_attempts
        )));
    }

    if !config.retry_backoff_factor.is_finite() || config.retry_backoff_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "retry_backoff_factor must be >= 1.0, got {}",
            config.retry_backoff_factor
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if matches!(&config.links_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "links_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Requires an absolute http(s) URL with a host
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}
