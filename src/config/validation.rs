use crate::config::types::{Config, CrawlerConfig, SourceConfig, UserAgentConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_source_config(&config.source)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates pipeline tuning values
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.queue_capacity < 1 || config.queue_capacity > 1000 {
        return Err(ConfigError::Validation(format!(
            "queue_capacity must be between 1 and 1000, got {}",
            config.queue_capacity
        )));
    }

    if config.consumers < 1 || config.consumers > 64 {
        return Err(ConfigError::Validation(format!(
            "consumers must be between 1 and 64, got {}",
            config.consumers
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.monitor_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "monitor_interval_ms must be >= 10ms, got {}ms",
            config.monitor_interval_ms
        )));
    }

    Ok(())
}

/// Validates the encyclopedia layout settings
fn validate_source_config(config: &SourceConfig) -> ConfigResult<()> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must be an http(s) URL with a host, got '{}'",
            config.base_url
        )));
    }

    for (name, value) in [
        ("index_container_id", &config.index_container_id),
        ("article_prefix", &config.article_prefix),
        ("article_suffix", &config.article_suffix),
        ("summary_id", &config.summary_id),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
