use crate::config::types::{
    ApiConfig, CategoryEntry, Config, OutputConfig, RetryConfig, UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_categories(&config.categories)?;
    Ok(())
}

/// Validates the upstream API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_endpoint("summary_url", &config.summary_url)?;
    validate_endpoint("items_url", &config.items_url)?;

    if config.page_size < 1 || config.page_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 1000, got {}",
            config.page_size
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1s".to_string(),
        ));
    }

    if config.connect_timeout < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout must be >= 1s".to_string(),
        ));
    }

    Ok(())
}

/// Endpoints must be absolute http(s) URLs
fn validate_endpoint(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.cooldown_after < 1 {
        return Err(ConfigError::Validation(format!(
            "cooldown_after must be >= 1, got {}",
            config.cooldown_after
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the configured category set
fn validate_categories(categories: &[CategoryEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in categories {
        if entry.id < 0 {
            return Err(ConfigError::Validation(format!(
                "Category id must be non-negative, got {}",
                entry.id
            )));
        }

        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Category {} must have a name",
                entry.id
            )));
        }

        if !seen.insert(entry.id) {
            return Err(ConfigError::Validation(format!(
                "Category {} is listed more than once",
                entry.id
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
