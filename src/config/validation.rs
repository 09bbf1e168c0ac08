use crate::config::types::{Config, ProviderConfig, QueueConfig, ReducerConfig, StoreConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_provider_config(&config.provider)?;
    validate_queue_config(&config.queue)?;
    validate_store_config(&config.store)?;
    validate_reducer_config(&config.reducer)?;
    Ok(())
}

/// Validates crawl provider configuration
fn validate_provider_config(config: &ProviderConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;

    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    if config.page_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "page_limit must be >= 1, got {}",
            config.page_limit
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_response_bytes < 1 {
        return Err(ConfigError::Validation(format!(
            "max_response_bytes must be >= 1, got {}",
            config.max_response_bytes
        )));
    }

    Ok(())
}

/// Validates queue configuration
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.retry_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_limit must be >= 1, got {}",
            config.retry_limit
        )));
    }

    if config.max_sites_per_run < 1 {
        return Err(ConfigError::Validation(format!(
            "max_sites_per_run must be >= 1, got {}",
            config.max_sites_per_run
        )));
    }

    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.max_document_bytes < 1 {
        return Err(ConfigError::Validation(format!(
            "max_document_bytes must be >= 1, got {}",
            config.max_document_bytes
        )));
    }

    if let Some(limit) = config.max_value_bytes {
        if limit < 1 || limit > i32::MAX as u32 {
            return Err(ConfigError::Validation(format!(
                "max_value_bytes must be between 1 and {}, got {}",
                i32::MAX,
                limit
            )));
        }
    }

    Ok(())
}

fn validate_reducer_config(config: &ReducerConfig) -> Result<(), ConfigError> {
    if let Some(tag) = config.strip_tags.iter().find(|t| !is_valid_token(t)) {
        return Err(ConfigError::Validation(format!(
            "Invalid tag in strip_tags: '{}'",
            tag
        )));
    }

    if let Some(ident) = config
        .strip_identifiers
        .iter()
        .find(|t| !is_valid_token(t))
    {
        return Err(ConfigError::Validation(format!(
            "Invalid entry in strip_identifiers: '{}'",
            ident
        )));
    }

    Ok(())
}

/// Tag names and class/id tokens are single non-empty words
fn is_valid_token(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(char::is_whitespace)
}
