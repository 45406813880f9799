use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Telegram token is non-empty
/// - Transmission URL is non-empty and has an http(s) scheme
/// - Download directories are non-empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.telegram.token.is_empty() {
        return Err(ConfigError::ValidationError(
            "telegram.token cannot be empty".to_string(),
        ));
    }

    if config.transmission.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "transmission.url cannot be empty".to_string(),
        ));
    }

    if !config.transmission.url.starts_with("http://")
        && !config.transmission.url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(format!(
            "transmission.url must start with http:// or https://, got {}",
            config.transmission.url
        )));
    }

    if config.downloads.movies_dir.is_empty() || config.downloads.tv_shows_dir.is_empty() {
        return Err(ConfigError::ValidationError(
            "downloads.movies_dir and downloads.tv_shows_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
