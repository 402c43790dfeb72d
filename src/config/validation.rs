use crate::config::types::{
    ApiConfig, Config, CrawlerConfig, OutputConfig, ReportConfig, TelegramConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_report_config(&config.report)?;
    if let Some(telegram) = &config.telegram {
        validate_telegram_config(telegram)?;
    }
    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;

    if config.menu_path.trim_matches('/').is_empty() {
        return Err(ConfigError::Validation(
            "menu-path cannot be empty".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches == Some(0) {
        return Err(ConfigError::Validation(
            "max-concurrent-fetches must be >= 1 when set".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates report thresholds
fn validate_report_config(config: &ReportConfig) -> Result<(), ConfigError> {
    if !config.slow_threshold_secs.is_finite() || config.slow_threshold_secs <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "slow-threshold-secs must be a positive number, got {}",
            config.slow_threshold_secs
        )));
    }

    if config.slow_limit < 1 {
        return Err(ConfigError::Validation(
            "slow-limit must be >= 1".to_string(),
        ));
    }

    if config.error_limit < 1 {
        return Err(ConfigError::Validation(
            "error-limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates Telegram credentials
fn validate_telegram_config(config: &TelegramConfig) -> Result<(), ConfigError> {
    if config.token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram token cannot be empty".to_string(),
        ));
    }

    if config.chat_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram chat-id cannot be empty".to_string(),
        ));
    }

    validate_http_url("telegram api-base", &config.api_base)
}

/// Checks that `value` parses as an http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("base-url", "https://example.com/api/v1").is_ok());
        assert!(validate_http_url("base-url", "http://127.0.0.1:8080").is_ok());

        assert!(validate_http_url("base-url", "").is_err());
        assert!(validate_http_url("base-url", "not a url").is_err());
        assert!(validate_http_url("base-url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_report_threshold_must_be_positive() {
        let mut report = ReportConfig::default();
        assert!(validate_report_config(&report).is_ok());

        report.slow_threshold_secs = 0.0;
        assert!(validate_report_config(&report).is_err());

        report.slow_threshold_secs = f64::NAN;
        assert!(validate_report_config(&report).is_err());
    }

    #[test]
    fn test_zero_concurrency_cap_rejected() {
        let unbounded = CrawlerConfig {
            max_concurrent_fetches: None,
        };
        let zero = CrawlerConfig {
            max_concurrent_fetches: Some(0),
        };
        assert!(validate_crawler_config(&unbounded).is_ok());
        assert!(matches!(
            validate_crawler_config(&zero),
            Err(ConfigError::Validation(_))
        ));
    }
}
