//! Validation helpers shared by the configuration sections

use crate::errors::GeoQueryError;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Feature service layer URLs must be absolute http(s) URLs.
pub fn validate_service_url(label: &str, url: &str) -> Result<(), GeoQueryError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| {
        GeoQueryError::ConfigError(format!("{} '{}' is not a valid URL: {}", label, url, e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(GeoQueryError::ConfigError(format!(
            "{} must use http or https, got '{}'",
            label, other
        ))),
    }
}

/// Attribute names end up inside `where` clauses, so only identifier
/// characters are accepted.
pub fn validate_field_name(label: &str, field: &str) -> Result<(), GeoQueryError> {
    let valid = crate::query::is_valid_field_name(field);
    if valid {
        Ok(())
    } else {
        Err(GeoQueryError::ConfigError(format!(
            "{} '{}' is not a valid field name",
            label, field
        )))
    }
}

pub fn validate_log_level(level: &str) -> Result<(), GeoQueryError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(GeoQueryError::ConfigError(format!(
            "logging.level '{}' must be one of {}",
            level,
            LOG_LEVELS.join(", ")
        )))
    }
}
