//! Configuration loader for YAML files and environment overrides

use crate::config::types::GeoQueryConfig;
use crate::errors::GeoQueryError;
use std::env;
use std::path::Path;
use tokio::fs;

pub const ENV_REGIONS_URL: &str = "GEOQUERY_REGIONS_URL";
pub const ENV_POINTS_URL: &str = "GEOQUERY_POINTS_URL";
pub const ENV_TIMEOUT_SECS: &str = "GEOQUERY_TIMEOUT_SECS";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<GeoQueryConfig, GeoQueryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            GeoQueryError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<GeoQueryConfig, GeoQueryError> {
        // serde_yaml reads an empty document as unit, not as an empty map
        let mut config: GeoQueryConfig = if content.trim().is_empty() {
            GeoQueryConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                GeoQueryError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };

        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Like `from_file`, but falls back to the built-in defaults when the
    /// file does not exist.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<GeoQueryConfig, GeoQueryError> {
        let path = path.as_ref();
        if fs::try_exists(path).await.unwrap_or(false) {
            return Self::from_file(path).await;
        }

        log::info!(
            "No config file at {}, using built-in defaults",
            path.display()
        );
        let mut config = GeoQueryConfig::default();
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(config: &mut GeoQueryConfig) -> Result<(), GeoQueryError> {
        if let Ok(url) = env::var(ENV_REGIONS_URL) {
            log::debug!("{} overrides service.regions_url", ENV_REGIONS_URL);
            config.service.regions_url = url;
        }
        if let Ok(url) = env::var(ENV_POINTS_URL) {
            log::debug!("{} overrides service.points_url", ENV_POINTS_URL);
            config.service.points_url = url;
        }
        if let Ok(secs) = env::var(ENV_TIMEOUT_SECS) {
            config.service.timeout_secs = secs.trim().parse().map_err(|_| {
                GeoQueryError::ConfigError(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_TIMEOUT_SECS, secs
                ))
            })?;
        }
        Ok(())
    }
}
