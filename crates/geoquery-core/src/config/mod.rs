//! Configuration for the explorer
//!
//! A single YAML file (`geoquery.yaml` by default) describes the two
//! feature layers, map defaults, symbology and popup templates. Service
//! URLs and the request timeout can be overridden from the environment.

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::*;
pub use types::*;


use crate::errors::GeoQueryError;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "geoquery.yaml";

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<GeoQueryConfig, GeoQueryError> {
    ConfigLoader::from_file(path).await
}
