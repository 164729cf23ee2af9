//! Configuration type definitions
//!
//! Every section has serde defaults, so an empty YAML document yields the
//! stock World Cities explorer: continents as regions, cities as points.

use crate::errors::GeoQueryError;
use crate::popup::PopupTemplate;
use crate::symbology::{FillSymbol, MarkerSymbol, Renderer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_POINTS_URL: &str =
    "http://sampleserver6.arcgisonline.com/arcgis/rest/services/SampleWorldCities/MapServer/0";
pub const DEFAULT_REGIONS_URL: &str =
    "http://sampleserver6.arcgisonline.com/arcgis/rest/services/SampleWorldCities/MapServer/1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoQueryConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub regions: RegionLayerConfig,
    #[serde(default)]
    pub points: PointLayerConfig,
    #[serde(default)]
    pub map: MapSettings,
    #[serde(default)]
    pub symbols: SymbolsConfig,
    #[serde(default)]
    pub renderer: Renderer,
    #[serde(default)]
    pub popups: PopupsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_regions_url")]
    pub regions_url: String,
    #[serde(default = "default_points_url")]
    pub points_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionLayerConfig {
    /// Attribute the selection filter is built on.
    #[serde(default = "default_region_field")]
    pub filter_field: String,
    #[serde(default = "default_region_field")]
    pub label_field: String,
    #[serde(default = "default_region_out_fields")]
    pub out_fields: Vec<String>,
}

/// Which layer answers the extent lookup that runs beside the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtentLayer {
    #[default]
    Points,
    Regions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLayerConfig {
    #[serde(default = "default_point_label_field")]
    pub label_field: String,
    #[serde(default = "default_point_value_field")]
    pub value_field: String,
    #[serde(default = "default_point_out_fields")]
    pub out_fields: Vec<String>,
    #[serde(default)]
    pub extent_layer: ExtentLayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScaleUnit {
    Metric,
    Imperial,
    #[default]
    Dual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    #[serde(default = "default_basemap")]
    pub basemap: String,
    #[serde(default = "default_next_basemap")]
    pub next_basemap: String,
    /// Initial center as `[longitude, latitude]`.
    #[serde(default = "default_center")]
    pub center: [f64; 2],
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Minimum zoom used when navigating to a single point.
    #[serde(default = "default_point_zoom")]
    pub point_zoom: f64,
    #[serde(default)]
    pub scale_unit: ScaleUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SymbolsConfig {
    #[serde(default)]
    pub highlight: MarkerSymbol,
    #[serde(default)]
    pub region_fill: FillSymbol,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupsConfig {
    #[serde(default = "PopupTemplate::cities")]
    pub points: PopupTemplate,
    #[serde(default = "PopupTemplate::continents")]
    pub regions: PopupTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log destination while the terminal UI owns the screen.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_regions_url() -> String { DEFAULT_REGIONS_URL.to_string() }
fn default_points_url() -> String { DEFAULT_POINTS_URL.to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_region_field() -> String { "CONTINENT".to_string() }
fn default_region_out_fields() -> Vec<String> { vec!["CONTINENT".to_string(), "SQMI".to_string()] }
fn default_point_label_field() -> String { "CITY_NAME".to_string() }
fn default_point_value_field() -> String { "POP".to_string() }
fn default_point_out_fields() -> Vec<String> { vec!["POP".to_string(), "CITY_NAME".to_string()] }
fn default_basemap() -> String { "dark-gray".to_string() }
fn default_next_basemap() -> String { "satellite".to_string() }
fn default_center() -> [f64; 2] { [0.0, 20.0] }
fn default_zoom() -> f64 { 3.0 }
fn default_point_zoom() -> f64 { 10.0 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> PathBuf { PathBuf::from("geoquery.log") }

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            regions_url: default_regions_url(),
            points_url: default_points_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RegionLayerConfig {
    fn default() -> Self {
        Self {
            filter_field: default_region_field(),
            label_field: default_region_field(),
            out_fields: default_region_out_fields(),
        }
    }
}

impl Default for PointLayerConfig {
    fn default() -> Self {
        Self {
            label_field: default_point_label_field(),
            value_field: default_point_value_field(),
            out_fields: default_point_out_fields(),
            extent_layer: ExtentLayer::default(),
        }
    }
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            basemap: default_basemap(),
            next_basemap: default_next_basemap(),
            center: default_center(),
            zoom: default_zoom(),
            point_zoom: default_point_zoom(),
            scale_unit: ScaleUnit::default(),
        }
    }
}

impl Default for PopupsConfig {
    fn default() -> Self {
        Self {
            points: PopupTemplate::cities(),
            regions: PopupTemplate::continents(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl GeoQueryConfig {
    pub fn validate(&self) -> Result<(), GeoQueryError> {
        for (label, url) in [
            ("service.regions_url", &self.service.regions_url),
            ("service.points_url", &self.service.points_url),
        ] {
            crate::config::validation::validate_service_url(label, url)?;
        }

        if self.service.timeout_secs == 0 {
            return Err(GeoQueryError::ConfigError(
                "service.timeout_secs must be greater than 0".to_string(),
            ));
        }

        crate::config::validation::validate_field_name("regions.filter_field", &self.regions.filter_field)?;
        crate::config::validation::validate_field_name("regions.label_field", &self.regions.label_field)?;
        crate::config::validation::validate_field_name("points.label_field", &self.points.label_field)?;
        crate::config::validation::validate_field_name("points.value_field", &self.points.value_field)?;

        if !(0.0..=20.0).contains(&self.map.zoom) || !(0.0..=20.0).contains(&self.map.point_zoom) {
            return Err(GeoQueryError::ConfigError(
                "map.zoom and map.point_zoom must be between 0 and 20".to_string(),
            ));
        }
        let [lon, lat] = self.map.center;
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoQueryError::ConfigError(format!(
                "map.center [{}, {}] is not a valid longitude/latitude",
                lon, lat
            )));
        }

        if self.symbols.highlight.size <= 0.0 {
            return Err(GeoQueryError::ConfigError(
                "symbols.highlight.size must be positive".to_string(),
            ));
        }

        self.renderer
            .validate()
            .map_err(|e| GeoQueryError::ConfigError(format!("renderer: {}", e)))?;

        crate::config::validation::validate_log_level(&self.logging.level)?;

        Ok(())
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.service.timeout_secs)
    }
}
