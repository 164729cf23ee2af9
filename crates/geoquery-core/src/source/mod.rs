//! Queryable feature collections
//!
//! The explorer never talks to a map service directly. It only needs a
//! readiness signal and three query shapes (attribute, spatial, extent),
//! so any backend that can answer those plugs in behind `FeatureSource`.

pub mod arcgis;

use crate::errors::GeoQueryError;
use crate::feature::{ExtentResult, FeatureSet};
use crate::geometry::Extent;
use crate::query::Query;
use async_trait::async_trait;
use serde::Deserialize;

pub use arcgis::ArcGisFeatureLayer;

/// Layer metadata loaded when a source becomes ready.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct LayerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "geometryType")]
    pub geometry_type: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    #[serde(default)]
    pub extent: Option<Extent>,
    #[serde(default, rename = "maxRecordCount")]
    pub max_record_count: Option<u64>,
}

impl LayerInfo {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Resolves once the source is connected and its metadata loaded.
    /// Repeated calls return the cached metadata.
    async fn when_ready(&self) -> Result<LayerInfo, GeoQueryError>;

    /// Attribute and/or spatial query returning matching features.
    async fn query_features(&self, query: &Query) -> Result<FeatureSet, GeoQueryError>;

    /// Bounding extent of the features matching `query`.
    async fn query_extent(&self, query: &Query) -> Result<ExtentResult, GeoQueryError>;
}
