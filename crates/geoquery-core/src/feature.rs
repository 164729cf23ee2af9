//! Features as returned by a feature service query

use crate::geometry::{Extent, Geometry, SpatialReference};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, attributes: Attributes) -> Self {
        Self {
            attributes,
            geometry,
        }
    }

    pub fn attribute(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field).filter(|v| !v.is_null())
    }

    /// Attribute rendered as plain text; numbers keep their JSON spelling.
    pub fn attribute_text(&self, field: &str) -> Option<String> {
        self.attribute(field).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Numeric attribute, accepting numeric strings as some services send them.
    pub fn attribute_f64(&self, field: &str) -> Option<f64> {
        match self.attribute(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Result of an attribute or spatial query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeatureSet {
    #[serde(default, rename = "geometryType", skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    #[serde(
        default,
        rename = "spatialReference",
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default, rename = "exceededTransferLimit")]
    pub exceeded_transfer_limit: bool,
}

impl FeatureSet {
    pub fn from_features(features: Vec<Feature>) -> Self {
        Self {
            features,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Result of an extent query. `extent` is `None` when nothing matched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtentResult {
    pub extent: Option<Extent>,
    pub count: Option<u64>,
}
