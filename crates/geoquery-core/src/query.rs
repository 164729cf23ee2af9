//! Filter expressions and query descriptions
//!
//! A `Query` is backend-neutral; `to_form_params` renders it in the ArcGIS
//! REST `query` operation's parameter names.

use crate::errors::{GeoQueryError, Result};
use crate::geometry::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL-92 style `where` clause understood by the feature service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter(String);

impl Filter {
    /// Matches every feature.
    pub fn all() -> Self {
        Filter("1=1".to_string())
    }

    /// `FIELD = 'value'` with embedded quotes doubled.
    pub fn equals(field: &str, value: &str) -> Result<Self> {
        if !is_valid_field_name(field) {
            return Err(GeoQueryError::ConfigError(format!(
                "Invalid field name in filter: '{}'",
                field
            )));
        }
        Ok(Filter(format!("{} = '{}'", field, value.replace('\'', "''"))))
    }

    /// Uses `clause` verbatim. Callers own its correctness.
    pub fn raw(clause: impl Into<String>) -> Self {
        Filter(clause.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn is_valid_field_name(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SpatialRelationship {
    #[default]
    Intersects,
    Contains,
    Within,
    EnvelopeIntersects,
}

impl SpatialRelationship {
    pub fn as_esri(&self) -> &'static str {
        match self {
            SpatialRelationship::Intersects => "esriSpatialRelIntersects",
            SpatialRelationship::Contains => "esriSpatialRelContains",
            SpatialRelationship::Within => "esriSpatialRelWithin",
            SpatialRelationship::EnvelopeIntersects => "esriSpatialRelEnvelopeIntersects",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub filter: Option<Filter>,
    pub geometry: Option<Geometry>,
    pub spatial_relationship: SpatialRelationship,
    pub out_fields: Vec<String>,
    pub return_geometry: bool,
    pub return_distinct_values: bool,
    pub order_by_fields: Vec<String>,
}

impl Query {
    /// Attribute query: `where` + fields, geometry returned.
    pub fn with_filter(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            return_geometry: true,
            ..Default::default()
        }
    }

    /// Spatial query against `geometry`, geometry returned.
    pub fn spatial(geometry: Geometry, relationship: SpatialRelationship) -> Self {
        Self {
            geometry: Some(geometry),
            spatial_relationship: relationship,
            return_geometry: true,
            ..Default::default()
        }
    }

    pub fn out_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.out_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn without_geometry(mut self) -> Self {
        self.return_geometry = false;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.return_distinct_values = true;
        self
    }

    pub fn order_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Form parameters for the REST `query` operation (without `f`).
    pub fn to_form_params(&self) -> Result<Vec<(&'static str, String)>> {
        let mut params = Vec::new();

        let where_clause = match (&self.filter, &self.geometry) {
            (Some(filter), _) => filter.to_string(),
            // the service requires either a where clause or a geometry
            (None, Some(_)) => String::new(),
            (None, None) => Filter::all().to_string(),
        };
        params.push(("where", where_clause));

        let out_fields = if self.out_fields.is_empty() {
            "*".to_string()
        } else {
            self.out_fields.join(",")
        };
        params.push(("outFields", out_fields));
        params.push(("returnGeometry", self.return_geometry.to_string()));

        if let Some(geometry) = &self.geometry {
            params.push(("geometry", serde_json::to_string(geometry)?));
            params.push(("geometryType", geometry.geometry_type().to_string()));
            params.push(("spatialRel", self.spatial_relationship.as_esri().to_string()));
            if let Some(wkid) = geometry.spatial_reference().and_then(|sr| sr.wkid) {
                params.push(("inSR", wkid.to_string()));
            }
        }

        if self.return_distinct_values {
            params.push(("returnDistinctValues", "true".to_string()));
        }
        if !self.order_by_fields.is_empty() {
            params.push(("orderByFields", self.order_by_fields.join(",")));
        }

        Ok(params)
    }
}
