//! In-memory feature sources and helpers for pipeline tests

use crate::errors::GeoQueryError;
use crate::feature::{Attributes, ExtentResult, Feature, FeatureSet};
use crate::geometry::{Extent, Geometry, Point, Polygon};
use crate::query::Query;
use crate::source::{FeatureSource, LayerInfo};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Clone)]
pub struct MockQueryReply {
    result: Result<Vec<Feature>, GeoQueryError>,
    gate: Option<Arc<Notify>>,
}

impl MockQueryReply {
    async fn resolve(&self) -> Result<Vec<Feature>, GeoQueryError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone()
    }
}

/// Feature source answering from canned replies. Spatial replies are
/// matched by the exact query geometry, attribute replies by `where` text.
pub struct MockFeatureSource {
    name: String,
    ready: Result<LayerInfo, GeoQueryError>,
    filter_replies: Vec<(String, MockQueryReply)>,
    spatial_replies: Vec<(Geometry, MockQueryReply)>,
    extent: Result<Option<Extent>, GeoQueryError>,
    extent_gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<String>>,
}

impl MockFeatureSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ready: Ok(LayerInfo {
                name: name.to_string(),
                ..Default::default()
            }),
            filter_replies: Vec::new(),
            spatial_replies: Vec::new(),
            extent: Ok(None),
            extent_gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_ready(mut self, message: &str) -> Self {
        self.ready = Err(GeoQueryError::connect(&self.name, message));
        self
    }

    pub fn with_filter_reply(mut self, where_clause: &str, features: Vec<Feature>) -> Self {
        self.filter_replies.push((
            where_clause.to_string(),
            MockQueryReply {
                result: Ok(features),
                gate: None,
            },
        ));
        self
    }

    pub fn with_filter_error(mut self, where_clause: &str, message: &str) -> Self {
        let err = GeoQueryError::query(&self.name, message);
        self.filter_replies.push((
            where_clause.to_string(),
            MockQueryReply {
                result: Err(err),
                gate: None,
            },
        ));
        self
    }

    pub fn with_intersection(self, geometry: Geometry, features: Vec<Feature>) -> Self {
        self.push_spatial(geometry, Ok(features), None)
    }

    /// The reply is held back until `gate.notify_one()` is called.
    pub fn with_gated_intersection(
        self,
        geometry: Geometry,
        features: Vec<Feature>,
        gate: Arc<Notify>,
    ) -> Self {
        self.push_spatial(geometry, Ok(features), Some(gate))
    }

    pub fn with_intersection_error(self, geometry: Geometry, message: &str) -> Self {
        let err = GeoQueryError::query(&self.name, message);
        self.push_spatial(geometry, Err(err), None)
    }

    pub fn with_extent(mut self, extent: Option<Extent>) -> Self {
        self.extent = Ok(extent);
        self
    }

    pub fn with_gated_extent(mut self, extent: Option<Extent>, gate: Arc<Notify>) -> Self {
        self.extent = Ok(extent);
        self.extent_gate = Some(gate);
        self
    }

    pub fn with_extent_error(mut self, message: &str) -> Self {
        self.extent = Err(GeoQueryError::query(&self.name, message));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push_spatial(
        mut self,
        geometry: Geometry,
        result: Result<Vec<Feature>, GeoQueryError>,
        gate: Option<Arc<Notify>>,
    ) -> Self {
        self.spatial_replies
            .push((geometry, MockQueryReply { result, gate }));
        self
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl FeatureSource for MockFeatureSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn when_ready(&self) -> Result<LayerInfo, GeoQueryError> {
        self.record("ready".to_string());
        self.ready.clone()
    }

    async fn query_features(&self, query: &Query) -> Result<FeatureSet, GeoQueryError> {
        let reply = if let Some(geometry) = &query.geometry {
            self.record(format!("spatial:{}", geometry.geometry_type()));
            self.spatial_replies
                .iter()
                .find(|(g, _)| g == geometry)
                .map(|(_, r)| r.clone())
        } else {
            let where_clause = query
                .filter
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_default();
            self.record(format!("features:{}", where_clause));
            self.filter_replies
                .iter()
                .find(|(w, _)| *w == where_clause)
                .map(|(_, r)| r.clone())
        };

        match reply {
            Some(reply) => reply.resolve().await.map(FeatureSet::from_features),
            None => Ok(FeatureSet::default()),
        }
    }

    async fn query_extent(&self, query: &Query) -> Result<ExtentResult, GeoQueryError> {
        let where_clause = query
            .filter
            .as_ref()
            .map(|f| f.to_string())
            .unwrap_or_default();
        self.record(format!("extent:{}", where_clause));
        if let Some(gate) = &self.extent_gate {
            gate.notified().await;
        }
        self.extent.clone().map(|extent| ExtentResult { extent, count: None })
    }
}

pub fn city(name: &str, pop: u64, x: f64, y: f64) -> Feature {
    let mut attributes = Attributes::new();
    attributes.insert("CITY_NAME".to_string(), json!(name));
    attributes.insert("POP".to_string(), json!(pop));
    Feature::new(Some(Geometry::Point(Point::new(x, y))), attributes)
}

/// Square continent polygon with its lower-left corner at (`x`, `y`).
pub fn continent(name: &str, x: f64, y: f64, size: f64) -> Feature {
    let ring = vec![
        [x, y],
        [x, y + size],
        [x + size, y + size],
        [x + size, y],
        [x, y],
    ];
    let mut attributes = Attributes::new();
    attributes.insert("CONTINENT".to_string(), json!(name));
    attributes.insert("SQMI".to_string(), json!(size * size));
    Feature::new(Some(Geometry::Polygon(Polygon::new(vec![ring]))), attributes)
}
