//! ArcGIS REST feature layer client
//!
//! Talks to a `MapServer/<id>` or `FeatureServer/<id>` layer endpoint.
//! Metadata is fetched once (`GET <url>?f=json`) and cached; queries go
//! through `POST <url>/query` as form data so large region polygons fit.
//! The service reports many failures as HTTP 200 with an `error` object in
//! the body, so every response is checked for one.

use super::{FeatureSource, LayerInfo};
use crate::errors::GeoQueryError;
use crate::feature::{ExtentResult, FeatureSet};
use crate::geometry::Extent;
use crate::query::Query;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<String>,
}

impl ServiceError {
    fn describe(&self) -> String {
        let mut text = match self.code {
            Some(code) => format!("{} (code {})", self.message, code),
            None => self.message.clone(),
        };
        let details: Vec<&str> = self
            .details
            .iter()
            .map(String::as_str)
            .filter(|d| !d.is_empty())
            .collect();
        if !details.is_empty() {
            text.push_str(": ");
            text.push_str(&details.join("; "));
        }
        text
    }
}

/// Remote feature layer reached over HTTP.
pub struct ArcGisFeatureLayer {
    name: String,
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    info: OnceCell<LayerInfo>,
}

impl ArcGisFeatureLayer {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            name: name.into(),
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
            info: OnceCell::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shares one connection pool between layers of the same service.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn load_info(&self) -> Result<LayerInfo, GeoQueryError> {
        log::debug!("Loading layer metadata for '{}' from {}", self.name, self.url);

        let response = self
            .client
            .get(&self.url)
            .query(&[("f", "json")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GeoQueryError::connect(&self.name, e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoQueryError::connect(
                &self.name,
                format!("HTTP {} from {}", response.status(), self.url),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GeoQueryError::connect(&self.name, e.to_string()))?;

        if let Some(err) = Self::service_error(&body) {
            return Err(GeoQueryError::connect(&self.name, err.describe()));
        }

        let info: LayerInfo = serde_json::from_value(body).map_err(|e| {
            GeoQueryError::connect(&self.name, format!("Unreadable layer metadata: {}", e))
        })?;

        log::info!(
            "Feature source '{}' ready: layer '{}' with {} fields",
            self.name,
            info.name,
            info.fields.len()
        );
        Ok(info)
    }

    async fn post_query(&self, params: Vec<(&'static str, String)>) -> Result<Value, GeoQueryError> {
        let query_url = format!("{}/query", self.url);
        let mut form = params;
        form.push(("f", "json".to_string()));

        log::debug!(
            "Querying '{}': where={:?}",
            self.name,
            form.iter().find(|(k, _)| *k == "where").map(|(_, v)| v)
        );

        let response = self
            .client
            .post(&query_url)
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| GeoQueryError::query(&self.name, e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoQueryError::query(
                &self.name,
                format!("HTTP {} from {}", response.status(), query_url),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GeoQueryError::query(&self.name, e.to_string()))?;

        if let Some(err) = Self::service_error(&body) {
            return Err(GeoQueryError::query(&self.name, err.describe()));
        }

        Ok(body)
    }

    fn service_error(body: &Value) -> Option<ServiceError> {
        body.get("error")
            .and_then(|e| serde_json::from_value(e.clone()).ok())
    }

    /// NaN coordinates come back as strings or nulls; either means "no extent".
    fn parse_extent(body: &Value) -> Option<Extent> {
        body.get("extent")
            .and_then(|e| serde_json::from_value::<Extent>(e.clone()).ok())
            .filter(Extent::is_valid)
    }
}

#[async_trait]
impl FeatureSource for ArcGisFeatureLayer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn when_ready(&self) -> Result<LayerInfo, GeoQueryError> {
        self.info
            .get_or_try_init(|| self.load_info())
            .await
            .cloned()
    }

    async fn query_features(&self, query: &Query) -> Result<FeatureSet, GeoQueryError> {
        let body = self.post_query(query.to_form_params()?).await?;
        let set: FeatureSet = serde_json::from_value(body).map_err(|e| {
            GeoQueryError::query(&self.name, format!("Unreadable query response: {}", e))
        })?;

        if set.exceeded_transfer_limit {
            log::warn!(
                "Query against '{}' hit the service transfer limit; {} features returned",
                self.name,
                set.len()
            );
        }
        Ok(set)
    }

    async fn query_extent(&self, query: &Query) -> Result<ExtentResult, GeoQueryError> {
        let mut params = query.to_form_params()?;
        params.push(("returnExtentOnly", "true".to_string()));
        params.push(("returnCountOnly", "true".to_string()));

        let body = self.post_query(params).await?;
        Ok(ExtentResult {
            extent: Self::parse_extent(&body),
            count: body.get("count").and_then(Value::as_u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use crate::test_utils::{MockFeatureServer, MockReply};
    use serde_json::json;

    fn cities_metadata() -> Value {
        json!({
            "currentVersion": 10.91,
            "id": 0,
            "name": "Cities",
            "type": "Feature Layer",
            "geometryType": "esriGeometryPoint",
            "fields": [
                {"name": "CITY_NAME", "type": "esriFieldTypeString", "alias": "CITY_NAME"},
                {"name": "POP", "type": "esriFieldTypeInteger", "alias": "POP"}
            ],
            "maxRecordCount": 1000
        })
    }

    #[tokio::test]
    async fn test_when_ready_loads_metadata_once() {
        let server = MockFeatureServer::start(Some(cities_metadata()), vec![]).await;
        let layer = ArcGisFeatureLayer::new("cities", server.layer_url());

        let info = layer.when_ready().await.unwrap();
        assert_eq!(info.name, "Cities");
        assert!(info.has_field("pop"));
        layer.when_ready().await.unwrap();

        assert_eq!(server.metadata_requests(), 1);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_when_ready_reports_connect_error() {
        let server = MockFeatureServer::start(None, vec![]).await;
        let layer = ArcGisFeatureLayer::new("cities", server.layer_url());

        let err = layer.when_ready().await.unwrap_err();
        assert!(matches!(err, GeoQueryError::ConnectError { .. }));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_query_features_sends_form_and_parses() {
        let reply = json!({
            "geometryType": "esriGeometryPoint",
            "features": [
                {"attributes": {"CITY_NAME": "Nairobi", "POP": 2750547}, "geometry": {"x": 36.82, "y": -1.29}}
            ]
        });
        let server =
            MockFeatureServer::start(Some(cities_metadata()), vec![MockReply::Json(reply)]).await;
        let layer = ArcGisFeatureLayer::new("cities", format!("{}/", server.layer_url()));

        let query = Query::with_filter(Filter::equals("CITY_NAME", "Nairobi").unwrap())
            .out_fields(["POP", "CITY_NAME"]);
        let set = layer.query_features(&query).await.unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.features[0].attribute_f64("POP"), Some(2750547.0));

        let requests = server.query_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].get("f").map(String::as_str), Some("json"));
        assert_eq!(
            requests[0].get("where").map(String::as_str),
            Some("CITY_NAME = 'Nairobi'")
        );
        assert_eq!(requests[0].get("outFields").map(String::as_str), Some("POP,CITY_NAME"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_error_body_becomes_query_error() {
        let reply = json!({
            "error": {"code": 400, "message": "Unable to complete operation.", "details": ["Invalid where clause"]}
        });
        let server =
            MockFeatureServer::start(Some(cities_metadata()), vec![MockReply::Json(reply)]).await;
        let layer = ArcGisFeatureLayer::new("cities", server.layer_url());

        let err = layer
            .query_features(&Query::with_filter(Filter::raw("POP >")))
            .await
            .unwrap_err();
        match err {
            GeoQueryError::QueryError { source_name, message } => {
                assert_eq!(source_name, "cities");
                assert!(message.contains("code 400"));
                assert!(message.contains("Invalid where clause"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_http_failure_becomes_query_error() {
        let server =
            MockFeatureServer::start(Some(cities_metadata()), vec![MockReply::Status(502)]).await;
        let layer = ArcGisFeatureLayer::new("cities", server.layer_url());

        let err = layer
            .query_features(&Query::with_filter(Filter::all()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("502"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_query_extent_handles_nan_and_values() {
        let server = MockFeatureServer::start(
            Some(cities_metadata()),
            vec![
                MockReply::Json(json!({
                    "count": 3,
                    "extent": {"xmin": -17.4, "ymin": -33.9, "xmax": 47.5, "ymax": 36.8,
                               "spatialReference": {"wkid": 4326}}
                })),
                MockReply::Json(json!({
                    "count": 0,
                    "extent": {"xmin": "NaN", "ymin": "NaN", "xmax": "NaN", "ymax": "NaN"}
                })),
            ],
        )
        .await;
        let layer = ArcGisFeatureLayer::new("cities", server.layer_url());
        let query = Query::with_filter(Filter::equals("CONTINENT", "Africa").unwrap());

        let found = layer.query_extent(&query).await.unwrap();
        assert_eq!(found.count, Some(3));
        assert_eq!(found.extent.unwrap().xmax, 47.5);

        let empty = layer.query_extent(&query).await.unwrap();
        assert_eq!(empty.count, Some(0));
        assert!(empty.extent.is_none());

        let requests = server.query_requests();
        assert_eq!(
            requests[0].get("returnExtentOnly").map(String::as_str),
            Some("true")
        );
        server.shutdown().await;
    }
}
