//! Query pipeline
//!
//! One selection runs as a handful of tokio tasks:
//!
//! * the main task waits for both layers, resolves the matching region
//!   features and spawns one intersects query per region geometry;
//! * an extent task, started alongside it, looks up the extent of the
//!   selection and does not wait for the region branch.
//!
//! Tasks never touch explorer state. They report through `PipelineEvent`s
//! tagged with the session generation, and every remote call races the
//! session's cancellation token. A cancelled call reports nothing.

use crate::config::{ExtentLayer, GeoQueryConfig};
use crate::errors::GeoQueryError;
use crate::feature::{ExtentResult, Feature, FeatureSet};
use crate::geometry::Geometry;
use crate::query::{Filter, Query, SpatialRelationship};
use crate::session::Generation;
use crate::source::{ArcGisFeatureLayer, FeatureSource};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Number of region geometries a branch will be spawned for.
    RegionsResolved { generation: Generation, count: usize },
    RegionBatch {
        generation: Generation,
        region_index: usize,
        result: Result<FeatureSet, GeoQueryError>,
    },
    ExtentResolved {
        generation: Generation,
        result: Result<ExtentResult, GeoQueryError>,
    },
    /// Readiness or the region query failed; no branches will follow.
    Failed {
        generation: Generation,
        error: GeoQueryError,
    },
}

impl PipelineEvent {
    pub fn generation(&self) -> Generation {
        match self {
            PipelineEvent::RegionsResolved { generation, .. }
            | PipelineEvent::RegionBatch { generation, .. }
            | PipelineEvent::ExtentResolved { generation, .. }
            | PipelineEvent::Failed { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub filter_field: String,
    pub region_label_field: String,
    pub region_out_fields: Vec<String>,
    pub point_out_fields: Vec<String>,
    pub extent_layer: ExtentLayer,
}

impl From<&GeoQueryConfig> for PipelineSettings {
    fn from(config: &GeoQueryConfig) -> Self {
        Self {
            filter_field: config.regions.filter_field.clone(),
            region_label_field: config.regions.label_field.clone(),
            region_out_fields: config.regions.out_fields.clone(),
            point_out_fields: config.points.out_fields.clone(),
            extent_layer: config.points.extent_layer,
        }
    }
}

#[derive(Clone)]
pub struct QueryPipeline {
    regions: Arc<dyn FeatureSource>,
    points: Arc<dyn FeatureSource>,
    settings: Arc<PipelineSettings>,
}

impl QueryPipeline {
    pub fn new(
        regions: Arc<dyn FeatureSource>,
        points: Arc<dyn FeatureSource>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            regions,
            points,
            settings: Arc::new(settings),
        }
    }

    /// Pipeline over the two ArcGIS layers named in the configuration.
    pub fn from_config(config: &GeoQueryConfig) -> Self {
        let client = reqwest::Client::new();
        let regions = ArcGisFeatureLayer::new("regions", &config.service.regions_url)
            .with_client(client.clone())
            .with_timeout(config.timeout());
        let points = ArcGisFeatureLayer::new("points", &config.service.points_url)
            .with_client(client)
            .with_timeout(config.timeout());
        Self::new(Arc::new(regions), Arc::new(points), PipelineSettings::from(config))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Distinct values of the region filter field, sorted, for the
    /// selection control.
    pub async fn list_regions(&self) -> Result<Vec<String>, GeoQueryError> {
        self.regions.when_ready().await?;
        let field = &self.settings.filter_field;
        let query = Query::with_filter(Filter::all())
            .out_fields([field.as_str()])
            .without_geometry()
            .distinct()
            .order_by([field.as_str()]);
        let set = self.regions.query_features(&query).await?;

        let mut names: Vec<String> = set
            .features
            .iter()
            .filter_map(|f| f.attribute_text(field))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Every region feature with its out fields but no geometry, ordered by
    /// the region label field.
    pub async fn region_summaries(&self) -> Result<Vec<Feature>, GeoQueryError> {
        self.regions.when_ready().await?;
        let query = Query::with_filter(Filter::all())
            .out_fields(&self.settings.region_out_fields)
            .without_geometry()
            .order_by([self.settings.region_label_field.as_str()]);
        let set = self.regions.query_features(&query).await?;
        Ok(set.features)
    }

    /// Starts the main and extent tasks for one selection.
    pub fn spawn(
        &self,
        generation: Generation,
        filter: Filter,
        cancel: CancellationToken,
        events: UnboundedSender<PipelineEvent>,
    ) {
        log::info!("Starting selection {} with filter [{}]", generation, filter);

        let extent = Run {
            pipeline: self.clone(),
            generation,
            cancel: cancel.clone(),
            events: events.clone(),
        };
        let extent_filter = filter.clone();
        tokio::spawn(async move { extent.resolve_extent(extent_filter).await });

        let main = Run {
            pipeline: self.clone(),
            generation,
            cancel,
            events,
        };
        tokio::spawn(async move { main.resolve_regions(filter).await });
    }
}

/// State shared by the tasks of one pipeline run.
#[derive(Clone)]
struct Run {
    pipeline: QueryPipeline,
    generation: Generation,
    cancel: CancellationToken,
    events: UnboundedSender<PipelineEvent>,
}

impl Run {
    async fn resolve_regions(self, filter: Filter) {
        let regions = Arc::clone(&self.pipeline.regions);
        let points = Arc::clone(&self.pipeline.points);

        let ready = self
            .until_cancelled(futures_util::future::try_join(
                regions.when_ready(),
                points.when_ready(),
            ))
            .await;
        match ready {
            None => return,
            Some(Err(error)) => {
                log::error!("Selection {}: layers not ready: {}", self.generation, error);
                self.emit(PipelineEvent::Failed {
                    generation: self.generation,
                    error,
                });
                return;
            }
            Some(Ok(_)) => {}
        }

        let query = Query::with_filter(filter).out_fields(&self.pipeline.settings.region_out_fields);
        let region_set = match self.until_cancelled(regions.query_features(&query)).await {
            None => return,
            Some(Err(error)) => {
                log::error!("Selection {}: region query failed: {}", self.generation, error);
                self.emit(PipelineEvent::Failed {
                    generation: self.generation,
                    error,
                });
                return;
            }
            Some(Ok(set)) => set,
        };

        let geometries: Vec<Geometry> = region_set
            .features
            .into_iter()
            .filter_map(|feature| {
                if feature.geometry.is_none() {
                    log::warn!(
                        "Selection {}: skipping region feature without geometry",
                        self.generation
                    );
                }
                feature.geometry
            })
            .collect();

        log::debug!(
            "Selection {}: {} region geometries",
            self.generation,
            geometries.len()
        );
        self.emit(PipelineEvent::RegionsResolved {
            generation: self.generation,
            count: geometries.len(),
        });

        for (region_index, geometry) in geometries.into_iter().enumerate() {
            let branch = self.clone();
            tokio::spawn(async move { branch.query_region(region_index, geometry).await });
        }
    }

    async fn query_region(self, region_index: usize, geometry: Geometry) {
        let query = Query::spatial(geometry, SpatialRelationship::Intersects)
            .out_fields(&self.pipeline.settings.point_out_fields);
        let points = Arc::clone(&self.pipeline.points);

        if let Some(result) = self.until_cancelled(points.query_features(&query)).await {
            match &result {
                Ok(set) => log::debug!(
                    "Selection {}: region {} returned {} features",
                    self.generation,
                    region_index,
                    set.len()
                ),
                Err(e) => log::warn!(
                    "Selection {}: region {} query failed: {}",
                    self.generation,
                    region_index,
                    e
                ),
            }
            self.emit(PipelineEvent::RegionBatch {
                generation: self.generation,
                region_index,
                result,
            });
        }
    }

    async fn resolve_extent(self, filter: Filter) {
        let source = match self.pipeline.settings.extent_layer {
            ExtentLayer::Points => Arc::clone(&self.pipeline.points),
            ExtentLayer::Regions => Arc::clone(&self.pipeline.regions),
        };

        let outcome = self
            .until_cancelled(async {
                let info = source.when_ready().await?;
                // a layer without the filter field answers with its full extent
                let field = &self.pipeline.settings.filter_field;
                let filter = if info.fields.is_empty() || info.has_field(field) {
                    filter
                } else {
                    log::debug!(
                        "Layer '{}' has no field {}, querying its full extent",
                        source.name(),
                        field
                    );
                    Filter::all()
                };
                source.query_extent(&Query::with_filter(filter)).await
            })
            .await;

        if let Some(result) = outcome {
            self.emit(PipelineEvent::ExtentResolved {
                generation: self.generation,
                result,
            });
        }
    }

    async fn until_cancelled<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                log::debug!("Selection {} cancelled", self.generation);
                None
            }
            out = fut => Some(out),
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.events.send(event).is_err() {
            log::debug!("Selection {}: event receiver dropped", self.generation);
        }
    }
}
