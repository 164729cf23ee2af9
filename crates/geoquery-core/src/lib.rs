//! Region selection and point-of-interest exploration over remote feature
//! services.
//!
//! The user picks a region; the crate resolves its geometry on a region
//! layer, fans out one spatial query per region feature against a point
//! layer, and presents the union of the matches as a list plus a highlight
//! overlay while steering a map view to them.
//!
//! # Architecture Overview
//!
//! - **Sources**: `FeatureSource` trait with an ArcGIS REST implementation
//! - **Pipeline**: readiness, region query, per-region fan-out and the
//!   parallel extent lookup, reported as generation-tagged events
//! - **Explorer**: selection handling, stale-event filtering, list activation
//! - **Presentation**: result list, overlay, symbology and popup templates
//! - **View**: `MapView` trait and the in-memory `Viewport`
//! - **Configuration**: YAML with defaults and environment overrides

pub mod config;
pub mod errors;
pub mod explorer;
pub mod feature;
pub mod geometry;
pub mod pipeline;
pub mod popup;
pub mod presenter;
pub mod query;
pub mod session;
pub mod source;
pub mod symbology;
pub mod view;
pub mod widgets;

pub use config::{ConfigLoader, GeoQueryConfig};
pub use errors::GeoQueryError;
pub use explorer::Explorer;
pub use pipeline::{PipelineEvent, QueryPipeline};
pub use presenter::{ListEntry, ListState};
pub use session::{Generation, SelectionPhase};
pub use source::{ArcGisFeatureLayer, FeatureSource};
pub use view::{MapView, Viewport};

#[cfg(test)]
pub mod test_utils;
