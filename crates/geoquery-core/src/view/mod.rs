//! Map view abstraction
//!
//! The explorer only ever asks a view to navigate somewhere and to show a
//! popup. `Viewport` is the in-process implementation used by the terminal
//! front end; a graphical front end would implement `MapView` itself.

pub mod viewport;

use crate::errors::GeoQueryError;
use crate::feature::Feature;
use crate::geometry::{Extent, Geometry, Point};
use crate::symbology::MarkerSymbol;
use async_trait::async_trait;

pub use viewport::{Viewpoint, Viewport};

/// A feature drawn on the result overlay with the symbol it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct Graphic {
    pub feature: Feature,
    pub symbol: MarkerSymbol,
}

impl Graphic {
    pub fn new(feature: Feature, symbol: MarkerSymbol) -> Self {
        Self { feature, symbol }
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.feature.geometry.as_ref()
    }

    pub fn centroid(&self) -> Option<Point> {
        self.geometry().and_then(Geometry::centroid)
    }
}

/// Where `go_to` should navigate.
#[derive(Debug, Clone, PartialEq)]
pub enum GoToTarget {
    Extent(Extent),
    Geometry(Geometry),
    Graphics(Vec<Graphic>),
}

impl GoToTarget {
    /// Combined extent of the target, `None` when it has no geometry.
    pub fn extent(&self) -> Option<Extent> {
        match self {
            GoToTarget::Extent(e) => Some(*e),
            GoToTarget::Geometry(g) => g.extent(),
            GoToTarget::Graphics(graphics) => {
                let extents: Vec<Extent> = graphics
                    .iter()
                    .filter_map(|g| g.geometry().and_then(Geometry::extent))
                    .collect();
                Extent::union_all(extents.iter())
            }
        }
    }
}

/// Detail popup anchored at a map location.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub content: String,
    pub location: Point,
    pub feature: Feature,
}

#[async_trait]
pub trait MapView: Send + Sync {
    /// Navigates to the target and returns the resulting viewpoint.
    async fn go_to(&self, target: GoToTarget) -> Result<Viewpoint, GeoQueryError>;

    fn open_popup(&self, popup: Popup);

    fn close_popup(&self);
}
