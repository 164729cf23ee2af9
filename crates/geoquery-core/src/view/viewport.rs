//! In-memory map viewport
//!
//! Tracks what a map widget would show: center, zoom level and the visible
//! extent, plus the open popup. Zoom follows the web-map convention where
//! level 0 shows 360 degrees of longitude and each level halves it.

use super::{GoToTarget, MapView, Popup};
use crate::config::MapSettings;
use crate::errors::GeoQueryError;
use crate::geometry::{Extent, Point};
use async_trait::async_trait;
use std::sync::Mutex;

const MAX_ZOOM: f64 = 20.0;
/// Margin added around fitted extents so markers don't sit on the border.
const FIT_PADDING: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    pub center: Point,
    pub zoom: f64,
}

impl Viewpoint {
    /// Visible extent for a 2:1 view at this zoom.
    pub fn extent(&self) -> Extent {
        let width = 360.0 / 2f64.powf(self.zoom);
        let height = width / 2.0;
        Extent::new(
            self.center.x - width / 2.0,
            self.center.y - height / 2.0,
            self.center.x + width / 2.0,
            self.center.y + height / 2.0,
        )
    }

    fn fit(extent: &Extent) -> Viewpoint {
        let padded = extent.expand(FIT_PADDING);
        // the view is twice as wide as it is tall
        let span = padded.width().max(padded.height() * 2.0);
        let zoom = (360.0 / span).log2().clamp(0.0, MAX_ZOOM);
        Viewpoint {
            center: extent.center(),
            zoom,
        }
    }
}

#[derive(Debug)]
struct ViewportState {
    viewpoint: Viewpoint,
    popup: Option<Popup>,
    navigations: usize,
}

pub struct Viewport {
    point_zoom: f64,
    state: Mutex<ViewportState>,
}

impl Viewport {
    pub fn new(settings: &MapSettings) -> Self {
        Self {
            point_zoom: settings.point_zoom,
            state: Mutex::new(ViewportState {
                viewpoint: Viewpoint {
                    center: Point::new(settings.center[0], settings.center[1]),
                    zoom: settings.zoom,
                },
                popup: None,
                navigations: 0,
            }),
        }
    }

    pub fn viewpoint(&self) -> Viewpoint {
        self.lock().viewpoint
    }

    pub fn popup(&self) -> Option<Popup> {
        self.lock().popup.clone()
    }

    /// Number of completed `go_to` calls.
    pub fn navigations(&self) -> usize {
        self.lock().navigations
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewportState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MapView for Viewport {
    async fn go_to(&self, target: GoToTarget) -> Result<Viewpoint, GeoQueryError> {
        let extent = match target.extent() {
            Some(extent) => extent,
            None => return Ok(self.viewpoint()),
        };
        if !extent.is_valid() {
            return Err(GeoQueryError::ViewError(format!(
                "Cannot navigate to invalid extent {:?}",
                extent
            )));
        }

        let mut state = self.lock();
        let viewpoint = if extent.is_degenerate() {
            Viewpoint {
                center: extent.center(),
                zoom: state.viewpoint.zoom.max(self.point_zoom),
            }
        } else {
            Viewpoint::fit(&extent)
        };

        log::debug!(
            "Viewport moved to ({:.3}, {:.3}) zoom {:.2}",
            viewpoint.center.x,
            viewpoint.center.y,
            viewpoint.zoom
        );
        state.viewpoint = viewpoint;
        state.navigations += 1;
        Ok(viewpoint)
    }

    fn open_popup(&self, popup: Popup) {
        log::debug!("Opening popup '{}'", popup.title);
        self.lock().popup = Some(popup);
    }

    fn close_popup(&self) {
        self.lock().popup = None;
    }
}
