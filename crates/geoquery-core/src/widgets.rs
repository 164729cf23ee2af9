//! Auxiliary map widgets
//!
//! Both widgets are configured once from `MapSettings` and only read the
//! viewport afterwards; nothing in the selection workflow drives them.

use crate::config::{MapSettings, ScaleUnit};
use crate::geometry::Extent;

const KM_PER_DEGREE: f64 = 111.32;
const MI_PER_KM: f64 = 0.621_371;

/// Switches between the current basemap and one alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasemapToggle {
    active: String,
    next: String,
}

impl BasemapToggle {
    pub fn new(settings: &MapSettings) -> Self {
        Self {
            active: settings.basemap.clone(),
            next: settings.next_basemap.clone(),
        }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    /// Basemap the toggle would switch to.
    pub fn next(&self) -> &str {
        &self.next
    }

    pub fn toggle(&mut self) -> &str {
        std::mem::swap(&mut self.active, &mut self.next);
        log::debug!("Basemap switched to '{}'", self.active);
        &self.active
    }
}

/// Ground distance across the visible extent, in the configured units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleBar {
    unit: ScaleUnit,
}

impl ScaleBar {
    pub fn new(settings: &MapSettings) -> Self {
        Self {
            unit: settings.scale_unit,
        }
    }

    /// Width of `extent` (degrees) at its central latitude, in kilometres.
    pub fn width_km(extent: &Extent) -> f64 {
        let lat = extent.center().y.clamp(-90.0, 90.0).to_radians();
        extent.width().abs() * KM_PER_DEGREE * lat.cos()
    }

    pub fn label(&self, extent: &Extent) -> String {
        let km = Self::width_km(extent);
        let metric = format!("{} km", round_nice(km));
        let imperial = format!("{} mi", round_nice(km * MI_PER_KM));
        match self.unit {
            ScaleUnit::Metric => metric,
            ScaleUnit::Imperial => imperial,
            ScaleUnit::Dual => format!("{} | {}", metric, imperial),
        }
    }
}

/// Rounds to two significant digits for display.
fn round_nice(value: f64) -> u64 {
    if value <= 0.0 || !value.is_finite() {
        return 0;
    }
    let magnitude = 10f64.powi(value.log10().floor() as i32 - 1).max(1.0);
    ((value / magnitude).round() * magnitude) as u64
}
