use super::events::RegionsResult;
use geoquery_core::config::GeoQueryConfig;
use geoquery_core::symbology::{Color, Renderer};
use geoquery_core::widgets::{BasemapToggle, ScaleBar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Regions,
    Results,
}

/// Terminal-side state. Everything about the current selection lives in
/// the `Explorer`; this only tracks cursors and widgets.
pub struct AppState {
    pub regions: Vec<String>,
    pub region_cursor: usize,
    pub result_cursor: usize,
    pub focus: Focus,
    pub basemap: BasemapToggle,
    pub scale_bar: ScaleBar,
    pub renderer: Renderer,
    pub region_outline: Color,
    pub status: String,
    pub loading_regions: bool,
    pub exit: bool,
}

impl AppState {
    pub fn new(config: &GeoQueryConfig) -> Self {
        Self {
            regions: Vec::new(),
            region_cursor: 0,
            result_cursor: 0,
            focus: Focus::Regions,
            basemap: BasemapToggle::new(&config.map),
            scale_bar: ScaleBar::new(&config.map),
            renderer: config.renderer.clone(),
            region_outline: config.symbols.region_fill.outline.color,
            status: "Loading regions...".to_string(),
            loading_regions: false,
            exit: false,
        }
    }

    pub fn set_regions(&mut self, regions: Vec<String>) {
        self.status = format!("{} regions", regions.len());
        self.regions = regions;
        self.region_cursor = self.region_cursor.min(self.regions.len().saturating_sub(1));
    }

    /// Returns false while a listing is already in flight.
    pub fn begin_region_load(&mut self) -> bool {
        if self.loading_regions {
            return false;
        }
        self.loading_regions = true;
        self.status = "Loading regions...".to_string();
        true
    }

    /// A failed listing keeps the regions already shown.
    pub fn regions_loaded(&mut self, result: RegionsResult) {
        self.loading_regions = false;
        match result {
            Ok(regions) => self.set_regions(regions),
            Err(e) => {
                log::error!("Failed to load regions: {}", e);
                self.status = e.user_message();
            }
        }
    }

    pub fn selected_region(&self) -> Option<&str> {
        self.regions.get(self.region_cursor).map(String::as_str)
    }

    pub fn switch_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Regions => Focus::Results,
            Focus::Results => Focus::Regions,
        };
    }

    pub fn move_up(&mut self) {
        match self.focus {
            Focus::Regions => self.region_cursor = self.region_cursor.saturating_sub(1),
            Focus::Results => self.result_cursor = self.result_cursor.saturating_sub(1),
        }
    }

    /// `result_count` is the length of the explorer's current list.
    pub fn move_down(&mut self, result_count: usize) {
        match self.focus {
            Focus::Regions => {
                if self.region_cursor + 1 < self.regions.len() {
                    self.region_cursor += 1;
                }
            }
            Focus::Results => {
                if self.result_cursor + 1 < result_count {
                    self.result_cursor += 1;
                }
            }
        }
    }

    /// A new selection starts with the cursor on its first result.
    pub fn reset_results(&mut self) {
        self.result_cursor = 0;
    }
}
