//! Result list and highlight overlay
//!
//! The list is always rebuilt from the session's accumulated results, so
//! branches arriving one after another produce the union of their points.
//! The overlay only ever grows within a session; `clear` is the single way
//! to empty it. Entry `i` of the list describes graphic `i` of the overlay.

use crate::config::GeoQueryConfig;
use crate::feature::Feature;
use crate::session::SelectionSession;
use crate::symbology::MarkerSymbol;
use crate::view::Graphic;

#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    /// Position in the session's result array.
    pub index: usize,
    pub label: String,
    /// Classification value (population by default).
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ListState {
    #[default]
    Idle,
    Loading,
    Entries(Vec<ListEntry>),
    Empty,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultList {
    state: ListState,
    warnings: Vec<String>,
}

impl ResultList {
    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn entries(&self) -> &[ListEntry] {
        match &self.state {
            ListState::Entries(entries) => entries,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Non-fatal problems, such as a region branch that failed while
    /// others succeeded.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overlay {
    graphics: Vec<Graphic>,
}

impl Overlay {
    pub fn graphics(&self) -> &[Graphic] {
        &self.graphics
    }

    pub fn get(&self, index: usize) -> Option<&Graphic> {
        self.graphics.get(index)
    }

    pub fn len(&self) -> usize {
        self.graphics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphics.is_empty()
    }
}

pub struct ResultPresenter {
    highlight: MarkerSymbol,
    label_field: String,
    value_field: String,
    list: ResultList,
    overlay: Overlay,
}

impl ResultPresenter {
    pub fn new(config: &GeoQueryConfig) -> Self {
        Self {
            highlight: config.symbols.highlight,
            label_field: config.points.label_field.clone(),
            value_field: config.points.value_field.clone(),
            list: ResultList::default(),
            overlay: Overlay::default(),
        }
    }

    pub fn list(&self) -> &ResultList {
        &self.list
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Adds one branch worth of features to the session and the display.
    /// Features already in the session are skipped. Returns the graphics
    /// created for this batch.
    pub fn present(&mut self, session: &mut SelectionSession, features: Vec<Feature>) -> Vec<Graphic> {
        let mut graphics: Vec<Graphic> = Vec::new();
        for feature in features {
            if feature.geometry.is_none() {
                log::warn!(
                    "Skipping result '{}' without geometry",
                    feature.attribute_text(&self.label_field).unwrap_or_default()
                );
                continue;
            }
            // a point on the shared border of two regions comes back twice
            if session
                .results
                .iter()
                .chain(graphics.iter())
                .any(|graphic| graphic.feature == feature)
            {
                log::debug!(
                    "Skipping duplicate result '{}'",
                    feature.attribute_text(&self.label_field).unwrap_or_default()
                );
                continue;
            }
            graphics.push(Graphic::new(feature, self.highlight));
        }

        if graphics.is_empty() {
            return graphics;
        }

        session.results.extend(graphics.iter().cloned());
        self.overlay.graphics.extend(graphics.iter().cloned());

        let entries = session
            .results()
            .iter()
            .enumerate()
            .map(|(index, graphic)| self.entry_for(index, graphic))
            .collect();
        self.list.state = ListState::Entries(entries);

        log::debug!(
            "Presented {} new results for {} ({} total)",
            graphics.len(),
            session.generation(),
            session.results().len()
        );
        graphics
    }

    fn entry_for(&self, index: usize, graphic: &Graphic) -> ListEntry {
        let label = graphic
            .feature
            .attribute_text(&self.label_field)
            .unwrap_or_else(|| format!("Result {}", index + 1));
        ListEntry {
            index,
            label,
            value: graphic.feature.attribute_f64(&self.value_field),
        }
    }

    pub fn show_loading(&mut self) {
        self.list.state = ListState::Loading;
    }

    pub fn show_empty(&mut self) {
        self.list.state = ListState::Empty;
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.list.state = ListState::Error(message.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.list.warnings.push(warning.into());
    }

    /// Empties the overlay and resets the list to `Idle`.
    pub fn clear(&mut self) {
        self.overlay.graphics.clear();
        self.list = ResultList::default();
    }
}
