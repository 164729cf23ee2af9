//! Selection handling and list activation
//!
//! `Explorer` owns all interactive state and lives on a single task. A
//! front end calls `select` when the user picks a region, feeds every
//! `PipelineEvent` from the returned receiver into `handle_event`, and
//! calls `activate` when a list entry is clicked.

use crate::config::GeoQueryConfig;
use crate::errors::{GeoQueryError, Result};
use crate::feature::ExtentResult;
use crate::pipeline::{PipelineEvent, QueryPipeline};
use crate::popup::PopupTemplate;
use crate::presenter::{ListState, Overlay, ResultList, ResultPresenter};
use crate::query::Filter;
use crate::session::{Generation, SelectionPhase, SelectionSession};
use crate::view::{GoToTarget, MapView, Popup};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub struct Explorer {
    pipeline: QueryPipeline,
    view: Arc<dyn MapView>,
    presenter: ResultPresenter,
    popup_template: PopupTemplate,
    filter_field: String,
    generation: Generation,
    session: Option<SelectionSession>,
    events: UnboundedSender<PipelineEvent>,
}

impl Explorer {
    pub fn new(
        pipeline: QueryPipeline,
        view: Arc<dyn MapView>,
        config: &GeoQueryConfig,
    ) -> (Self, UnboundedReceiver<PipelineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let explorer = Self {
            pipeline,
            view,
            presenter: ResultPresenter::new(config),
            popup_template: config.popups.points.clone(),
            filter_field: config.regions.filter_field.clone(),
            generation: Generation::default(),
            session: None,
            events,
        };
        (explorer, receiver)
    }

    pub fn list(&self) -> &ResultList {
        self.presenter.list()
    }

    pub fn overlay(&self) -> &Overlay {
        self.presenter.overlay()
    }

    pub fn session(&self) -> Option<&SelectionSession> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> SelectionPhase {
        self.session
            .as_ref()
            .map_or(SelectionPhase::Idle, SelectionSession::phase)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }

    /// Starts a new selection for `region`.
    ///
    /// Everything visible is reset before this returns: the previous
    /// session is cancelled, the overlay emptied and the list set to
    /// `Loading`. Results arrive later through `handle_event`.
    pub fn select(&mut self, region: &str) -> Result<Generation> {
        if let Some(previous) = self.session.take() {
            if !previous.phase().is_terminal() {
                log::debug!("Cancelling selection {}", previous.generation());
            }
            previous.cancel();
        }
        self.presenter.clear();
        self.presenter.show_loading();
        self.view.close_popup();

        let filter = match Filter::equals(&self.filter_field, region) {
            Ok(filter) => filter,
            Err(e) => {
                self.presenter.show_error(e.user_message());
                return Err(e);
            }
        };

        self.generation = self.generation.next();
        let session = SelectionSession::new(self.generation, region, filter.clone());
        log::info!("Selected region '{}' ({})", region, self.generation);

        self.pipeline
            .spawn(self.generation, filter, session.cancel_token(), self.events.clone());
        self.session = Some(session);
        Ok(self.generation)
    }

    /// Applies one pipeline event. Returns false when the event belonged
    /// to an older selection and was discarded.
    pub async fn handle_event(&mut self, event: PipelineEvent) -> bool {
        let session = match self.session.as_mut() {
            Some(session) if session.generation() == event.generation() => session,
            _ => {
                log::debug!("Discarding stale event from selection {}", event.generation());
                return false;
            }
        };
        if session.phase() == SelectionPhase::Failed {
            log::debug!("Ignoring event for failed selection {}", session.generation());
            return true;
        }

        match event {
            PipelineEvent::RegionsResolved { count, .. } => {
                log::debug!("Selection {} matched {} regions", session.generation(), count);
                session.regions_resolved(count);
            }
            PipelineEvent::RegionBatch {
                region_index,
                result,
                ..
            } => {
                match result {
                    Ok(set) => {
                        let added = self.presenter.present(session, set.features);
                        session.branch_completed();
                        if !added.is_empty() {
                            if let Err(e) = self.view.go_to(GoToTarget::Graphics(added)).await {
                                log::warn!("Could not fit view to results: {}", e);
                            }
                        }
                    }
                    Err(error) => {
                        session.branch_completed();
                        log::warn!(
                            "Region {} of selection {} failed: {}",
                            region_index + 1,
                            session.generation(),
                            error
                        );
                        self.presenter.add_warning(format!(
                            "Region {}: {}",
                            region_index + 1,
                            error.user_message()
                        ));
                        session.record_error(error);
                    }
                }
            }
            PipelineEvent::ExtentResolved { result, .. } => {
                session.extent_completed();
                match result {
                    Ok(ExtentResult {
                        extent: Some(extent),
                        ..
                    }) => {
                        if let Err(e) = self.view.go_to(GoToTarget::Extent(extent)).await {
                            log::warn!("Could not navigate to selection extent: {}", e);
                        }
                    }
                    Ok(_) => log::debug!("Selection {} has no extent", session.generation()),
                    Err(e) => log::warn!(
                        "Extent lookup for selection {} failed: {}",
                        session.generation(),
                        e
                    ),
                }
            }
            PipelineEvent::Failed { error, .. } => {
                log::error!("Selection {} failed: {}", session.generation(), error);
                self.presenter.show_error(error.user_message());
                session.fail(error);
                return true;
            }
        }

        if session.take_list_outcome() {
            let total = session.results().len();
            log::info!(
                "Selection {}: every region reported, {} results",
                session.generation(),
                total
            );
            if total == 0 {
                if session.errors().is_empty() {
                    self.presenter.show_empty();
                } else {
                    let message = session
                        .errors()
                        .iter()
                        .map(GeoQueryError::user_message)
                        .collect::<Vec<_>>()
                        .join("; ");
                    self.presenter.show_error(message);
                }
            }
        }
        if session.try_settle() {
            log::info!("Selection {} settled", session.generation());
        }
        true
    }

    /// Drains events until the current selection settles or fails.
    pub async fn run_until_settled(
        &mut self,
        events: &mut UnboundedReceiver<PipelineEvent>,
    ) -> SelectionPhase {
        while !self.phase().is_terminal() && self.session.is_some() {
            match events.recv().await {
                Some(event) => {
                    self.handle_event(event).await;
                }
                None => break,
            }
        }
        self.phase()
    }

    /// Handles a click on list entry `index`: navigates to the result and
    /// opens its popup. Returns `None` when there is no such result in the
    /// current selection.
    pub async fn activate(&self, index: usize) -> Result<Option<Popup>> {
        let graphic = match self.session.as_ref().and_then(|s| s.result(index)) {
            Some(graphic) => graphic.clone(),
            None => {
                log::debug!("No result at index {} to activate", index);
                return Ok(None);
            }
        };

        let location = graphic.centroid().ok_or_else(|| {
            GeoQueryError::ViewError(format!("Result {} has no location", index))
        })?;
        self.view
            .go_to(GoToTarget::Graphics(vec![graphic.clone()]))
            .await?;

        let rendered = self.popup_template.render(&graphic.feature);
        let popup = Popup {
            title: rendered.title,
            content: rendered.content,
            location,
            feature: graphic.feature,
        };
        self.view.open_popup(popup.clone());
        Ok(Some(popup))
    }

    /// Whether the list currently shows results.
    pub fn has_results(&self) -> bool {
        matches!(self.presenter.list().state(), ListState::Entries(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, FeatureSet};
    use crate::geometry::{Extent, Point};
    use crate::pipeline::PipelineSettings;
    use crate::test_utils::{city, continent, MockFeatureSource};
    use crate::view::Viewport;
    use tokio::sync::Notify;

    fn africa() -> Feature {
        continent("Africa", -18.0, -35.0, 70.0)
    }

    fn europe() -> Feature {
        continent("Europe", -10.0, 36.0, 40.0)
    }

    fn african_cities() -> Vec<Feature> {
        vec![
            city("Cairo", 9_908_788, 31.25, 30.05),
            city("Lagos", 8_789_133, 3.4, 6.45),
            city("Kinshasa", 7_785_965, 15.3, -4.3),
        ]
    }

    fn setup(
        regions: MockFeatureSource,
        points: MockFeatureSource,
    ) -> (Explorer, UnboundedReceiver<PipelineEvent>, Arc<Viewport>) {
        let config = GeoQueryConfig::default();
        let pipeline = QueryPipeline::new(
            Arc::new(regions),
            Arc::new(points),
            PipelineSettings::from(&config),
        );
        let viewport = Arc::new(Viewport::new(&config.map));
        let (explorer, events) = Explorer::new(pipeline, viewport.clone(), &config);
        (explorer, events, viewport)
    }

    fn labels(explorer: &Explorer) -> Vec<String> {
        explorer
            .list()
            .entries()
            .iter()
            .map(|e| e.label.clone())
            .collect()
    }

    fn assert_list_matches_overlay(explorer: &Explorer) {
        let entries = explorer.list().entries();
        assert_eq!(entries.len(), explorer.overlay().len());
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.index, i);
            let graphic = explorer.overlay().get(i).unwrap();
            assert_eq!(graphic.feature.attribute_text("CITY_NAME"), Some(entry.label.clone()));
        }
    }

    #[tokio::test]
    async fn test_select_without_matching_region_shows_empty() {
        let (mut explorer, mut events, _) = setup(
            MockFeatureSource::new("regions"),
            MockFeatureSource::new("points"),
        );
        explorer.select("Atlantis").unwrap();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Settled);
        assert_eq!(explorer.list().state(), &ListState::Empty);
        assert!(explorer.overlay().is_empty());
    }

    #[tokio::test]
    async fn test_empty_list_does_not_wait_for_extent() {
        let gate = Arc::new(Notify::new());
        let points = MockFeatureSource::new("points").with_gated_extent(None, gate.clone());
        let (mut explorer, mut events, _) = setup(MockFeatureSource::new("regions"), points);

        explorer.select("Atlantis").unwrap();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, PipelineEvent::RegionsResolved { count: 0, .. }));
        explorer.handle_event(event).await;
        assert_eq!(explorer.list().state(), &ListState::Empty);
        assert_eq!(explorer.phase(), SelectionPhase::Loading);

        gate.notify_one();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Settled);
        assert_eq!(explorer.list().state(), &ListState::Empty);
    }

    #[tokio::test]
    async fn test_all_failed_error_does_not_wait_for_extent() {
        let gate = Arc::new(Notify::new());
        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'Africa'", vec![africa()]);
        let points = MockFeatureSource::new("points")
            .with_intersection_error(africa().geometry.unwrap(), "timeout")
            .with_gated_extent(None, gate.clone());
        let (mut explorer, mut events, _) = setup(regions, points);

        explorer.select("Africa").unwrap();
        while explorer.list().state() == &ListState::Loading {
            let event = events.recv().await.unwrap();
            assert!(!matches!(event, PipelineEvent::ExtentResolved { .. }));
            explorer.handle_event(event).await;
        }
        assert_eq!(
            explorer.list().state(),
            &ListState::Error("Query failed: timeout".to_string())
        );
        assert_eq!(explorer.phase(), SelectionPhase::Loading);
        gate.notify_one();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Settled);
    }

    #[tokio::test]
    async fn test_single_region_lists_every_point() {
        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'Africa'", vec![africa()]);
        let points = MockFeatureSource::new("points")
            .with_intersection(africa().geometry.unwrap(), african_cities());
        let (mut explorer, mut events, _) = setup(regions, points);

        explorer.select("Africa").unwrap();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Settled);
        assert_eq!(labels(&explorer), vec!["Cairo", "Lagos", "Kinshasa"]);
        assert_list_matches_overlay(&explorer);
        assert!(explorer.has_results());
    }

    #[tokio::test]
    async fn test_multiple_regions_union() {
        let americas = continent("America", -125.0, 15.0, 40.0);
        let south = continent("America", -80.0, -40.0, 30.0);
        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'America'", vec![americas.clone(), south.clone()]);
        let points = MockFeatureSource::new("points")
            .with_intersection(
                americas.geometry.unwrap(),
                vec![city("Denver", 600_158, -105.0, 39.7), city("Mexico City", 8_851_080, -99.1, 19.4)],
            )
            .with_intersection(south.geometry.unwrap(), vec![city("Lima", 7_737_002, -77.0, -12.0)]);
        let (mut explorer, mut events, _) = setup(regions, points);

        explorer.select("America").unwrap();
        explorer.run_until_settled(&mut events).await;

        let mut names = labels(&explorer);
        names.sort();
        assert_eq!(names, vec!["Denver", "Lima", "Mexico City"]);
        assert_list_matches_overlay(&explorer);
        assert_eq!(explorer.session().unwrap().results().len(), 3);
    }

    #[tokio::test]
    async fn test_activating_second_entry_opens_popup() {
        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'Africa'", vec![africa()]);
        let points = MockFeatureSource::new("points")
            .with_intersection(africa().geometry.unwrap(), african_cities())
            .with_extent(Some(Extent::new(-17.0, -34.0, 51.0, 37.0)));
        let (mut explorer, mut events, viewport) = setup(regions, points);

        explorer.select("Africa").unwrap();
        explorer.run_until_settled(&mut events).await;

        let popup = explorer.activate(1).await.unwrap().expect("popup");
        assert_eq!(popup.title, "World Cities: Lagos");
        assert_eq!(popup.content, "The population of Lagos is 8,789,133.");
        assert_eq!(popup.location, Point::new(3.4, 6.45));

        let vp = viewport.viewpoint();
        assert_eq!((vp.center.x, vp.center.y), (3.4, 6.45));
        assert!(vp.zoom >= GeoQueryConfig::default().map.point_zoom);
        assert_eq!(viewport.popup(), Some(popup));
    }

    #[tokio::test]
    async fn test_activation_out_of_range() {
        let (explorer, _events, viewport) = setup(
            MockFeatureSource::new("regions"),
            MockFeatureSource::new("points"),
        );
        assert_eq!(explorer.activate(0).await.unwrap(), None);
        assert_eq!(viewport.navigations(), 0);

        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'Africa'", vec![africa()]);
        let points = MockFeatureSource::new("points")
            .with_intersection(africa().geometry.unwrap(), african_cities());
        let (mut explorer, mut events, _) = setup(regions, points);
        explorer.select("Africa").unwrap();
        explorer.run_until_settled(&mut events).await;
        assert_eq!(explorer.activate(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reselect_discards_previous_generation() {
        let gate = Arc::new(Notify::new());
        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'Africa'", vec![africa()])
            .with_filter_reply("CONTINENT = 'Europe'", vec![europe()]);
        let points = MockFeatureSource::new("points")
            .with_gated_intersection(africa().geometry.unwrap(), african_cities(), gate.clone())
            .with_intersection(
                europe().geometry.unwrap(),
                vec![city("Paris", 2_141_839, 2.35, 48.86), city("Berlin", 3_426_354, 13.4, 52.5)],
            );
        let (mut explorer, mut events, _) = setup(regions, points);

        let first = explorer.select("Africa").unwrap();
        loop {
            let event = events.recv().await.unwrap();
            let resolved = matches!(event, PipelineEvent::RegionsResolved { .. });
            explorer.handle_event(event).await;
            if resolved {
                break;
            }
        }
        assert_eq!(explorer.phase(), SelectionPhase::Loading);

        let second = explorer.select("Europe").unwrap();
        assert!(second > first);
        assert_eq!(explorer.list().state(), &ListState::Loading);
        assert!(explorer.overlay().is_empty());

        // the Africa branch is released only after it was cancelled
        gate.notify_one();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Settled);
        assert_eq!(labels(&explorer), vec!["Paris", "Berlin"]);

        let stale = PipelineEvent::RegionBatch {
            generation: first,
            region_index: 0,
            result: Ok(FeatureSet::from_features(african_cities())),
        };
        assert!(!explorer.handle_event(stale).await);
        assert_eq!(labels(&explorer), vec!["Paris", "Berlin"]);
        assert_list_matches_overlay(&explorer);

        let popup = explorer.activate(0).await.unwrap().unwrap();
        assert_eq!(popup.title, "World Cities: Paris");
    }

    #[tokio::test]
    async fn test_failed_branch_becomes_warning() {
        let north = continent("America", -125.0, 15.0, 40.0);
        let south = continent("America", -80.0, -40.0, 30.0);
        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'America'", vec![north.clone(), south.clone()]);
        let points = MockFeatureSource::new("points")
            .with_intersection_error(north.geometry.unwrap(), "Unable to complete operation")
            .with_intersection(south.geometry.unwrap(), vec![city("Lima", 7_737_002, -77.0, -12.0)]);
        let (mut explorer, mut events, _) = setup(regions, points);

        explorer.select("America").unwrap();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Settled);
        assert_eq!(labels(&explorer), vec!["Lima"]);
        assert_eq!(
            explorer.list().warnings(),
            &["Region 1: Query failed: Unable to complete operation".to_string()]
        );
    }

    #[tokio::test]
    async fn test_all_branches_failed_shows_error() {
        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'Africa'", vec![africa()]);
        let points = MockFeatureSource::new("points")
            .with_intersection_error(africa().geometry.unwrap(), "timeout");
        let (mut explorer, mut events, _) = setup(regions, points);

        explorer.select("Africa").unwrap();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Settled);
        assert_eq!(
            explorer.list().state(),
            &ListState::Error("Query failed: timeout".to_string())
        );
    }

    #[tokio::test]
    async fn test_connect_failure_fails_selection() {
        let regions = MockFeatureSource::new("regions").failing_ready("connection refused");
        let (mut explorer, mut events, _) = setup(regions, MockFeatureSource::new("points"));

        explorer.select("Africa").unwrap();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Failed);
        assert_eq!(
            explorer.list().state(),
            &ListState::Error("Could not connect to regions".to_string())
        );
    }

    #[tokio::test]
    async fn test_extent_failure_is_only_logged() {
        let regions = MockFeatureSource::new("regions")
            .with_filter_reply("CONTINENT = 'Africa'", vec![africa()]);
        let points = MockFeatureSource::new("points")
            .with_intersection(africa().geometry.unwrap(), african_cities())
            .with_extent_error("Field CONTINENT not found");
        let (mut explorer, mut events, _) = setup(regions, points);

        explorer.select("Africa").unwrap();
        assert_eq!(explorer.run_until_settled(&mut events).await, SelectionPhase::Settled);
        assert_eq!(explorer.list().len(), 3);
        assert!(explorer.list().warnings().is_empty());
    }

    #[tokio::test]
    async fn test_region_token_is_escaped() {
        let regions = Arc::new(MockFeatureSource::new("regions"));
        let config = GeoQueryConfig::default();
        let pipeline = QueryPipeline::new(
            regions.clone(),
            Arc::new(MockFeatureSource::new("points")),
            PipelineSettings::from(&config),
        );
        let viewport = Arc::new(Viewport::new(&config.map));
        let (mut explorer, mut events) = Explorer::new(pipeline, viewport, &config);

        explorer.select("Cote d'Ivoire").unwrap();
        explorer.run_until_settled(&mut events).await;
        assert!(regions
            .calls()
            .contains(&"features:CONTINENT = 'Cote d''Ivoire'".to_string()));
    }
}
