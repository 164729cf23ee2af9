//! Interactive terminal explorer.
//!
//! The loop owns the `Explorer` and feeds it key presses, pipeline events
//! and background region listings, so every state change happens on this
//! task and a slow service never blocks input.

pub mod app_state;
pub mod events;
pub mod ui;

use anyhow::Result;
use app_state::{AppState, Focus};
use crossterm::{
    cursor,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use events::{Event, EventsService, RegionsResult};
use geoquery_core::config::GeoQueryConfig;
use geoquery_core::view::{MapView, Viewport};
use geoquery_core::{Explorer, QueryPipeline};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run(config: GeoQueryConfig) -> Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        destruct_terminal_for_panic();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen)?;

    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let result = start_loop(&mut terminal, &config).await;

    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    let _ = crossterm::execute!(io::stdout(), cursor::Show);

    if result.is_err() {
        destruct_terminal_for_panic();
    }
    result
}

async fn start_loop<B: Backend>(terminal: &mut Terminal<B>, config: &GeoQueryConfig) -> Result<()> {
    let viewport = Arc::new(Viewport::new(&config.map));
    let view: Arc<dyn MapView> = viewport.clone();
    let (mut explorer, pipeline_events) =
        Explorer::new(QueryPipeline::from_config(config), view, config);
    let (regions_tx, regions_rx) = mpsc::unbounded_channel();
    let mut events = EventsService::new(pipeline_events, regions_rx);
    let mut state = AppState::new(config);

    if state.begin_region_load() {
        spawn_region_load(explorer.pipeline().clone(), regions_tx.clone());
    }

    while !state.exit {
        terminal.draw(|frame| ui::draw(frame, &state, &explorer, &viewport))?;

        match events.next().await? {
            Event::Quit => state.exit = true,
            Event::Up => state.move_up(),
            Event::Down => state.move_down(explorer.list().len()),
            Event::SwitchFocus => state.switch_focus(),
            Event::Enter => match state.focus {
                Focus::Regions => {
                    let Some(region) = state.selected_region().map(str::to_string) else {
                        continue;
                    };
                    state.reset_results();
                    match explorer.select(&region) {
                        Ok(generation) => {
                            state.status = format!("Selecting {} ({})", region, generation);
                            state.focus = Focus::Results;
                        }
                        Err(e) => state.status = e.user_message(),
                    }
                }
                Focus::Results => match explorer.activate(state.result_cursor).await {
                    Ok(Some(popup)) => state.status = popup.title,
                    Ok(None) => {}
                    Err(e) => state.status = e.user_message(),
                },
            },
            Event::ToggleBasemap => {
                let active = state.basemap.toggle().to_string();
                log::info!("Basemap switched to {}", active);
                state.status = format!("Basemap: {}", active);
            }
            Event::ReloadRegions => {
                if state.begin_region_load() {
                    spawn_region_load(explorer.pipeline().clone(), regions_tx.clone());
                }
            }
            Event::RegionsLoaded(result) => state.regions_loaded(result),
            Event::ClosePopup => viewport.close_popup(),
            Event::Pipeline(event) => {
                explorer.handle_event(event).await;
            }
            Event::Tick => {}
        }
    }

    if let Some(session) = explorer.session() {
        session.cancel();
    }
    Ok(())
}

fn spawn_region_load(pipeline: QueryPipeline, tx: mpsc::UnboundedSender<RegionsResult>) {
    tokio::spawn(async move {
        let result = pipeline.list_regions().await;
        if tx.send(result).is_err() {
            log::debug!("Region listing finished after the UI closed");
        }
    });
}

pub fn destruct_terminal_for_panic() {
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
}
