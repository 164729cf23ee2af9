use anyhow::Result;
use crossterm::event::Event as CrosstermEvent;
use crossterm::event::{EventStream, KeyCode, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use geoquery_core::{GeoQueryError, PipelineEvent};
use tokio::sync::mpsc;
use tokio::time;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Quit,
    Up,
    Down,
    Enter,
    SwitchFocus,
    ToggleBasemap,
    ReloadRegions,
    ClosePopup,
    Pipeline(PipelineEvent),
    RegionsLoaded(RegionsResult),
    Tick,
}

pub type RegionsResult = Result<Vec<String>, GeoQueryError>;

/// Merges terminal input with the explorer's pipeline events and region
/// listings loaded in the background.
pub struct EventsService {
    crossterm_events: EventStream,
    pipeline: mpsc::UnboundedReceiver<PipelineEvent>,
    regions: mpsc::UnboundedReceiver<RegionsResult>,
}

impl EventsService {
    pub fn new(
        pipeline: mpsc::UnboundedReceiver<PipelineEvent>,
        regions: mpsc::UnboundedReceiver<RegionsResult>,
    ) -> EventsService {
        EventsService {
            crossterm_events: EventStream::new(),
            pipeline,
            regions,
        }
    }

    fn handle_crossterm(&self, event: CrosstermEvent) -> Option<Event> {
        let key = match event {
            CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => key,
            CrosstermEvent::Resize(..) => return Some(Event::Tick),
            _ => return None,
        };

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Event::Quit);
        }
        match key.code {
            KeyCode::Char('q') => Some(Event::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Event::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Event::Down),
            KeyCode::Enter => Some(Event::Enter),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                Some(Event::SwitchFocus)
            }
            KeyCode::Char('b') => Some(Event::ToggleBasemap),
            KeyCode::Char('r') => Some(Event::ReloadRegions),
            KeyCode::Esc => Some(Event::ClosePopup),
            _ => None,
        }
    }

    pub async fn next(&mut self) -> Result<Event> {
        loop {
            let evt = tokio::select! {
                event = self.pipeline.recv() => event.map(Event::Pipeline),
                loaded = self.regions.recv() => loaded.map(Event::RegionsLoaded),
                event = self.crossterm_events.next() => match event {
                    Some(Ok(input)) => self.handle_crossterm(input),
                    Some(Err(e)) => return Err(e.into()),
                    None => None
                },
                _ = time::sleep(time::Duration::from_millis(500)) => Some(Event::Tick)
            };

            if let Some(event) = evt {
                return Ok(event);
            }
        }
    }
}
