use super::app_state::{AppState, Focus};
use geoquery_core::popup::format_number;
use geoquery_core::presenter::ListState as ResultListState;
use geoquery_core::symbology;
use geoquery_core::view::Viewport;
use geoquery_core::{Explorer, SelectionPhase};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

const HELP: &str = "Enter select/open  Tab switch pane  b basemap  r reload  Esc close popup  q quit";

pub fn draw(frame: &mut Frame, state: &AppState, explorer: &Explorer, viewport: &Viewport) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, rows[0], state, explorer, viewport);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(22),
            Constraint::Percentage(38),
            Constraint::Percentage(40),
        ])
        .split(rows[1]);

    draw_regions(frame, columns[0], state);
    draw_results(frame, columns[1], state, explorer);
    draw_details(frame, columns[2], explorer, viewport);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(state.status.clone(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(HELP, Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(footer, rows[2]);
}

fn pane(title: &str, focused: bool) -> Block<'_> {
    let border = if focused { Color::Cyan } else { Color::Gray };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn draw_header(frame: &mut Frame, area: Rect, state: &AppState, explorer: &Explorer, viewport: &Viewport) {
    let viewpoint = viewport.viewpoint();
    let phase = match explorer.phase() {
        SelectionPhase::Idle => "idle",
        SelectionPhase::Loading => "loading",
        SelectionPhase::PartialResults => "receiving",
        SelectionPhase::Settled => "settled",
        SelectionPhase::Failed => "failed",
    };
    let header = Line::from(vec![
        Span::styled(
            " geoquery ",
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " basemap: {} (next {})  scale: {}  selection {}: {}",
            state.basemap.active(),
            state.basemap.next(),
            state.scale_bar.label(&viewpoint.extent()),
            explorer.generation(),
            phase
        )),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn draw_regions(frame: &mut Frame, area: Rect, state: &AppState) {
    let items: Vec<ListItem> = state
        .regions
        .iter()
        .map(|r| ListItem::new(r.as_str()))
        .collect();
    let list = List::new(items)
        .block(pane("Regions", state.focus == Focus::Regions))
        .highlight_style(
            Style::default()
                .fg(to_color(state.region_outline))
                .add_modifier(Modifier::REVERSED),
        );

    let mut list_state = ListState::default();
    if !state.regions.is_empty() {
        list_state.select(Some(state.region_cursor));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn to_color(color: symbology::Color) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn draw_results(frame: &mut Frame, area: Rect, state: &AppState, explorer: &Explorer) {
    let block = pane("Results", state.focus == Focus::Results);
    let placeholder = match explorer.list().state() {
        ResultListState::Idle => Some("Pick a region and press Enter".to_string()),
        ResultListState::Loading => Some("Loading...".to_string()),
        ResultListState::Empty => Some("No results".to_string()),
        ResultListState::Error(message) => Some(format!("Error: {}", message)),
        ResultListState::Entries(_) => None,
    };
    if let Some(text) = placeholder {
        let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = explorer
        .list()
        .entries()
        .iter()
        .map(|entry| {
            let feature = explorer.overlay().get(entry.index).map(|g| &g.feature);
            let color = feature
                .map(|f| to_color(state.renderer.style_for(f).color))
                .unwrap_or(Color::White);
            let legend = feature
                .and_then(|f| state.renderer.legend_label_for(f))
                .unwrap_or("");
            let value = entry
                .value
                .map(|v| format_number(v, Some(0), true))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled("\u{25a0} ", Style::default().fg(color)),
                Span::raw(format!("{:<24}", entry.label)),
                Span::styled(format!("{:>12}", value), Style::default().fg(Color::Gray)),
                Span::styled(format!("  {}", legend), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default();
    list_state.select(Some(state.result_cursor));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_details(frame: &mut Frame, area: Rect, explorer: &Explorer, viewport: &Viewport) {
    let viewpoint = viewport.viewpoint();
    let extent = viewpoint.extent();
    let mut lines = vec![
        Line::from(format!(
            "Center  {:.3}, {:.3}",
            viewpoint.center.x, viewpoint.center.y
        )),
        Line::from(format!("Zoom    {:.1}", viewpoint.zoom)),
        Line::from(format!(
            "Extent  {:.1}, {:.1} .. {:.1}, {:.1}",
            extent.xmin, extent.ymin, extent.xmax, extent.ymax
        )),
        Line::from(format!("Overlay {} graphics", explorer.overlay().len())),
        Line::from(""),
    ];

    if let Some(popup) = viewport.popup() {
        lines.push(Line::from(Span::styled(
            popup.title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(popup.content));
        lines.push(Line::from(Span::styled(
            format!("at {:.4}, {:.4}", popup.location.x, popup.location.y),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
    }

    for warning in explorer.list().warnings() {
        lines.push(Line::from(Span::styled(
            format!("! {}", warning),
            Style::default().fg(Color::Yellow),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(pane("Map", false))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
