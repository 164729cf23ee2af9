//! One-shot subcommands

use anyhow::{bail, Result};
use geoquery_core::config::GeoQueryConfig;
use geoquery_core::popup::format_number;
use geoquery_core::presenter::{ListEntry, ListState};
use geoquery_core::view::{MapView, Viewport};
use geoquery_core::widgets::ScaleBar;
use geoquery_core::{Explorer, QueryPipeline, SelectionPhase};
use std::sync::Arc;
use std::time::Duration;

const SETTLE_MARGIN: Duration = Duration::from_secs(5);

pub async fn print_regions(config: &GeoQueryConfig, details: bool) -> Result<()> {
    let pipeline = QueryPipeline::from_config(config);
    if details {
        for feature in pipeline.region_summaries().await? {
            let popup = config.popups.regions.render(&feature);
            println!("{}", popup.content);
        }
        return Ok(());
    }

    let regions = pipeline.list_regions().await?;
    if regions.is_empty() {
        println!("No regions found in {}", config.service.regions_url);
    }
    for region in regions {
        println!("{}", region);
    }
    Ok(())
}

pub async fn run_selection(
    config: &GeoQueryConfig,
    region: &str,
    activate: Option<usize>,
) -> Result<()> {
    let viewport = Arc::new(Viewport::new(&config.map));
    let view: Arc<dyn MapView> = viewport.clone();
    let (mut explorer, mut events) = Explorer::new(QueryPipeline::from_config(config), view, config);

    let generation = explorer.select(region)?;
    let limit = settle_limit(config.timeout());
    let phase = match tokio::time::timeout(limit, explorer.run_until_settled(&mut events)).await {
        Ok(phase) => phase,
        Err(_) => bail!("Selection {} did not settle within {:?}", generation, limit),
    };

    println!("Selection {} for '{}'", generation, region);
    match explorer.list().state() {
        ListState::Entries(entries) => {
            println!("{} results", entries.len());
            for entry in entries {
                println!("{}", format_entry(entry));
            }
        }
        ListState::Empty => println!("No results"),
        ListState::Error(message) => println!("Error: {}", message),
        ListState::Idle | ListState::Loading => println!("Still loading"),
    }
    for warning in explorer.list().warnings() {
        println!("warning: {}", warning);
    }

    if let Some(index) = activate {
        match explorer.activate(index).await? {
            Some(popup) => {
                println!();
                println!("{}", popup.title);
                println!("{}", popup.content);
                println!("at ({:.4}, {:.4})", popup.location.x, popup.location.y);
            }
            None => println!("No result at index {}", index),
        }
    }

    let viewpoint = viewport.viewpoint();
    println!();
    println!(
        "View: center ({:.3}, {:.3}) zoom {:.1}, scale {}",
        viewpoint.center.x,
        viewpoint.center.y,
        viewpoint.zoom,
        ScaleBar::new(&config.map).label(&viewpoint.extent())
    );

    if phase == SelectionPhase::Failed {
        bail!("Selection for '{}' failed", region);
    }
    Ok(())
}

/// Readiness, region query and spatial query run one after another, each
/// bounded by `request_timeout`. The margin lets a branch that hit its own
/// timeout still report its error.
fn settle_limit(request_timeout: Duration) -> Duration {
    request_timeout * 3 + SETTLE_MARGIN
}

fn format_entry(entry: &ListEntry) -> String {
    match entry.value {
        Some(value) => format!(
            "  [{}] {} ({})",
            entry.index,
            entry.label,
            format_number(value, Some(0), true)
        ),
        None => format!("  [{}] {}", entry.index, entry.label),
    }
}
