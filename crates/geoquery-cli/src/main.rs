use anyhow::Result;
use clap::{Parser, Subcommand};
use geoquery_cli::{commands, tui};
use geoquery_core::config::{ConfigLoader, GeoQueryConfig, DEFAULT_CONFIG_FILE};
use log::LevelFilter;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "geoquery",
    author,
    version = "0.1.0",
    about = "Explore the points of interest inside a region of a feature service"
)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(
        long,
        short,
        default_value = DEFAULT_CONFIG_FILE,
        help = "Configuration file; built-in defaults are used when it does not exist"
    )]
    config: String,

    #[clap(long, short, help = "Log level (overrides logging.level from the config)")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the regions that can be selected
    Regions {
        #[clap(long, help = "Print each region's attributes using the region popup")]
        details: bool,
    },
    /// Run one selection and print the results
    Select {
        /// Region name, e.g. "Africa"
        region: String,

        #[clap(long, help = "Activate the result at this list index and print its popup")]
        activate: Option<usize>,
    },
    /// Interactive terminal explorer (default command)
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(&cli.config);
    let config = ConfigLoader::load_or_default(&config_path).await?;

    let command = cli.command.unwrap_or(Commands::Tui);
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, &config, matches!(command, Commands::Tui))?;
    log::info!("Using configuration {}", config_path.display());

    match command {
        Commands::Regions { details } => commands::print_regions(&config, details).await,
        Commands::Select { region, activate } => {
            commands::run_selection(&config, &region, activate).await
        }
        Commands::Tui => tui::run(config).await,
    }
}

/// Falls back to the per-user config directory when the default file is
/// not in the working directory.
fn resolve_config_path(requested: &str) -> PathBuf {
    let path = PathBuf::from(requested);
    if path.exists() || requested != DEFAULT_CONFIG_FILE {
        return path;
    }
    dirs::config_dir()
        .map(|dir| dir.join("geoquery").join(DEFAULT_CONFIG_FILE))
        .filter(|candidate| candidate.exists())
        .unwrap_or(path)
}

fn init_logging(level: &str, config: &GeoQueryConfig, to_file: bool) -> Result<()> {
    let log_level_filter = match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    if to_file {
        // the terminal UI owns the screen, so logs go to a file
        let log_file = open_log_file(&config.logging.file)?;
        env_logger::Builder::new()
            .filter_level(log_level_filter)
            .target(env_logger::Target::Pipe(Box::new(log_file)))
            .init();
    } else {
        env_logger::Builder::new()
            .filter_level(log_level_filter)
            .init();
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    use anyhow::Context;
    use std::fs::OpenOptions;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))
}
