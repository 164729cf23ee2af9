//! Front ends for the geoquery explorer
//!
//! `commands` holds the one-shot subcommands that print to stdout; `tui`
//! is the interactive explorer drawn with ratatui.

pub mod commands;
pub mod tui;
