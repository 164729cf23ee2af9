//! Error types for the selection/query workflow
//!
//! Failures are grouped by where they happen: a feature source that never
//! becomes ready (`ConnectError`), a query the remote service rejected
//! (`QueryError`), and local problems such as configuration or parsing.
//! The explorer turns the first two into user-visible list states.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoQueryError {
    #[error("Feature source '{source_name}' failed to become ready: {message}")]
    ConnectError {
        source_name: String,
        message: String,
    },
    #[error("Query against '{source_name}' failed: {message}")]
    QueryError {
        source_name: String,
        message: String,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Map view error: {0}")]
    ViewError(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    IoError(String),
}

impl GeoQueryError {
    pub fn connect(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn query(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GeoQueryError::Cancelled)
    }

    /// Short text suitable for the result list when a selection fails.
    pub fn user_message(&self) -> String {
        match self {
            GeoQueryError::ConnectError { source_name, .. } => {
                format!("Could not connect to {}", source_name)
            }
            GeoQueryError::QueryError { message, .. } => format!("Query failed: {}", message),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for GeoQueryError {
    fn from(err: std::io::Error) -> Self {
        GeoQueryError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for GeoQueryError {
    fn from(err: serde_json::Error) -> Self {
        GeoQueryError::ParsingError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoQueryError>;
