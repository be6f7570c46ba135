use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Input file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid feed: {0}")]
    InvalidFeed(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to import record '{record}': {source}")]
    Record {
        record: String,
        #[source]
        source: Box<ImportError>,
    },

    #[error("Validation failed: {records} record(s) with issues")]
    ValidationFailed { records: usize },
}

impl ImportError {
    pub fn for_record(record: impl Into<String>, source: ImportError) -> Self {
        ImportError::Record {
            record: record.into(),
            source: Box::new(source),
        }
    }
}

/// Failures of a single geocoding lookup. These never escape the enricher.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider answered with status {0}")]
    Status(u16),

    #[error("Unusable provider response: {0}")]
    BadResponse(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;
