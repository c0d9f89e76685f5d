use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Input file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Source '{source_id}' is missing required column '{column}'")]
    MissingColumn { source_id: String, column: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source '{0}' has no rank in the precedence list")]
    UnrankedSource(String),

    #[error("Source '{0}' was supplied more than once")]
    DuplicateSource(String),

    #[error("Cache store error: {0}")]
    CacheStore(String),

    #[error("Interrupted; progress up to the last checkpoint is saved")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Failure of a single call to a translation backend. Always retryable from
/// the caller's point of view; the cache engine decides when to give up.
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Translation service rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Translation service returned an empty result")]
    EmptyResponse,

    #[error("Translation engine error: {0}")]
    Engine(String),

    #[error("Translation timed out after {0}s")]
    Timeout(u64),
}
