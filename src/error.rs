//! Error types for the analytics engine.

use thiserror::Error;

/// Main error type for portfolio analytics operations.
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing weight for asset: {0}")]
    MissingWeight(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParseError(#[from] chrono::ParseError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Optimization error: {0}")]
    OptimizationError(String),
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, FolioError>;
