//! Error types for the trainer_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for trainer_core operations
///
/// Engine control operations never surface these; they only appear at the
/// edges (storage backends, configuration, preset library, validation).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key-value storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Exercise definition cannot be executed
    #[error("{0}")]
    InvalidExercise(String),

    /// Workout or exercise lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
