//! Error types for schema loading and server configuration

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the spell metadata file
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read metadata file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metadata: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to interpret the client's initialization options
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid initialization options: {0}")]
    InvalidOptions(#[source] serde_json::Error),
}
