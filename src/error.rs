// src/error.rs

use thiserror::Error;

/// Core error types for mysql2graph
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to connect to the source MySQL database. Fatal at start.
    #[error("failed to connect to mysql at {host}:{port}/{database}: {source}")]
    Connection {
        host: String,
        port: u16,
        database: String,
        #[source]
        source: mysql::Error,
    },

    /// A MySQL query failed in a context with no safe way to recover and
    /// continue. Per-table schema-read failures are logged and skipped
    /// rather than surfaced as this variant (see schema::reader).
    #[error("mysql query failed: {0}")]
    Query(#[from] mysql::Error),

    /// The output sink could not be written to; no reliable recovery path.
    #[error("failed to write output to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error outside of the write path above (creating the output
    /// directory, reading back a persisted mapping file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The supplied configuration is invalid (e.g. zero workers).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization error while persisting structured output.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using mysql2graph's Error type
pub type Result<T> = std::result::Result<T, Error>;
