//! Benchmark error types.

use thiserror::Error;

use crate::query::QueryId;
use crate::sampler::ConfigError;

/// Benchmark errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read or write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// In-process SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Invalid configuration or command-line input.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed dataset or result data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Error reported by a database driver.
    #[error("{backend} error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    /// A query failed while being measured.
    #[error("{query} failed: {source}")]
    Probe {
        query: QueryId,
        #[source]
        source: Box<Error>,
    },

    /// Rejected sampler configuration.
    #[error(transparent)]
    Sampler(#[from] ConfigError),
}

impl Error {
    /// Wrap a driver error for the named backend.
    pub fn backend(backend: &'static str, err: impl std::fmt::Display) -> Self {
        Error::Backend {
            backend,
            message: err.to_string(),
        }
    }
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, Error>;
