//! Error types for mifit-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the mifit-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Authorization code or app token could not be obtained
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Listing or detail call failed or returned unusable data
    #[error("remote fetch error: {0}")]
    RemoteFetch(String),

    /// Cache file could not be read or written
    #[error("cache I/O error on {}: {source}", .path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache file exists but does not hold the expected JSON
    #[error("invalid cache file {}: {message}", .path.display())]
    CacheFormat { path: PathBuf, message: String },

    /// Summary entry without a usable track id or source
    #[error("invalid track: {0}")]
    InvalidTrack(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Export failure
    #[error("export error: {0}")]
    Export(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::CacheIo {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for mifit-core
pub type Result<T> = std::result::Result<T, Error>;
