//! Unified error types for the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

/// Top-level error for dialogue-store operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Manifest fetch failed or the body was not valid manifest JSON.
    #[error("manifest unavailable: {0}")]
    ManifestUnavailable(String),

    /// One chunk download came back with a non-success HTTP status.
    #[error("chunk download failed: {filename} (status {status})")]
    ChunkDownload { filename: String, status: u16 },

    /// Decompression or JSON parsing of a downloaded chunk failed.
    #[error("chunk decode failed: {filename}: {reason}")]
    ChunkDecode { filename: String, reason: String },

    /// Cache metadata claims a chunk index that is not in the store.
    #[error("cache corrupted: missing chunk_{index}")]
    CacheCorrupted { index: u32 },

    /// The local store could not be opened or initialized.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// User-supplied content pattern failed to compile as a regex.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),

    /// A query arrived before any load cycle completed.
    #[error("corpus is not loaded yet")]
    NotLoaded,

    /// The background loader task is gone (channel closed).
    #[error("loader worker is not running")]
    WorkerGone,

    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// HTTP/transport errors from the chunk fetcher.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Errors from the SQLite chunk cache.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Task join error.
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
