//! Runtime configuration for the pipeline.

use std::path::PathBuf;

/// Default number of chunk downloads in flight at once. Keeps the client
/// from saturating bandwidth/connection limits while still overlapping I/O.
pub const DEFAULT_FETCH_BATCH: usize = 3;

/// Config bag for the dialogue store. All fields have defaults via
/// [`StoreConfig::from_env`].
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Base URL the manifest and chunk files are served under.
    pub base_url: String,
    /// Data version the corpus must be loaded at.
    pub data_version: String,
    /// Path of the SQLite chunk cache.
    pub db_path: PathBuf,
    /// Chunk downloads per batch.
    pub batch_size: usize,
}

impl StoreConfig {
    pub fn new(
        base_url: impl Into<String>,
        data_version: impl Into<String>,
        db_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            data_version: data_version.into(),
            db_path: db_path.into(),
            batch_size: DEFAULT_FETCH_BATCH,
        }
    }

    /// Build from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: env("SEARCH_BASE_URL", "http://127.0.0.1:8080/data/chunks"),
            data_version: env("SEARCH_DATA_VERSION", "dev"),
            db_path: PathBuf::from(env("SEARCH_DB_PATH", "search_cache.db")),
            batch_size: parse("SEARCH_FETCH_BATCH", DEFAULT_FETCH_BATCH),
        }
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k).unwrap_or_else(|_| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(dflt)
}
