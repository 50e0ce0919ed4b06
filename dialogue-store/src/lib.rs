//! Chunked dialogue-corpus pipeline: manifest-driven download, gzip
//! decompression, SQLite-backed caching, and in-memory filter queries.
//!
//! This crate provides a clean API to:
//! - Ensure the dialogue corpus for a given data version is loaded,
//!   replaying the local cache when the version matches and downloading
//!   chunk files otherwise
//! - Run synchronous filter queries (speaker / scenario type / content
//!   pattern) over the assembled corpus
//! - Inspect and clear the persistent chunk cache
//!
//! The design is flat (no deep nesting) and splits responsibilities into
//! focused modules; [`DialogueStore`] is the single entry point recommended
//! for application code.

mod config;
mod errors;
mod fetch;
mod index;
mod loader;
mod manifest;
mod progress;
mod record;
mod store;

pub use config::{DEFAULT_FETCH_BATCH, StoreConfig};
pub use errors::{Result, SearchError};
pub use index::{Corpus, ResultGroup, SearchFilter, group_results};
pub use loader::LoadEvent;
pub use manifest::{CacheMetadata, ChunkEntry, ChunkManifest, ChunkPayload};
pub use progress::{BarProgress, NoopProgress, Progress};
pub use record::{DialogueRecord, ScenarioType};
pub use store::ChunkStore;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, mpsc};
use tracing::trace;

use crate::loader::LoadRequest;

/// UI-facing facade over the background loader and the corpus index.
///
/// Construct once at startup; the loader worker task is spawned here and
/// owned for the lifetime of the facade. Queries are synchronous and only
/// succeed after a load cycle completed.
pub struct DialogueStore {
    cfg: StoreConfig,
    requests: mpsc::Sender<LoadRequest>,
    /// Serializes load cycles; makes the single-in-flight-load rule an
    /// object invariant rather than a convention.
    load_gate: Mutex<()>,
    /// Current corpus generation. Replaced atomically on a successful load;
    /// in-flight readers keep their `Arc` clone of the old generation.
    loaded: RwLock<Option<(String, Arc<Corpus>)>>,
}

impl DialogueStore {
    /// Constructs the facade and spawns the loader worker. Must be called
    /// from within a tokio runtime.
    pub fn new(cfg: StoreConfig) -> Self {
        trace!(base_url = %cfg.base_url, version = %cfg.data_version, "DialogueStore::new");
        let requests = loader::spawn(cfg.clone());
        Self {
            cfg,
            requests,
            load_gate: Mutex::new(()),
            loaded: RwLock::new(None),
        }
    }

    /// Ensures the corpus at the configured data version is queryable.
    ///
    /// Idempotent start: concurrent callers share one load cycle. The
    /// first runs it, the rest wait on the gate and observe the installed
    /// generation. Progress and phase messages are forwarded to `progress`.
    ///
    /// # Errors
    /// Any loader-level error terminates the cycle and is returned as-is;
    /// retry is a new `ensure_loaded` call, optionally after
    /// [`clear_cache`](Self::clear_cache).
    pub async fn ensure_loaded(&self, progress: &dyn Progress) -> Result<()> {
        let _gate = self.load_gate.lock().await;
        if self.loaded_version().as_deref() == Some(self.cfg.data_version.as_str()) {
            trace!("corpus already loaded at requested version");
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel(32);
        self.requests
            .send(LoadRequest::Load {
                version: self.cfg.data_version.clone(),
                events: tx,
            })
            .await
            .map_err(|_| SearchError::WorkerGone)?;

        while let Some(event) = rx.recv().await {
            match event {
                LoadEvent::Log(msg) => progress.message(&msg),
                LoadEvent::Progress {
                    current,
                    total,
                    message,
                } => progress.advance(u64::from(current), u64::from(total), &message),
                LoadEvent::Complete {
                    dialogues,
                    event_names,
                } => {
                    let count = dialogues.len();
                    self.install(Corpus {
                        dialogues,
                        event_names,
                    });
                    progress.finish(&format!("{count} dialogues ready"));
                    return Ok(());
                }
                LoadEvent::Error { error } => return Err(error),
            }
        }
        Err(SearchError::WorkerGone)
    }

    /// Runs one filter query over the current corpus generation.
    ///
    /// # Errors
    /// [`SearchError::NotLoaded`] before the first successful load,
    /// [`SearchError::InvalidPattern`] for a bad content pattern.
    pub fn search(&self, filter: &SearchFilter) -> Result<Vec<DialogueRecord>> {
        self.current()?.search(filter)
    }

    /// The event-id → display-name table delivered with the corpus.
    pub fn event_names(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.current()?.event_names.clone())
    }

    /// Destroys the persistent cache and discards the in-memory corpus.
    /// Safe to call when no cache exists.
    pub async fn clear_cache(&self) -> Result<()> {
        let path = self.cfg.db_path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            if !path.exists() {
                return Ok(());
            }
            ChunkStore::open(&path)?.delete_all()
        })
        .await??;

        let mut loaded = self.loaded.write().unwrap_or_else(|e| e.into_inner());
        *loaded = None;
        Ok(())
    }

    /// Approximate size of the persistent cache in bytes; 0 when nothing
    /// was ever cached. Walks every stored value, so this is O(n) over the
    /// whole cache; keep it off hot paths.
    pub async fn estimate_cache_size(&self) -> Result<u64> {
        let path = self.cfg.db_path.clone();
        tokio::task::spawn_blocking(move || -> Result<u64> {
            if !path.exists() {
                return Ok(0);
            }
            ChunkStore::open(&path)?.estimate_size()
        })
        .await?
    }

    fn current(&self) -> Result<Arc<Corpus>> {
        let loaded = self.loaded.read().unwrap_or_else(|e| e.into_inner());
        loaded
            .as_ref()
            .map(|(_, corpus)| Arc::clone(corpus))
            .ok_or(SearchError::NotLoaded)
    }

    fn loaded_version(&self) -> Option<String> {
        let loaded = self.loaded.read().unwrap_or_else(|e| e.into_inner());
        loaded.as_ref().map(|(v, _)| v.clone())
    }

    fn install(&self, corpus: Corpus) {
        let mut loaded = self.loaded.write().unwrap_or_else(|e| e.into_inner());
        *loaded = Some((self.cfg.data_version.clone(), Arc::new(corpus)));
    }
}
