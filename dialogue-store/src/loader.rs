//! Background loader: the worker task that turns "I need the corpus at
//! version V" into a cache-hit replay or a full fetch-and-persist cycle.
//!
//! The worker owns the whole cycle: `CheckingCache` → `ReplayingCache` or
//! `Downloading`/`Persisting` → `Complete`, with `Errored` reachable from
//! anywhere. It receives [`LoadRequest`]s on an mpsc channel and reports
//! back on a per-request event channel; nothing is shared with the caller,
//! the assembled collection crosses the channel exactly once per cycle.
//!
//! A dropped event receiver does not abort the cycle: the page may have
//! navigated away, the load still completes and the cache stays warm.

use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::StoreConfig;
use crate::errors::{Result, SearchError};
use crate::fetch::ChunkFetcher;
use crate::manifest::CacheMetadata;
use crate::record::DialogueRecord;
use crate::store::ChunkStore;

/// Request accepted by the worker task.
#[derive(Debug)]
pub enum LoadRequest {
    Load {
        version: String,
        events: mpsc::Sender<LoadEvent>,
    },
}

/// Tagged events the worker emits while serving one request.
#[derive(Debug)]
pub enum LoadEvent {
    /// Coarse phase message.
    Log(String),
    /// One chunk finished (from network or cache).
    Progress {
        current: u32,
        total: u32,
        message: String,
    },
    /// Terminal: the assembled corpus, in chunk order.
    Complete {
        dialogues: Vec<DialogueRecord>,
        event_names: BTreeMap<String, String>,
    },
    /// Terminal: the cycle failed; no partial corpus is ever delivered.
    Error { error: SearchError },
}

/// Spawns the worker task and returns its request channel. The task exits
/// when every sender is dropped.
pub fn spawn(cfg: StoreConfig) -> mpsc::Sender<LoadRequest> {
    let (tx, mut rx) = mpsc::channel::<LoadRequest>(8);
    tokio::spawn(async move {
        let worker = LoaderWorker {
            fetcher: ChunkFetcher::new(cfg.base_url.clone()),
            cfg,
        };
        while let Some(LoadRequest::Load { version, events }) = rx.recv().await {
            match worker.run_cycle(&version, &events).await {
                Ok((dialogues, event_names)) => {
                    info!(count = dialogues.len(), "load cycle complete");
                    let _ = events
                        .send(LoadEvent::Complete {
                            dialogues,
                            event_names,
                        })
                        .await;
                }
                Err(err) => {
                    error!(error = %err, "load cycle failed");
                    let _ = events.send(LoadEvent::Error { error: err }).await;
                }
            }
        }
        debug!("loader worker shut down");
    });
    tx
}

struct LoaderWorker {
    cfg: StoreConfig,
    fetcher: ChunkFetcher,
}

type CycleOutput = (Vec<DialogueRecord>, BTreeMap<String, String>);

impl LoaderWorker {
    #[instrument(skip_all, fields(version = %version))]
    async fn run_cycle(
        &self,
        version: &str,
        events: &mpsc::Sender<LoadEvent>,
    ) -> Result<CycleOutput> {
        let _ = events.send(LoadEvent::Log("checking cache".into())).await;

        // Exclusive handle: the store is held across awaits, and the
        // underlying connection is Send but not Sync.
        let mut store = ChunkStore::open(&self.cfg.db_path)?;
        let cached = match store.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                warn!(error = %err, "unreadable cache metadata, treating as absent");
                None
            }
        };

        if let Some(meta) = cached {
            if meta.version == version {
                return self.replay_cache(&mut store, &meta, events).await;
            }
            info!(cached = %meta.version, requested = %version, "cache version mismatch");
        }

        // Stale or absent cache: purge before any new write so a crashed or
        // superseded run can never leave chunk entries the next metadata
        // record would misattribute.
        store.delete_all()?;
        self.download(version, &mut store, events).await
    }

    /// Cache hit: stream every cached chunk back into memory, in order.
    /// A broken cache is purged before the error surfaces, so the next
    /// attempt takes the download path instead of replaying the same
    /// corruption.
    async fn replay_cache(
        &self,
        store: &mut ChunkStore,
        meta: &CacheMetadata,
        events: &mpsc::Sender<LoadEvent>,
    ) -> Result<CycleOutput> {
        info!(total = meta.total_chunks, "replaying cached chunks");
        let mut dialogues = Vec::new();

        for i in 0..meta.total_chunks {
            // A missing index is fatal: silently skipping would desync the
            // displayed counts from the actual content.
            let Some(payload) = store.chunk(i)? else {
                store.delete_all()?;
                return Err(SearchError::CacheCorrupted { index: i });
            };
            dialogues.extend(payload.dialogues);
            let _ = events
                .send(LoadEvent::Progress {
                    current: i + 1,
                    total: meta.total_chunks,
                    message: format!("chunk {}/{} from cache", i + 1, meta.total_chunks),
                })
                .await;
        }

        Ok((dialogues, meta.event_names.clone()))
    }

    /// Cache miss: fetch the manifest, then download, persist and
    /// accumulate every chunk batch-by-batch. Metadata is written only
    /// after the last chunk write succeeded.
    async fn download(
        &self,
        version: &str,
        store: &mut ChunkStore,
        events: &mpsc::Sender<LoadEvent>,
    ) -> Result<CycleOutput> {
        let manifest = self.fetcher.fetch_manifest().await?;
        if manifest.version != version {
            warn!(
                requested = %version,
                manifest = %manifest.version,
                "manifest version differs from requested"
            );
        }

        let total = manifest.total_chunks;
        info!(total, version = %manifest.version, "downloading chunks");
        let _ = events
            .send(LoadEvent::Progress {
                current: 0,
                total,
                message: "manifest fetched".into(),
            })
            .await;

        let mut dialogues = Vec::new();
        for batch in manifest.chunks.chunks(self.cfg.batch_size.max(1)) {
            let payloads = self.fetcher.fetch_batch(batch).await?;
            for (entry, payload) in batch.iter().zip(payloads) {
                store.put_chunk(entry.index, &payload)?;
                dialogues.extend(payload.dialogues);
                let _ = events
                    .send(LoadEvent::Progress {
                        current: entry.index + 1,
                        total,
                        message: format!("chunk {}/{} downloaded", entry.index + 1, total),
                    })
                    .await;
            }
        }

        store.put_metadata(&CacheMetadata {
            version: manifest.version.clone(),
            timestamp: Utc::now().timestamp_millis(),
            total_chunks: total,
            event_names: manifest.event_names.clone(),
        })?;
        debug!(total, "all chunks persisted, metadata written");

        Ok((dialogues, manifest.event_names))
    }
}
