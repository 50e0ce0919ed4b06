//! SQLite-backed chunk cache.
//!
//! One namespaced key-value table holds the decompressed chunk payloads
//! (`chunk_<i>`) plus a single metadata record (`metadata`). Values are JSON
//! text; each key's write is atomic and last-write-wins. The loader writes
//! metadata strictly after all chunk writes for a version succeed, so
//! readers must trust the chunk entries only up to the count the metadata
//! claims.
//!
//! The API is synchronous. Every use-site opens its own connection, so
//! loader-side writes and facade-side reads/clears are serialized by
//! SQLite's own locking rather than application-level locks.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, trace};

use crate::errors::{Result, SearchError};
use crate::manifest::{CacheMetadata, ChunkPayload};

const METADATA_KEY: &str = "metadata";

/// Handle over the local chunk cache.
#[derive(Debug)]
pub struct ChunkStore {
    conn: Connection,
}

impl ChunkStore {
    /// Opens (and on first use creates) the store at `path`.
    ///
    /// # Errors
    /// Returns [`SearchError::StoreUnavailable`] when the database cannot be
    /// opened or initialized (missing parent dir, permissions, quota).
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| SearchError::StoreUnavailable(e.to_string()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| SearchError::StoreUnavailable(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS search_cache (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| SearchError::StoreUnavailable(e.to_string()))?;
        trace!(path = %path.display(), "chunk store opened");
        Ok(Self { conn })
    }

    /// Returns the persisted metadata record, or `None` when absent.
    pub fn metadata(&self) -> Result<Option<CacheMetadata>> {
        match self.get_raw(METADATA_KEY)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Upserts the metadata record. Callers must only do this after every
    /// chunk write for the same version succeeded.
    pub fn put_metadata(&self, meta: &CacheMetadata) -> Result<()> {
        self.put_raw(METADATA_KEY, &serde_json::to_string(meta)?)
    }

    /// Returns the cached payload for chunk `index`, or `None` when absent.
    pub fn chunk(&self, index: u32) -> Result<Option<ChunkPayload>> {
        match self.get_raw(&chunk_key(index))? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Upserts the payload for chunk `index`.
    pub fn put_chunk(&self, index: u32, payload: &ChunkPayload) -> Result<()> {
        self.put_raw(&chunk_key(index), &serde_json::to_string(payload)?)
    }

    /// Destroys every entry in the store. Safe to call on an empty store.
    pub fn delete_all(&self) -> Result<()> {
        let n = self.conn.execute("DELETE FROM search_cache", [])?;
        debug!(deleted = n, "chunk store purged");
        Ok(())
    }

    /// Sums the serialized size of every stored value, in bytes.
    ///
    /// This walks the whole store, so it is O(n) over all cached chunks.
    /// Keep it off hot paths; it exists for cache-management UI only.
    pub fn estimate_size(&self) -> Result<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM search_cache",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM search_cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO search_cache (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

fn chunk_key(index: u32) -> String {
    format!("chunk_{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DialogueRecord, ScenarioType};
    use std::collections::BTreeMap;

    fn payload(n: usize) -> ChunkPayload {
        ChunkPayload {
            dialogues: (0..n)
                .map(|i| DialogueRecord {
                    scenario_type: ScenarioType::Main,
                    scenario_id: format!("1-{i}"),
                    speaker: "Oz".into(),
                    content: format!("line {i}"),
                    title: String::new(),
                })
                .collect(),
        }
    }

    fn meta(version: &str, total: u32) -> CacheMetadata {
        CacheMetadata {
            version: version.into(),
            timestamp: 0,
            total_chunks: total,
            event_names: BTreeMap::new(),
        }
    }

    #[test]
    fn round_trips_chunks_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::open(&dir.path().join("cache.db")).unwrap();

        assert!(store.metadata().unwrap().is_none());
        assert!(store.chunk(0).unwrap().is_none());

        store.put_chunk(0, &payload(3)).unwrap();
        store.put_metadata(&meta("v1", 1)).unwrap();

        let m = store.metadata().unwrap().unwrap();
        assert_eq!(m.version, "v1");
        assert_eq!(store.chunk(0).unwrap().unwrap().dialogues.len(), 3);
        // upsert is last-write-wins
        store.put_chunk(0, &payload(5)).unwrap();
        assert_eq!(store.chunk(0).unwrap().unwrap().dialogues.len(), 5);
    }

    #[test]
    fn estimate_size_grows_with_content_and_purge_resets() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::open(&dir.path().join("cache.db")).unwrap();

        assert_eq!(store.estimate_size().unwrap(), 0);
        // delete_all on an empty store is a no-op, not an error
        store.delete_all().unwrap();

        store.put_chunk(0, &payload(2)).unwrap();
        let small = store.estimate_size().unwrap();
        assert!(small > 0);
        store.put_chunk(1, &payload(20)).unwrap();
        assert!(store.estimate_size().unwrap() > small);

        store.delete_all().unwrap();
        assert_eq!(store.estimate_size().unwrap(), 0);
        assert!(store.metadata().unwrap().is_none());
    }

    #[test]
    fn open_fails_for_unusable_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing_parent = dir.path().join("no/such/dir/cache.db");
        match ChunkStore::open(&missing_parent) {
            Err(SearchError::StoreUnavailable(_)) => {}
            other => panic!("expected StoreUnavailable, got {other:?}"),
        }
    }
}
