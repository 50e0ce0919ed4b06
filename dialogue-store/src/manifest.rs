//! Wire types for the chunked search data set.
//!
//! The asset build publishes `manifest.json` plus gzip-framed chunk files
//! under one base URL; `CacheMetadata` is what we persist locally alongside
//! the decompressed chunks. Unknown extra fields (per-chunk sizes, dialogue
//! counts) are tolerated and ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::DialogueRecord;

/// One downloadable chunk as listed by the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkEntry {
    pub filename: String,
    pub index: u32,
}

/// The download plan for one data version. Read-only to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkManifest {
    /// Opaque cache-busting token; mismatch invalidates the whole cache.
    pub version: String,
    #[serde(default)]
    pub timestamp: i64,
    pub total_chunks: u32,
    /// Informational only.
    #[serde(default)]
    pub total_compressed_size: u64,
    /// Event identifier to display name.
    #[serde(default)]
    pub event_names: BTreeMap<String, String>,
    pub chunks: Vec<ChunkEntry>,
}

/// Decompressed content of one chunk file. Chunk order is not semantically
/// significant for merging, only for progress display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    pub dialogues: Vec<DialogueRecord>,
}

/// Persisted alongside the cached chunk payloads. If `version` does not
/// match the currently required version, every cached chunk is stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub version: String,
    pub timestamp: i64,
    pub total_chunks: u32,
    #[serde(default)]
    pub event_names: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_tolerates_extra_chunk_fields() {
        let json = r#"{
            "version": "2026-08-01",
            "timestamp": 1754006400000,
            "totalChunks": 1,
            "totalCompressedSize": 1024,
            "eventNames": {"12": "Starlit Banquet"},
            "chunks": [
                {"filename": "search-chunk-0.gz", "index": 0,
                 "uncompressedSize": 4096, "compressedSize": 1024, "dialogueCount": 7}
            ]
        }"#;
        let m: ChunkManifest = serde_json::from_str(json).unwrap();
        assert_eq!(m.total_chunks, 1);
        assert_eq!(m.chunks[0].filename, "search-chunk-0.gz");
        assert_eq!(m.event_names["12"], "Starlit Banquet");
    }

    #[test]
    fn manifest_defaults_optional_fields() {
        let json = r#"{"version":"v1","totalChunks":0,"chunks":[]}"#;
        let m: ChunkManifest = serde_json::from_str(json).unwrap();
        assert_eq!(m.timestamp, 0);
        assert!(m.event_names.is_empty());
    }
}
