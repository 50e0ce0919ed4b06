//! Manifest and chunk downloads.
//!
//! Chunks are fetched as raw bytes and gzip-decompressed here; automatic
//! response decoding stays off so the fetcher owns the framing. Downloads
//! proceed batch-by-batch with a fixed bound on in-flight requests, and a
//! failure anywhere in a batch aborts the whole load.

use std::io::Read;

use flate2::read::GzDecoder;
use futures::future::try_join_all;
use reqwest::Client;
use tracing::debug;

use crate::errors::{Result, SearchError};
use crate::manifest::{ChunkEntry, ChunkManifest, ChunkPayload};

/// HTTP client wrapper for one chunk data set.
#[derive(Debug, Clone)]
pub struct ChunkFetcher {
    http: Client,
    base_url: String,
}

impl ChunkFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetches `{base_url}/manifest.json`.
    ///
    /// # Errors
    /// Returns [`SearchError::ManifestUnavailable`] on transport failure,
    /// non-success status, or malformed JSON.
    pub async fn fetch_manifest(&self) -> Result<ChunkManifest> {
        let url = format!("{}/manifest.json", self.base_url);
        debug!(%url, "fetching manifest");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SearchError::ManifestUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SearchError::ManifestUnavailable(format!(
                "status {}",
                resp.status()
            )));
        }
        let manifest = resp
            .json::<ChunkManifest>()
            .await
            .map_err(|e| SearchError::ManifestUnavailable(e.to_string()))?;

        // A count that disagrees with the chunk list would end up in cache
        // metadata claiming indices that were never written.
        if manifest.total_chunks as usize != manifest.chunks.len() {
            return Err(SearchError::ManifestUnavailable(format!(
                "totalChunks {} disagrees with {} listed chunks",
                manifest.total_chunks,
                manifest.chunks.len()
            )));
        }
        Ok(manifest)
    }

    /// Fetches and decompresses one chunk.
    ///
    /// # Errors
    /// [`SearchError::ChunkDownload`] on a non-success status,
    /// [`SearchError::ChunkDecode`] when decompression or parsing fails.
    pub async fn fetch_chunk(&self, entry: &ChunkEntry) -> Result<ChunkPayload> {
        let url = format!("{}/{}", self.base_url, entry.filename);
        debug!(%url, index = entry.index, "fetching chunk");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::ChunkDownload {
                filename: entry.filename.clone(),
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await?;
        decode_chunk(&entry.filename, &body)
    }

    /// Downloads one batch of chunks concurrently, returning payloads in
    /// submission order. The caller drives batches sequentially, so at most
    /// `entries.len()` requests are ever in flight.
    pub async fn fetch_batch(&self, entries: &[ChunkEntry]) -> Result<Vec<ChunkPayload>> {
        try_join_all(entries.iter().map(|e| self.fetch_chunk(e))).await
    }
}

/// Decompresses a gzip-framed chunk body and parses the payload JSON.
///
/// The whole stream is consumed before parsing; the parser never sees
/// partial decompressed output.
fn decode_chunk(filename: &str, compressed: &[u8]) -> Result<ChunkPayload> {
    let mut decoder = GzDecoder::new(compressed);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| SearchError::ChunkDecode {
            filename: filename.to_string(),
            reason: e.to_string(),
        })?;
    serde_json::from_slice(&json).map_err(|e| SearchError::ChunkDecode {
        filename: filename.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gz(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn decodes_a_gzip_framed_payload() {
        let body = gz(
            br#"{"dialogues":[{"scenarioType":"event","scenarioId":"3-1","speaker":"Arthur","content":"hello","title":"t"}],"chunkIndex":0,"totalChunks":1}"#,
        );
        let payload = decode_chunk("search-chunk-0.gz", &body).unwrap();
        assert_eq!(payload.dialogues.len(), 1);
        assert_eq!(payload.dialogues[0].speaker, "Arthur");
    }

    #[test]
    fn truncated_stream_is_a_decode_error() {
        let mut body = gz(br#"{"dialogues":[]}"#);
        body.truncate(body.len() - 4);
        match decode_chunk("c.gz", &body) {
            Err(SearchError::ChunkDecode { filename, .. }) => assert_eq!(filename, "c.gz"),
            other => panic!("expected ChunkDecode, got {other:?}"),
        }
    }

    #[test]
    fn non_json_output_is_a_decode_error() {
        let body = gz(b"not json at all");
        assert!(matches!(
            decode_chunk("c.gz", &body),
            Err(SearchError::ChunkDecode { .. })
        ));
    }
}
