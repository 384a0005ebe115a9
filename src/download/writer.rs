// src/download/writer.rs
// =============================================================================
// Streams one image to disk.
//
// Write discipline:
// - The GET happens outside the lock; a non-2xx status is an error (retried)
// - Opening, writing and closing the file all happen while holding the shared
//   WriteLock, so no two workers ever write at the same time. Disk I/O across
//   the whole pool is serialized; that is the accepted price.
// - Bytes go to "<name>.part" first and are renamed into place only once the
//   body is complete. A failed attempt deletes its .part file.
// - After every attempt, good or bad, we sleep a jittered moment to keep the
//   request rate polite.
// =============================================================================

use crate::config::{Jitter, Pacing};
use crate::error::FetchError;
use crate::http::{client_headers, BodyStream, HttpGet};
use crate::retry::{retry, RetryPolicy};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use url::Url;

// Bytes are handed to the file system in blocks of this size
const CHUNK_SIZE: usize = 8 * 1024;

// The one serialization point for file writes. Cloning shares the lock.
//
// It also remembers which file names this session has written and for which
// URL, so a different image that happens to share a name gets its own file.
#[derive(Clone, Default)]
pub struct WriteLock {
    written: Arc<Mutex<HashMap<String, Url>>>,
}

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct ImageWriter {
    http: Arc<dyn HttpGet>,
    lock: WriteLock,
    retry: RetryPolicy,
    throttle: Jitter,
}

impl ImageWriter {
    pub fn new(http: Arc<dyn HttpGet>, lock: WriteLock, pacing: &Pacing, retry: RetryPolicy) -> Self {
        Self {
            http,
            lock,
            retry,
            throttle: pacing.download_throttle,
        }
    }

    // Downloads `url` into `target_dir`; returns the path written
    pub async fn write(&self, url: &Url, target_dir: &Path) -> Result<PathBuf, FetchError> {
        let label = format!("download {}", url);
        retry(self.retry, &label, || async move {
            let result = self.write_once(url, target_dir).await;
            self.throttle.sleep().await;
            result
        })
        .await
    }

    async fn write_once(&self, url: &Url, target_dir: &Path) -> Result<PathBuf, FetchError> {
        let response = self
            .http
            .get(url, client_headers())
            .await?
            .error_for_status(url)?;

        let mut written = self.lock.written.lock().await;

        let name = claim_name(&written, url);
        let path = target_dir.join(&name);
        let partial = target_dir.join(format!("{}.part", name));

        let outcome = match stream_to_file(response.body, &partial).await {
            Ok(bytes) => tokio::fs::rename(&partial, &path)
                .await
                .map(|_| bytes)
                .map_err(FetchError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(bytes) => {
                written.insert(name, url.clone());
                tracing::info!("Saved {} ({} bytes)", path.display(), bytes);
                Ok(path)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&partial).await {
                    tracing::debug!("Could not remove {}: {}", partial.display(), rm);
                }
                Err(e)
            }
        }
    }
}

async fn stream_to_file(mut body: BodyStream, path: &Path) -> Result<u64, FetchError> {
    let file = tokio::fs::File::create(path).await?;
    let mut out = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut total = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }

    out.flush().await?;
    out.into_inner().sync_all().await?;
    Ok(total)
}

// File name for `url`, namespaced if this session already wrote the same
// name for a different URL
fn claim_name(written: &HashMap<String, Url>, url: &Url) -> String {
    let name = file_name_for(url);
    match written.get(&name) {
        Some(previous) if previous != url => namespaced(&name, url),
        _ => name,
    }
}

// Last path segment of the URL (query is never part of it); a hash-based
// name if the URL has no usable segment
pub fn file_name_for(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    if segment.is_empty() {
        format!("image_{}.jpg", short_hash(url, 8))
    } else {
        segment.to_string()
    }
}

// "a.jpg" -> "a-1f2e3d4c.jpg"
fn namespaced(name: &str, url: &Url) -> String {
    let tag = short_hash(url, 4);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, tag, ext),
        _ => format!("{}-{}", name, tag),
    }
}

fn short_hash(url: &Url, bytes: usize) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    hex::encode(&digest[..bytes])
}
