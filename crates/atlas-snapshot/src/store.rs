//! The blob store and the snapshot store on top of it.
//!
//! `BlobStore` is the pluggable content-addressed substrate: same bytes,
//! same address. The filesystem implementation lays blobs out as
//! `snapshots/<cid>` with a `pointers/current` file naming the latest
//! snapshot; both writes go through a temp-file rename so a reader sees
//! either the old state or the new one. `SnapshotStore` adds canonical
//! serialization, content re-verification on every fetch, retry with
//! exponential backoff for environmental failures, and the publish
//! sequence that refuses to expose anything unverified.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atlas_core::digest::{blob_digest, Cid};
use atlas_core::error::{IntegrityError, StoreError};
use atlas_crypto::FieldHasher;
use atlas_validate::IntegrityReport;

use crate::snapshot::Snapshot;

/// Content-addressed blob storage.
///
/// `put` must be content-addressed: storing the same bytes twice returns
/// the same address and is not an error.
pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8]) -> Result<Cid, StoreError>;
    fn get(&self, cid: &Cid) -> Result<Vec<u8>, StoreError>;
    fn read_pointer(&self) -> Result<Option<Cid>, StoreError>;
    fn write_pointer(&self, cid: &Cid) -> Result<(), StoreError>;
}

/// Filesystem-backed blob store: `snapshots/<cid>`, `pointers/current`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, cid: &Cid) -> PathBuf {
        self.root.join("snapshots").join(cid.as_str())
    }

    fn pointer_path(&self) -> PathBuf {
        self.root.join("pointers").join("current")
    }

    /// Write-then-rename so concurrent readers never observe a partial
    /// file.
    fn atomic_write(&self, path: &PathBuf, bytes: &[u8]) -> Result<(), StoreError> {
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::Unavailable("blob path has no parent".to_string()))?;
        std::fs::create_dir_all(parent).map_err(io_unavailable)?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp).map_err(io_unavailable)?;
            file.write_all(bytes).map_err(io_unavailable)?;
            file.sync_all().map_err(io_unavailable)?;
        }
        std::fs::rename(&tmp, path).map_err(io_unavailable)?;
        Ok(())
    }
}

fn io_unavailable(e: std::io::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl BlobStore for FsBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<Cid, StoreError> {
        let cid = Cid::from_digest(&blob_digest(bytes));
        let path = self.blob_path(&cid);
        if path.exists() {
            // Same bytes, same address: idempotent.
            return Ok(cid);
        }
        self.atomic_write(&path, bytes)?;
        Ok(cid)
    }

    fn get(&self, cid: &Cid) -> Result<Vec<u8>, StoreError> {
        std::fs::read(self.blob_path(cid)).map_err(io_unavailable)
    }

    fn read_pointer(&self) -> Result<Option<Cid>, StoreError> {
        match std::fs::read_to_string(self.pointer_path()) {
            Ok(s) => Ok(Some(Cid::parse(s.trim()).map_err(StoreError::Integrity)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_unavailable(e)),
        }
    }

    fn write_pointer(&self, cid: &Cid) -> Result<(), StoreError> {
        self.atomic_write(&self.pointer_path(), cid.as_str().as_bytes())
    }
}

/// In-memory blob store for tests and ephemeral pipelines. Can inject a
/// bounded number of failures to exercise retry paths.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    pointer: Mutex<Option<Cid>>,
    failures_remaining: AtomicU32,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` operations fail with `Unavailable`.
    pub fn inject_failures(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    fn maybe_fail(&self) -> Result<(), StoreError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<Cid, StoreError> {
        self.maybe_fail()?;
        let cid = Cid::from_digest(&blob_digest(bytes));
        self.blobs
            .lock()
            .expect("blob mutex")
            .insert(cid.as_str().to_string(), bytes.to_vec());
        Ok(cid)
    }

    fn get(&self, cid: &Cid) -> Result<Vec<u8>, StoreError> {
        self.maybe_fail()?;
        self.blobs
            .lock()
            .expect("blob mutex")
            .get(cid.as_str())
            .cloned()
            .ok_or_else(|| StoreError::Unavailable(format!("no blob {cid}")))
    }

    fn read_pointer(&self) -> Result<Option<Cid>, StoreError> {
        self.maybe_fail()?;
        Ok(self.pointer.lock().expect("pointer mutex").clone())
    }

    fn write_pointer(&self, cid: &Cid) -> Result<(), StoreError> {
        self.maybe_fail()?;
        *self.pointer.lock().expect("pointer mutex") = Some(cid.clone());
        Ok(())
    }
}

/// Retry budget for environmental failures. Only `Unavailable` retries;
/// integrity failures surface immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    fn run<T>(
        &self,
        operation: &str,
        mut f: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 0;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(StoreError::Unavailable(reason)) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(StoreError::Unavailable(reason));
                    }
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason,
                        "blob store unavailable, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(other) => return Err(other),
            }
        }
    }
}

/// Snapshot persistence over a blob store.
pub struct SnapshotStore<S> {
    blobs: S,
    hasher: Arc<FieldHasher>,
    retry: RetryPolicy,
}

impl<S: BlobStore> SnapshotStore<S> {
    pub fn new(blobs: S, hasher: Arc<FieldHasher>) -> Self {
        Self {
            blobs,
            hasher,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    /// Serialize canonically and store. Returns the snapshot's address.
    pub fn put(&self, snapshot: &Snapshot) -> Result<Cid, StoreError> {
        let bytes = snapshot.canonical_bytes()?;
        self.retry.run("put", || self.blobs.put(bytes.as_bytes()))
    }

    /// Fetch by address, re-verify the content hash, and re-validate the
    /// snapshot structure.
    pub fn get(&self, cid: &Cid) -> Result<Snapshot, StoreError> {
        let bytes = self.retry.run("get", || self.blobs.get(cid))?;
        let actual = Cid::from_digest(&blob_digest(&bytes));
        if &actual != cid {
            return Err(StoreError::Integrity(IntegrityError::ContentHashMismatch {
                expected: cid.to_string(),
                actual: actual.to_string(),
            }));
        }
        Snapshot::from_canonical_bytes(&bytes, &self.hasher).map_err(StoreError::Integrity)
    }

    /// The currently published snapshot, if any.
    pub fn current(&self) -> Result<Option<Snapshot>, StoreError> {
        match self.retry.run("read_pointer", || self.blobs.read_pointer())? {
            Some(cid) => Ok(Some(self.get(&cid)?)),
            None => Ok(None),
        }
    }

    /// Address of the currently published snapshot, if any.
    pub fn current_cid(&self) -> Result<Option<Cid>, StoreError> {
        self.retry.run("read_pointer", || self.blobs.read_pointer())
    }

    /// The publish sequence: refuse on integrity errors, write the blob,
    /// fetch it back and verify, then, and only then, swap the
    /// pointer. A cancelled or failed publish leaves no partial snapshot
    /// exposed.
    pub fn publish(
        &self,
        snapshot: &Snapshot,
        integrity: &IntegrityReport,
    ) -> Result<Cid, StoreError> {
        if !integrity.is_valid() {
            return Err(StoreError::PublishRefused(integrity.errors.len()));
        }
        let sanity = snapshot.verify_integrity(&self.hasher);
        if !sanity.is_valid() {
            return Err(StoreError::PublishRefused(sanity.errors.len()));
        }
        let cid = self.put(snapshot)?;
        let fetched = self.get(&cid)?;
        if fetched.merkle_root() != snapshot.merkle_root() {
            return Err(StoreError::Integrity(IntegrityError::MalformedSnapshot(
                "fetched snapshot does not match what was written".to_string(),
            )));
        }
        self.retry.run("write_pointer", || self.blobs.write_pointer(&cid))?;
        tracing::info!(
            cid = %cid,
            snapshot_id = snapshot.snapshot_id(),
            "snapshot published"
        );
        Ok(cid)
    }
}
