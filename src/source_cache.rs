// src/source_cache.rs
//! Per-source fetch/cache/refresh manager.
//!
//! Read path of [`SourceCache::get`]:
//! 1. in-memory snapshot (unless forced),
//! 2. on-disk snapshot file, adopted as-is,
//! 3. remote `collect()`, normalized, then written to memory and disk.
//!
//! A failed collect never replaces a snapshot that is already in memory.
//! The slow path runs under a per-source async mutex, so one source never has
//! two fetches in flight and its file has a single writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{CollectError, StorageError};
use crate::ingest::normalize_records;
use crate::ingest::types::{now_ms, Snapshot, SourceProvider};
use crate::metrics::ensure_metrics_described;
use crate::storage::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Empty,
    Loading,
    Ready,
}

pub struct SourceCache {
    name: String,
    provider: Arc<dyn SourceProvider>,
    store: SnapshotStore,
    memory: RwLock<Option<Arc<Snapshot>>>,
    fill: Mutex<()>,
    loading: AtomicBool,
}

/// Clears the loading flag however the slow path exits.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SourceCache {
    pub fn new(provider: Arc<dyn SourceProvider>, store: SnapshotStore) -> Self {
        ensure_metrics_described();
        Self {
            name: provider.name().to_string(),
            provider,
            store,
            memory: RwLock::new(None),
            fill: Mutex::new(()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// The in-memory snapshot, without any I/O.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.memory
            .read()
            .expect("snapshot lock poisoned")
            .clone()
    }

    pub fn state(&self) -> CacheState {
        if self.loading.load(Ordering::SeqCst) {
            CacheState::Loading
        } else if self.current().is_some() {
            CacheState::Ready
        } else {
            CacheState::Empty
        }
    }

    /// Read the snapshot, falling back to disk and then to a remote collect.
    ///
    /// `force_refresh` skips only the in-memory snapshot; an existing file on
    /// disk is still adopted.
    pub async fn get(&self, force_refresh: bool) -> Result<Arc<Snapshot>, CollectError> {
        if !force_refresh {
            if let Some(snap) = self.current() {
                counter!("source_cache_hits_total", "source" => self.name.clone()).increment(1);
                return Ok(snap);
            }
        }

        let _fill = self.fill.lock().await;

        // Another caller may have filled memory while we waited.
        if !force_refresh {
            if let Some(snap) = self.current() {
                counter!("source_cache_hits_total", "source" => self.name.clone()).increment(1);
                return Ok(snap);
            }
        }

        self.load_or_fetch().await
    }

    /// Delete the snapshot file. A missing file counts as success; memory is
    /// left alone.
    pub async fn purge(&self) -> Result<(), StorageError> {
        self.store.remove().await
    }

    /// Scheduled cycle: purge the file, then fetch anew. A file that cannot
    /// be purged is logged and skipped, never adopted. On failure the
    /// previous in-memory snapshot keeps being served.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CollectError> {
        let _fill = self.fill.lock().await;
        let _loading = LoadingGuard::set(&self.loading);

        if let Err(e) = self.purge().await {
            tracing::warn!(source = %self.name, error = %e, "snapshot not purged");
            counter!("source_storage_errors_total", "source" => self.name.clone()).increment(1);
        }
        self.fetch_and_store().await
    }

    /// Forget the in-memory snapshot; the next `get` goes to disk.
    pub fn evict_memory(&self) {
        *self.memory.write().expect("snapshot lock poisoned") = None;
    }

    async fn load_or_fetch(&self) -> Result<Arc<Snapshot>, CollectError> {
        let _loading = LoadingGuard::set(&self.loading);

        match self.store.load().await {
            Ok(Some(snap)) => {
                tracing::debug!(source = %self.name, "adopted snapshot from disk");
                counter!("source_cache_disk_loads_total", "source" => self.name.clone())
                    .increment(1);
                let snap = Arc::new(snap);
                self.install(Arc::clone(&snap));
                return Ok(snap);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(source = %self.name, error = %e, "ignoring unreadable snapshot");
                counter!("source_storage_errors_total", "source" => self.name.clone())
                    .increment(1);
            }
        }

        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Result<Arc<Snapshot>, CollectError> {
        let snap = Arc::new(self.fetch().await?);
        self.install(Arc::clone(&snap));

        if let Err(e) = self.store.replace(&snap).await {
            tracing::warn!(source = %self.name, error = %e, "snapshot not persisted");
            counter!("source_storage_errors_total", "source" => self.name.clone()).increment(1);
        }

        tracing::info!(
            source = %self.name,
            records = snap.len(),
            update_time = snap.update_time,
            "fetched fresh snapshot"
        );
        Ok(snap)
    }

    async fn fetch(&self) -> Result<Snapshot, CollectError> {
        counter!("source_fetch_total", "source" => self.name.clone()).increment(1);
        let t0 = Instant::now();

        let records = self.provider.collect().await.map_err(|cause| {
            counter!("source_fetch_errors_total", "source" => self.name.clone()).increment(1);
            CollectError::new(self.name.clone(), cause)
        })?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_fetch_ms", "source" => self.name.clone()).record(ms);

        Ok(Snapshot::new(now_ms(), normalize_records(records)))
    }

    fn install(&self, snap: Arc<Snapshot>) {
        gauge!("source_last_update_ts", "source" => self.name.clone()).set(snap.update_time as f64);
        *self.memory.write().expect("snapshot lock poisoned") = Some(snap);
    }
}
