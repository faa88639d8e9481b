// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::source_cache::SourceCache;

/// Background purge-then-fetch loop for one source.
pub struct RefreshTask {
    name: String,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the loop to exit and wait for it. A cycle already running is
    /// allowed to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(source = %self.name, error = %e, "refresh task ended abnormally");
        }
    }
}

/// Spawn the refresh loop. The first cycle runs one full `interval` after
/// spawning; startup reads are served by the normal `get` path.
pub fn spawn_refresh(cache: Arc<SourceCache>, interval: Duration) -> RefreshTask {
    let name = cache.name().to_string();
    let (tx, mut rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_cycle(&cache).await;
                }
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(source = %cache.name(), "refresh loop stopped");
    });

    RefreshTask { name, stop: tx, handle }
}

/// One refresh cycle. Failures are logged and counted, never propagated.
/// Returns whether the cycle produced a fresh snapshot.
pub async fn run_cycle(cache: &SourceCache) -> bool {
    match cache.refresh().await {
        Ok(snap) => {
            tracing::info!(
                target: "refresh",
                source = %cache.name(),
                records = snap.len(),
                "new data fetched"
            );
            true
        }
        Err(e) => {
            tracing::warn!(target: "refresh", source = %cache.name(), error = %e, "refresh failed");
            counter!("source_refresh_failures_total", "source" => cache.name().to_string())
                .increment(1);
            false
        }
    }
}

/// Refresh loops for every configured source.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<RefreshTask>,
}

impl Scheduler {
    pub fn spawn_all(caches: &[Arc<SourceCache>], interval: Duration) -> Self {
        let tasks = caches
            .iter()
            .map(|c| spawn_refresh(Arc::clone(c), interval))
            .collect();
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn stop_all(self) {
        for t in self.tasks {
            t.stop().await;
        }
    }
}
