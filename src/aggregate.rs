// src/aggregate.rs
//! Concurrent fan-out of `get()` across all sources.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use metrics::counter;
use serde::Serialize;

use crate::error::{CollectError, FetchError, SourceError};
use crate::ingest::types::Snapshot;
use crate::source_cache::SourceCache;

/// One source's snapshot inside an aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub name: String,
    pub snapshot: Arc<Snapshot>,
}

/// Snapshots of every source, in display order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregate {
    pub streams: Vec<SourceSnapshot>,
}

impl Aggregate {
    pub fn get(&self, name: &str) -> Option<&Arc<Snapshot>> {
        self.streams
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.snapshot)
    }

    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.name.as_str()).collect()
    }
}

pub struct Aggregator {
    sources: Vec<Arc<SourceCache>>,
    order: Vec<String>,
}

impl Aggregator {
    /// `display_order` lists source names; sources it omits follow in the
    /// order they were given, unknown names are ignored.
    pub fn new(sources: Vec<Arc<SourceCache>>, display_order: &[String]) -> Self {
        let mut order: Vec<String> = display_order
            .iter()
            .filter(|n| sources.iter().any(|s| s.name() == n.as_str()))
            .cloned()
            .collect();
        for s in &sources {
            if !order.iter().any(|n| n == s.name()) {
                order.push(s.name().to_string());
            }
        }
        Self { sources, order }
    }

    pub fn sources(&self) -> &[Arc<SourceCache>] {
        &self.sources
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Read every source concurrently. The first failure is returned as soon
    /// as it is seen; fetches still running keep going in their own tasks and
    /// their results are dropped.
    pub async fn collect_all(&self) -> Result<Aggregate, CollectError> {
        let mut pending: FuturesUnordered<_> = self
            .sources
            .iter()
            .map(|cache| {
                let cache = Arc::clone(cache);
                let name = cache.name().to_string();
                let task = tokio::spawn(async move { cache.get(false).await });
                async move { (name, task.await) }
            })
            .collect();

        let mut done: HashMap<String, Arc<Snapshot>> = HashMap::with_capacity(self.sources.len());
        while let Some((name, joined)) = pending.next().await {
            let result = match joined {
                Ok(r) => r,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => Err(CollectError::new(
                    name.clone(),
                    SourceError::Fetch(FetchError::Aborted(e.to_string())),
                )),
            };
            match result {
                Ok(snap) => {
                    done.insert(name, snap);
                }
                Err(e) => {
                    tracing::warn!(source = %e.source_name, error = %e, "aggregate read failed");
                    counter!("aggregate_failures_total").increment(1);
                    return Err(e);
                }
            }
        }

        let streams = self
            .order
            .iter()
            .filter_map(|name| {
                done.remove(name).map(|snapshot| SourceSnapshot {
                    name: name.clone(),
                    snapshot,
                })
            })
            .collect();
        Ok(Aggregate { streams })
    }
}
