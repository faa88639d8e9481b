// tests/common/mod.rs
// Shared stub provider for the integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use topic_pulse::error::{FetchError, SourceError};
use topic_pulse::storage::SnapshotStore;
use topic_pulse::{Record, SourceCache, SourceProvider};

/// Counts collects; can be switched to fail or to respond slowly.
pub struct StubProvider {
    name: String,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    delay: Duration,
}

impl StubProvider {
    pub fn new(name: &str) -> Arc<Self> {
        Self::slow(name, Duration::ZERO)
    }

    pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay,
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        let p = Self::new(name);
        p.fail.store(true, Ordering::SeqCst);
        p
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceProvider for StubProvider {
    async fn collect(&self) -> Result<Vec<Record>, SourceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                url: format!("https://{}.example/", self.name),
                status: 503,
            }
            .into());
        }
        Ok(vec![Record {
            url: format!("https://{}.example/entry/{n}", self.name),
            text: format!("{} says <b>hi</b> #{n}", self.name),
            date: 1_455_456_000_000,
            author: "stub".into(),
        }])
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub fn cache_in(dir: &Path, provider: Arc<StubProvider>) -> Arc<SourceCache> {
    let name = provider.name().to_string();
    Arc::new(SourceCache::new(provider, SnapshotStore::new(dir, &name)))
}
