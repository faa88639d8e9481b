// src/lib.rs
// Public library surface for the binary and the integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod page;
pub mod source_cache;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::ingest::types::{Record, Snapshot, SourceProvider};
pub use crate::source_cache::SourceCache;

use crate::ingest::scheduler::Scheduler;
use crate::ingest::transport::{HttpTransport, Transport};

/// Shared HTTP transport configured from `[http]`.
pub fn http_transport(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Transport>> {
    let t = HttpTransport::new(&cfg.http.user_agent, cfg.http.timeout_secs)?;
    Ok(Arc::new(t))
}

/// Build the app state and start one refresh loop per source.
///
/// The returned [`Scheduler`] owns the loops; dropping it stops them.
pub fn start(cfg: &AppConfig, transport: Arc<dyn Transport>) -> (AppState, Scheduler) {
    let state = AppState::from_config(cfg, transport);
    let interval = Duration::from_secs(cfg.cache.refresh_interval_secs);
    let scheduler = Scheduler::spawn_all(state.caches(), interval);
    tracing::info!(
        sources = state.caches().len(),
        interval_secs = interval.as_secs(),
        "refresh loops started"
    );
    (state, scheduler)
}
