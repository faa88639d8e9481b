// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the configured intervals.
    pub fn init(refresh_secs: u64, page_ttl_secs: u64) -> Result<Self, BuildError> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new().install_recorder()?;

        ensure_metrics_described();
        gauge!("source_refresh_interval_secs").set(refresh_secs as f64);
        gauge!("page_cache_ttl_secs").set(page_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "source_cache_hits_total",
            "Reads served from the in-memory snapshot."
        );
        describe_counter!(
            "source_cache_disk_loads_total",
            "Reads served by adopting the on-disk snapshot."
        );
        describe_counter!("source_fetch_total", "Remote collects started.");
        describe_counter!("source_fetch_errors_total", "Remote collects that failed.");
        describe_counter!(
            "source_storage_errors_total",
            "Snapshot file reads/writes that failed."
        );
        describe_counter!(
            "source_refresh_failures_total",
            "Scheduled refresh cycles that failed."
        );
        describe_histogram!("source_fetch_ms", "Remote collect time in milliseconds.");
        describe_gauge!(
            "source_last_update_ts",
            "Unix ms of the snapshot currently served per source."
        );
        describe_counter!(
            "page_cache_hits_total",
            "Page requests answered from the rendered-page cache."
        );
        describe_counter!("aggregate_failures_total", "Aggregated reads that failed.");
    });
}
