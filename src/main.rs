// src/main.rs
//! Topic Pulse binary entrypoint.
//! Loads config, starts the per-source refresh loops and serves the page.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topic_pulse::api::with_static;
use topic_pulse::metrics::Metrics;
use topic_pulse::{http_transport, router, start, AppConfig};

/// Compact logs filtered by `RUST_LOG`. The deployment runtime may already
/// have installed a subscriber, in which case this is a no-op.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("topic_pulse=info,refresh=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    let transport = http_transport(&cfg)?;
    let (state, scheduler) = start(&cfg, transport);

    let mut app = router(state);
    match Metrics::init(cfg.cache.refresh_interval_secs, cfg.cache.page_ttl_secs) {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "metrics recorder not installed"),
    }
    let app = with_static(app, "public");

    // Refresh loops live until the process is asked to stop.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "shutdown signal unavailable");
            std::future::pending::<()>().await;
        }
        tracing::info!("stopping refresh loops");
        scheduler.stop_all().await;
    });

    Ok(app.into())
}
