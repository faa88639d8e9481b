// src/api.rs
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics::counter;
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::aggregate::Aggregator;
use crate::config::AppConfig;
use crate::ingest::transport::Transport;
use crate::page::{render_error, render_page, PageBuilder, PageCache};
use crate::source_cache::{CacheState, SourceCache};
use crate::storage::SnapshotStore;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub pages: Arc<PageCache>,
    pub builder: Arc<PageBuilder>,
    site_title: Arc<str>,
}

impl AppState {
    /// Wire one cache manager per configured source on top of `transport`.
    pub fn from_config(cfg: &AppConfig, transport: Arc<dyn Transport>) -> Self {
        let caches = cfg
            .sources
            .iter()
            .map(|s| {
                let provider = s.build_provider(Arc::clone(&transport));
                let store = SnapshotStore::new(&cfg.cache.dir, &s.name);
                Arc::new(SourceCache::new(provider, store))
            })
            .collect();
        Self::from_parts(cfg, caches)
    }

    /// Page settings from `cfg`, sources from `caches`.
    pub fn from_parts(cfg: &AppConfig, caches: Vec<Arc<SourceCache>>) -> Self {
        Self {
            aggregator: Arc::new(Aggregator::new(caches, &cfg.display_order)),
            pages: Arc::new(PageCache::new(Duration::from_secs(cfg.cache.page_ttl_secs))),
            builder: Arc::new(PageBuilder::from_config(cfg)),
            site_title: Arc::from(cfg.site.title.as_str()),
        }
    }

    pub fn caches(&self) -> &[Arc<SourceCache>] {
        self.aggregator.sources()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/api/streams", get(api_streams))
        .route("/api/sources", get(api_sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Serve files under `dir` for any path no route matched.
pub fn with_static(router: Router, dir: impl AsRef<Path>) -> Router {
    router.fallback_service(ServeDir::new(dir.as_ref()))
}

async fn index(State(state): State<AppState>) -> Response {
    if let Some(html) = state.pages.fresh() {
        tracing::debug!("serving from page cache");
        counter!("page_cache_hits_total").increment(1);
        return Html(html).into_response();
    }

    match state.aggregator.collect_all().await {
        Ok(agg) => {
            let html = render_page(&state.builder.build(&agg));
            state.pages.store(html.clone());
            Html(html).into_response()
        }
        Err(e) => {
            tracing::warn!(source = %e.source_name, error = %e, "page not rendered");
            (StatusCode::BAD_GATEWAY, Html(render_error(&state.site_title))).into_response()
        }
    }
}

async fn api_streams(State(state): State<AppState>) -> Response {
    match state.aggregator.collect_all().await {
        Ok(agg) => Json(state.builder.build(&agg)).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string(), "source": e.source_name })),
        )
            .into_response(),
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceStatus {
    name: String,
    state: CacheState,
    update_time: Option<i64>,
    records: usize,
}

async fn api_sources(State(state): State<AppState>) -> Json<Vec<SourceStatus>> {
    let out = state
        .caches()
        .iter()
        .map(|c| {
            let snap = c.current();
            SourceStatus {
                name: c.name().to_string(),
                state: c.state(),
                update_time: snap.as_ref().map(|s| s.update_time),
                records: snap.as_ref().map_or(0, |s| s.len()),
            }
        })
        .collect();
    Json(out)
}
