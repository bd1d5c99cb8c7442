//! Client-facing HTTP API of a node

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use distcache::http::error_response;
use distcache::{CacheStatsSnapshot, GroupStatsSnapshot, Registry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes for `/api/{group}/{key}`, `/stats` and `/health`
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/api/:group/:key", get(get_value))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .with_state(registry)
}

async fn get_value(
    State(registry): State<Arc<Registry>>,
    Path((group_name, key)): Path<(String, String)>,
) -> Response {
    let group = match registry.group(&group_name) {
        Ok(group) => group,
        Err(err) => {
            debug!("GET {}/{}: {}", group_name, key, err);
            return error_response(&err, &group_name, &key);
        }
    };

    match group.get(&key).await {
        Ok(view) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            view.to_bytes(),
        )
            .into_response(),
        Err(err) => {
            warn!("GET {}/{} failed: {}", group_name, key, err);
            error_response(&err, &group_name, &key)
        }
    }
}

#[derive(Debug, Serialize)]
struct GroupReport {
    group: GroupStatsSnapshot,
    cache: CacheReport,
}

#[derive(Debug, Serialize)]
struct CacheReport {
    items: usize,
    capacity: usize,
    #[serde(flatten)]
    counters: CacheStatsSnapshot,
}

async fn stats(State(registry): State<Arc<Registry>>) -> Json<BTreeMap<String, GroupReport>> {
    let mut report = BTreeMap::new();
    for name in registry.group_names() {
        let Ok(group) = registry.group(&name) else {
            continue;
        };
        report.insert(
            name,
            GroupReport {
                group: group.stats().snapshot(),
                cache: CacheReport {
                    items: group.cache_len(),
                    capacity: group.options().capacity,
                    counters: group.cache_stats().snapshot(),
                },
            },
        );
    }
    Json(report)
}

async fn health() -> &'static str {
    "OK"
}
