//! HTTP server side of the peer boundary

use std::sync::Arc;
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{debug, warn};

use crate::error::Error;
use crate::http::path::{normalize_base_path, parse_peer_path};
use crate::registry::Registry;

#[derive(Clone)]
struct PeerState {
    registry: Arc<Registry>,
    base_path: Arc<str>,
}

/// Router answering peer requests from `registry`
///
/// Requests outside `base_path` are rejected with 400 by the router's
/// fallback.
pub fn peer_router(registry: Arc<Registry>, base_path: &str) -> Router {
    let base_path = normalize_base_path(base_path);
    let route = format!("{}*rest", base_path);

    Router::new()
        .route(&route, get(serve_peer))
        .fallback(bad_path)
        .with_state(PeerState {
            registry,
            base_path: base_path.into(),
        })
}

async fn serve_peer(State(state): State<PeerState>, uri: Uri) -> Response {
    let path = match parse_peer_path(&state.base_path, uri.path()) {
        Ok(path) => path,
        Err(err) => {
            debug!("Rejected peer path {}: {}", uri.path(), err);
            return (StatusCode::BAD_REQUEST, format!("bad path: {}", err)).into_response();
        }
    };

    let group = match state.registry.group(&path.group) {
        Ok(group) => group,
        Err(err) => return error_response(&err, &path.group, &path.key),
    };
    group.stats().record_server_request();

    match group.get_local(&path.key).await {
        Ok(view) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            view.to_bytes(),
        )
            .into_response(),
        Err(err) => {
            warn!("Peer request for {}/{} failed: {}", path.group, path.key, err);
            error_response(&err, &path.group, &path.key)
        }
    }
}

async fn bad_path(uri: Uri) -> Response {
    debug!("Rejected request outside the peer base path: {}", uri.path());
    (StatusCode::BAD_REQUEST, "bad path").into_response()
}

/// Body prefix of a 404 for a key the owner's loader does not have
pub(crate) const KEY_NOT_FOUND: &str = "key not found";

/// HTTP status for an error category
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::UnknownGroup(_) | Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Load { .. } | Error::PeerFetch { .. } => StatusCode::BAD_GATEWAY,
        Error::PeerTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Short category string, never the inner error detail
fn category(err: &Error) -> &'static str {
    match err {
        Error::Config(_) => "configuration error",
        Error::UnknownGroup(_) => "unknown group",
        Error::NotFound { .. } => KEY_NOT_FOUND,
        Error::Load { .. } => "load failed",
        Error::PeerFetch { .. } => "peer fetch failed",
        Error::PeerTimeout { .. } => "peer timed out",
    }
}

/// Response for a failed request on `group`/`key`
pub fn error_response(err: &Error, group: &str, key: &str) -> Response {
    (
        status_for(err),
        format!("{}: group={} key={}", category(err), group, key),
    )
        .into_response()
}
