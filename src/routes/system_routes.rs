use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::config::AppConfig;

pub fn routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .with_state(config)
}

/// GET /api/health
///
/// Liveness only: never touches the store or the hub.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "now": Utc::now().to_rfc3339()
    }))
}

/// GET /api/version
async fn version(State(config): State<Arc<AppConfig>>) -> Json<serde_json::Value> {
    Json(json!({
        "version": config.server_version
    }))
}
