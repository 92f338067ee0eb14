use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::services::broadcast_service::Bootstrap;
use crate::state::app::AppState;
use crate::state::store::Reading;

/// Build the state query routes under /api
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/state/:spot_id", get(get_spot))
        .with_state(state)
}

/// 404 for a spot that has never reported.
#[derive(Debug)]
pub struct NoData;

impl IntoResponse for NoData {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "No data yet" }))).into_response()
    }
}

//
// ─────────────────────────────────────────────────────────────
// GET /api/state
// Every spot's latest reading plus the active threshold
// ─────────────────────────────────────────────────────────────
//
async fn get_state(
    State(state): State<AppState>,
) -> Json<Bootstrap>
{
    Json(state.hub.bootstrap())
}

//
// ─────────────────────────────────────────────────────────────
// GET /api/state/{spot_id}
// One spot's latest reading or 404
// ─────────────────────────────────────────────────────────────
//
async fn get_spot(
    Path(spot_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Reading>, NoData>
{
    state.store.get(&spot_id).map(Json).ok_or(NoData)
}
