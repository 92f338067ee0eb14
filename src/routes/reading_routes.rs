use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::errors::IngestError;
use crate::routes::state_routes::NoData;
use crate::services::ingest_service::{self, IngestRequest};
use crate::state::app::AppState;
use crate::state::store::Reading;

/// Build the sensor-facing routes under /api
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/reading", get(poll_reading).post(post_reading))
        .with_state(state)
}

/// Body echoed back to the sensor on success.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub reading: Reading,
}

//
// ─────────────────────────────────────────────────────────────
// POST /api/reading
// Sensor ingestion: { token, spot_id?, distance_cm }
// ─────────────────────────────────────────────────────────────
//
async fn post_reading(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, IngestError>
{
    let req = IngestRequest::from_body(&body);

    let reading = ingest_service::ingest(
        &state.hub,
        &req,
        &state.config.api_key,
        &state.config.default_spot,
    )
    .map_err(|e| {
        match &e {
            IngestError::Unauthorized => tracing::warn!("Rejected reading: bad credential"),
            IngestError::InvalidPayload(why) => tracing::debug!("Rejected reading: {why}"),
            IngestError::Internal(_) => {}
        }
        e
    })?;

    Ok(Json(IngestResponse { ok: true, reading }))
}

#[derive(Debug, Deserialize)]
struct PollParams {
    spot_id: Option<String>,
}

//
// ─────────────────────────────────────────────────────────────
// GET /api/reading?spot_id=A1
// Polling fallback for dashboards without a live socket
// ─────────────────────────────────────────────────────────────
//
async fn poll_reading(
    State(state): State<AppState>,
    Query(params): Query<PollParams>,
) -> Result<Json<Reading>, NoData>
{
    let spot = params
        .spot_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.config.default_spot.clone());

    state.store.get(&spot).map(Json).ok_or(NoData)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::config::AppConfig;
    use crate::services::broadcast_service::HubMessage;
    use axum::{body::Body, http::{Request, StatusCode}};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const KEY: &str = "s3cret";

    fn test_state() -> AppState {
        AppState::new(AppConfig {
            api_key: KEY.to_string(),
            threshold_cm: 50.0,
            ..AppConfig::default()
        })
    }

    async fn post(state: &AppState, body: Value) -> Result<(StatusCode, Value), Box<dyn std::error::Error>> {
        let request = Request::builder()
            .method("POST")
            .uri("/api/reading")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?;

        let response = build_app(state.clone()).oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn near_reading_is_occupied_and_broadcast() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state();
        let mut viewer = state.hub.subscribe();
        assert!(matches!(viewer.try_recv(), Some(HubMessage::Bootstrap(_))));

        let (status, body) = post(&state, json!({ "token": KEY, "spot_id": "A1", "distance_cm": 30 })).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["spot_id"], "A1");
        assert_eq!(body["distance_cm"], 30.0);
        assert_eq!(body["occupied"], true);
        assert!(body["updated_at"].is_string());

        match viewer.try_recv() {
            Some(HubMessage::Reading(r)) => {
                assert_eq!(r.spot_id, "A1");
                assert_eq!(r.distance_cm, 30.0);
                assert!(r.occupied);
            }
            other => panic!("expected reading push, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn far_reading_is_free() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state();
        let (status, body) = post(&state, json!({ "token": KEY, "spot_id": "A1", "distance_cm": 75 })).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["occupied"], false);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_token_is_401_with_no_effect() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state();
        let mut viewer = state.hub.subscribe();
        viewer.try_recv();

        let (status, body) = post(&state, json!({ "token": "guess", "spot_id": "A1", "distance_cm": 30 })).await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));
        assert!(state.store.is_empty());
        assert!(viewer.try_recv().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn non_numeric_distance_is_400_with_no_effect() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state();
        let mut viewer = state.hub.subscribe();
        viewer.try_recv();

        let (status, body) = post(&state, json!({ "token": KEY, "spot_id": "A1", "distance_cm": "abc" })).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "distance_cm must be a number" }));
        assert!(state.store.is_empty());
        assert!(viewer.try_recv().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn garbage_body_is_unauthorized() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/api/reading")
            .body(Body::from("distance=12"))?;

        let response = build_app(state).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn replayed_reading_is_rebroadcast() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state();
        let mut viewer = state.hub.subscribe();
        viewer.try_recv();

        let body = json!({ "token": KEY, "distance_cm": 40 });
        post(&state, body.clone()).await?;
        post(&state, body).await?;

        assert!(matches!(viewer.try_recv(), Some(HubMessage::Reading(_))));
        assert!(matches!(viewer.try_recv(), Some(HubMessage::Reading(_))));
        assert_eq!(state.store.len(), 1);
        assert!(state.store.get("A1").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn polling_defaults_to_default_spot() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state();
        post(&state, json!({ "token": KEY, "distance_cm": 12.5 })).await?;

        let request = Request::builder().uri("/api/reading").body(Body::empty())?;
        let response = build_app(state.clone()).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let reading: Reading = serde_json::from_slice(&bytes)?;
        assert_eq!(reading.spot_id, "A1");
        assert_eq!(reading.distance_cm, 12.5);

        let request = Request::builder().uri("/api/reading?spot_id=A2").body(Body::empty())?;
        let response = build_app(state).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
