use std::any::Any;

use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::errors::IngestError;
use crate::routes::{live_routes, reading_routes, state_routes, system_routes};
use crate::state::app::AppState;

/// Build the complete Axum application:
/// - /api/reading   (sensor ingestion + polling fallback)
/// - /api/state     (latest readings, whole or per spot)
/// - /api/health    (liveness + version)
/// - /ws            (live viewer stream)
///
/// Unmatched paths fall through to `static_dir` when one is configured.
pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(reading_routes::routes(state.clone()))
        .merge(state_routes::routes(state.clone()))
        .merge(system_routes::routes(state.config.clone()));

    let mut app = Router::new()
        // /api/*
        .nest("/api", api)

        // /ws
        .merge(live_routes::routes(state.clone()));

    if let Some(dir) = &state.config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
        // Panics become a plain 500 instead of a dropped connection
        .layer(CatchPanicLayer::custom(handle_panic))

        // Sensors and dashboards may live on other origins
        .layer(CorsLayer::permissive())

        // Logging middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    IngestError::Internal(detail).into_response()
}
