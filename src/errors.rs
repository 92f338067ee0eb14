use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Why an ingestion request was turned down.
///
/// Every variant is raised before the store is touched, except `Internal`,
/// which only covers faults after validation has passed.
#[derive(Error, Debug, PartialEq)]
pub enum IngestError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    InvalidPayload(String),

    #[error("internal fault: {0}")]
    Internal(String),
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::Unauthorized => StatusCode::UNAUTHORIZED,
            IngestError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            IngestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let message = match &self {
            IngestError::Internal(detail) => {
                tracing::error!("Ingestion failed: {detail}");
                "Server error".to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("threshold_cm must be a finite number, got {0}")]
    InvalidThreshold(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("api_key must not be empty")]
    EmptyApiKey,
}
