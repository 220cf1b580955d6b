//! Health check endpoint
//!
//! Reports liveness of the relay itself. It does not probe Ollama: a down
//! inference server shows up as 500s on the chat endpoints instead.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Model the relay forwards to
    pub model: String,
}

/// Health check handler
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            model: state.provider().model_id().to_string(),
        }),
    )
}
