//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::AppState;
use caseforge_common::context::Readiness;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: Readiness,
    pub timestamp: DateTime<Utc>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: caseforge_common::VERSION,
        timestamp: Utc::now(),
    })
}

/// Readiness probe - checks the RAG collaborators
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let checks = state.orchestrator.readiness().await;
    let ready = checks.is_ready();

    let code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        code,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks,
            timestamp: Utc::now(),
        }),
    )
}
