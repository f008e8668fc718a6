//! Health check handler.

use api_result::ApiResult;
use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::api::AppState;

/// Health check payload
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

/// Health check endpoint with database connectivity check
pub async fn health(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    match state.database.ping().await {
        Ok(()) => ApiResult::success(HealthStatus {
            status: "healthy",
            database: "healthy",
        }),
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            ApiResult::failure(StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
        }
    }
}
