use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;
use std::path::Path;
use utoipa::ToSchema;

use crate::api::router::AppState;

const SERVICE_NAME: &str = "view_snapshot";

/// Basic health check response
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

/// Cache readiness response
#[derive(serde::Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub service: String,
    pub cache: String,
    pub policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health
/// Basic health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_handler() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// GET /health/ready
/// Readiness probe: the cache root must exist and be a directory
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service is not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let policy = state.materialize_use_case.policy().kind().to_string();

    match check_cache_root(&state.cache_root).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                service: SERVICE_NAME.to_string(),
                cache: "available".to_string(),
                policy,
                error: None,
            }),
        ),
        Err(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                service: SERVICE_NAME.to_string(),
                cache: "unavailable".to_string(),
                policy,
                error: Some(reason.to_string()),
            }),
        ),
    }
}

async fn check_cache_root(root: &Path) -> Result<(), &'static str> {
    match tokio::fs::metadata(root).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err("Cache root is not a directory"),
        Err(_) => Err("Cache root is missing"),
    }
}
