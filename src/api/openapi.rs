use axum::Json;
use utoipa::OpenApi;

use crate::api::handlers::health::{HealthResponse, ReadinessResponse};

/// OpenAPI specification for the snapshot service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "View Snapshot API",
        version = "1.0.0",
        description = "Serves CSV snapshots of database views with a credential-partitioned cache"
    ),
    servers(
        (url = "http://localhost:3500", description = "Local development server")
    ),
    paths(
        crate::api::handlers::health::health_handler,
        crate::api::handlers::health::readiness_handler,
        crate::api::handlers::snapshot::snapshot_handler,
    ),
    components(schemas(HealthResponse, ReadinessResponse)),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "snapshots", description = "CSV view snapshots")
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
