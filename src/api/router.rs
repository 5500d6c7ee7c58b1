use axum::{middleware as axum_middleware, routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::handlers::{health_handler, readiness_handler, snapshot_handler};
use crate::api::middleware::{
    metrics,
    rate_limiting::{rate_limit_middleware, RateLimiter},
};
use crate::api::openapi::openapi_handler;
use crate::application::use_cases::MaterializeViewUseCase;

/// Application state container
#[derive(Clone)]
pub struct AppState {
    pub materialize_use_case: Arc<MaterializeViewUseCase>,
    pub cache_root: Arc<PathBuf>,
    /// `None` disables rate limiting
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub request_timeout: Duration,
}

/// Create router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let rate_limiter = state.rate_limiter.clone();

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .route("/{database}/{schema}/{file}", get(snapshot_handler))
        .with_state(state);

    let router = match rate_limiter {
        Some(limiter) => router.layer(axum_middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        )),
        None => router,
    };

    // Outermost so throttled requests are logged too
    router.layer(axum_middleware::from_fn(metrics::metrics_middleware))
}
