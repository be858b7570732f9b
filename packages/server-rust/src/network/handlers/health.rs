//! Liveness, readiness, and version endpoint handlers.
//!
//! These handlers expose server health information for orchestrators
//! (Kubernetes, load balancers) and operational monitoring.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::{ApiError, AppState};
use crate::health::BuildInfo;

/// Kubernetes liveness probe -- always returns 200 OK.
///
/// The liveness probe only checks whether the process is running and
/// responsive. It does not check downstream dependencies, because a failed
/// liveness probe triggers a pod restart.
pub async fn liveness_handler(State(state): State<AppState>) -> StatusCode {
    state.health.liveness();
    StatusCode::OK
}

/// Kubernetes readiness probe -- returns 200 when every dependency is
/// ready, 503 naming the first one that is not.
///
/// # Errors
///
/// Returns a 503 [`ApiError`] when a dependency is not ready.
pub async fn readiness_handler(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .health
        .readiness()
        .map(|()| StatusCode::OK)
        .map_err(|err| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))
}

/// Build metadata as JSON.
pub async fn version_handler(State(state): State<AppState>) -> Json<BuildInfo> {
    Json(state.health.version().clone())
}
