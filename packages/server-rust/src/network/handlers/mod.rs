//! HTTP handler definitions.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors), the error body every handler renders, and re-exports the
//! handler functions used by the router.

pub mod health;
pub mod user;

pub use health::{liveness_handler, readiness_handler, version_handler};
pub use user::{create_user_handler, delete_user_handler, get_users_handler, update_user_handler};

use std::sync::Arc;

use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::health::HealthService;
use crate::service::{ErrorKind, OperationContext, OperationError, Protocol, UserClient};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds shared handles only, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Typed entry point into the operation pipeline.
    pub client: UserClient,
    pub health: Arc<HealthService>,
}

impl AppState {
    /// Operation context for an HTTP request.
    pub(crate) fn context(&self, method: &Method, uri: &Uri) -> OperationContext {
        self.client.context(Protocol::Http {
            method: method.to_string(),
            url: uri
                .path_and_query()
                .map_or_else(|| uri.path().to_string(), ToString::to_string),
        })
    }
}

/// Error rendered as `{"error": "..."}` with the mapped status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Dependency details stay in logs and reports.
        let message = match err.kind() {
            ErrorKind::Unavailable => "service unavailable".to_string(),
            ErrorKind::ValidationFailed | ErrorKind::NotFound => err.to_string(),
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
