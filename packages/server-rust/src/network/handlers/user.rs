//! User CRUD handlers.
//!
//! Each handler decodes the HTTP request into one of the four operation
//! inputs, calls the pipeline through [`UserClient`](crate::service::UserClient),
//! and renders the output or an [`ApiError`].

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::Json;
use roster_core::{
    CreateUserRequest, CreateUserResponse, DeleteUserRequest, GetUsersRequest, GetUsersResponse,
    Status, UpdateUserRequest,
};

use super::{ApiError, AppState};
use crate::service::OperationError;

/// `POST /user`
///
/// # Errors
///
/// Returns the mapped [`ApiError`] when the operation fails.
pub async fn create_user_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, ApiError> {
    let ctx = state.context(&method, &uri);
    Ok(Json(state.client.create_user(ctx, req).await?))
}

/// `GET /user?limit=&offset=&<filter>=`
///
/// # Errors
///
/// Returns 400 for a malformed page parameter or an unknown filter key, and
/// the mapped [`ApiError`] when the operation fails.
pub async fn get_users_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<GetUsersResponse>, ApiError> {
    let req = users_request_from_query(params)?;
    let ctx = state.context(&method, &uri);
    Ok(Json(state.client.get_users(ctx, req).await?))
}

/// `PUT /user/{id}`. The path id wins over any id in the body.
///
/// # Errors
///
/// Returns the mapped [`ApiError`] when the operation fails.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    Json(mut req): Json<UpdateUserRequest>,
) -> Result<Json<Status>, ApiError> {
    req.id = id;
    let ctx = state.context(&method, &uri);
    Ok(Json(state.client.update_user(ctx, req).await?))
}

/// `DELETE /user/{id}`
///
/// # Errors
///
/// Returns the mapped [`ApiError`] when the operation fails.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
) -> Result<Json<Status>, ApiError> {
    let ctx = state.context(&method, &uri);
    let resp = state
        .client
        .delete_user(ctx, DeleteUserRequest { id })
        .await?;
    Ok(Json(resp))
}

fn users_request_from_query(params: HashMap<String, String>) -> Result<GetUsersRequest, ApiError> {
    let mut req = GetUsersRequest::default();
    for (key, value) in params {
        match key.as_str() {
            "limit" => req.limit = parse_page_param(&key, &value)?,
            "offset" => req.offset = parse_page_param(&key, &value)?,
            _ => req
                .set_filter(&key, value)
                .map_err(|err| ApiError::from(OperationError::from(err)))?,
        }
    }
    Ok(req)
}

fn parse_page_param(key: &str, value: &str) -> Result<u32, ApiError> {
    value.parse().map_err(|_| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("bad request: {key} must be a non-negative integer"),
        )
    })
}
