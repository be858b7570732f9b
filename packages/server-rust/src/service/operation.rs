//! Operation types carried through the decoration pipeline.

use std::future::Future;
use std::time::Duration;

use roster_core::{
    CreateUserRequest, CreateUserResponse, DeleteUserRequest, GetUsersRequest, GetUsersResponse,
    Observed, Status, UpdateUserRequest, ValidationError,
};
use tokio_util::sync::CancellationToken;

/// Operation names as they appear in logs, spans, metrics and reports.
pub mod operation_names {
    pub const CREATE_USER: &str = "CreateUser";
    pub const GET_USERS: &str = "GetUsers";
    pub const UPDATE_USER: &str = "UpdateUser";
    pub const DELETE_USER: &str = "DeleteUser";
}

// ---------------------------------------------------------------------------
// OperationContext
// ---------------------------------------------------------------------------

/// Transport the call arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    Http { method: String, url: String },
    Grpc,
    Internal,
}

impl Protocol {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http { .. } => "HTTP",
            Protocol::Grpc => "GRPC",
            Protocol::Internal => "internal",
        }
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Protocol::Http { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Context carried with every operation through the pipeline.
///
/// The cancellation token and timeout bound the store calls made on behalf
/// of this operation. Background work spawned by an operation (notification
/// publishing) is never bound to them.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    pub protocol: Protocol,
    /// Deadline for store calls in milliseconds. Zero disables the deadline.
    pub call_timeout_ms: u64,
    pub cancel: CancellationToken,
}

impl OperationContext {
    #[must_use]
    pub fn new(call_id: u64, protocol: Protocol, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            protocol,
            call_timeout_ms,
            cancel: CancellationToken::new(),
        }
    }

    /// Binds the operation to an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs `fut` until it completes, the caller cancels, or the deadline
    /// passes. An interrupted future is dropped, abandoning the in-flight
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the call was cancelled or timed out.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        let timeout_ms = self.call_timeout_ms;
        let deadline = async move {
            if timeout_ms == 0 {
                std::future::pending::<()>().await;
            } else {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            output = fut => Ok(output),
            () = deadline => Err(Interrupted::DeadlineExceeded { timeout_ms }),
        }
    }
}

/// Why a guarded call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("call cancelled by caller")]
    Cancelled,
    #[error("call exceeded deadline of {timeout_ms}ms")]
    DeadlineExceeded { timeout_ms: u64 },
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Typed operation variants dispatched through the pipeline.
#[derive(Debug)]
pub enum Operation {
    CreateUser {
        ctx: OperationContext,
        req: CreateUserRequest,
    },
    GetUsers {
        ctx: OperationContext,
        req: GetUsersRequest,
    },
    UpdateUser {
        ctx: OperationContext,
        req: UpdateUserRequest,
    },
    DeleteUser {
        ctx: OperationContext,
        req: DeleteUserRequest,
    },
}

impl Operation {
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Operation::CreateUser { ctx, .. }
            | Operation::GetUsers { ctx, .. }
            | Operation::UpdateUser { ctx, .. }
            | Operation::DeleteUser { ctx, .. } => ctx,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateUser { .. } => operation_names::CREATE_USER,
            Operation::GetUsers { .. } => operation_names::GET_USERS,
            Operation::UpdateUser { .. } => operation_names::UPDATE_USER,
            Operation::DeleteUser { .. } => operation_names::DELETE_USER,
        }
    }

    /// The request payload, viewed through its observation capability.
    #[must_use]
    pub fn request(&self) -> &dyn Observed {
        match self {
            Operation::CreateUser { req, .. } => req,
            Operation::GetUsers { req, .. } => req,
            Operation::UpdateUser { req, .. } => req,
            Operation::DeleteUser { req, .. } => req,
        }
    }
}

// ---------------------------------------------------------------------------
// OperationResponse
// ---------------------------------------------------------------------------

/// Successful response from the user service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResponse {
    Created(CreateUserResponse),
    Users(GetUsersResponse),
    Status(Status),
}

impl OperationResponse {
    /// The response payload, viewed through its observation capability.
    #[must_use]
    pub fn observed(&self) -> &dyn Observed {
        match self {
            OperationResponse::Created(resp) => resp,
            OperationResponse::Users(resp) => resp,
            OperationResponse::Status(resp) => resp,
        }
    }
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// The three error kinds visible past the user service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailed,
    NotFound,
    Unavailable,
}

/// Errors returned by the user service and every decorator around it.
///
/// Decorators observe these but never convert one kind into another.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("bad request: {0}")]
    ValidationFailed(#[from] ValidationError),
    #[error("not found")]
    NotFound,
    #[error("{operation}: {source:#}")]
    Unavailable {
        operation: &'static str,
        source: anyhow::Error,
    },
}

impl OperationError {
    /// Wraps a dependency failure with the operation it happened in.
    pub fn unavailable(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        OperationError::Unavailable {
            operation,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            OperationError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            OperationError::NotFound => ErrorKind::NotFound,
            OperationError::Unavailable { .. } => ErrorKind::Unavailable,
        }
    }

    /// HTTP-style status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::ValidationFailed => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Unavailable => 503,
        }
    }
}

/// Status code of an operation outcome; success maps to 200.
#[must_use]
pub fn status_code_of<T>(result: &Result<T, OperationError>) -> u16 {
    match result {
        Ok(_) => 200,
        Err(err) => err.status_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(timeout_ms: u64) -> OperationContext {
        OperationContext::new(1, Protocol::Internal, timeout_ms)
    }

    #[test]
    fn status_codes_follow_error_kind() {
        let ok: Result<(), OperationError> = Ok(());
        assert_eq!(status_code_of(&ok), 200);
        assert_eq!(
            OperationError::from(ValidationError::MissingId).status_code(),
            400
        );
        assert_eq!(OperationError::NotFound.status_code(), 404);
        assert_eq!(
            OperationError::unavailable("GetUsers", anyhow::anyhow!("db down")).status_code(),
            503
        );
    }

    #[test]
    fn unavailable_message_names_operation() {
        let err = OperationError::unavailable("CreateUser", anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "CreateUser: connection refused");
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn operation_name_and_protocol() {
        let op = Operation::DeleteUser {
            ctx: OperationContext::new(
                7,
                Protocol::Http {
                    method: "DELETE".to_string(),
                    url: "/user/u1".to_string(),
                },
                0,
            ),
            req: DeleteUserRequest {
                id: "u1".to_string(),
            },
        };
        assert_eq!(op.name(), "DeleteUser");
        assert_eq!(op.ctx().call_id, 7);
        assert_eq!(op.ctx().protocol.as_str(), "HTTP");
        assert_eq!(op.ctx().protocol.url(), Some("/user/u1"));
        assert_eq!(op.request().log_fields(), vec![("id", "u1".to_string())]);
    }

    #[tokio::test]
    async fn guard_passes_through_completed_future() {
        let out = ctx(1000).guard(async { 5 }).await.unwrap();
        assert_eq!(out, 5);
    }

    #[tokio::test]
    async fn guard_reports_cancellation() {
        let ctx = ctx(0);
        ctx.cancel.cancel();
        let err = ctx.guard(std::future::pending::<()>()).await.unwrap_err();
        assert_eq!(err, Interrupted::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn guard_enforces_deadline() {
        let err = ctx(50)
            .guard(tokio::time::sleep(Duration::from_secs(10)))
            .await
            .unwrap_err();
        assert_eq!(err, Interrupted::DeadlineExceeded { timeout_ms: 50 });
    }
}
