//! Typed facade over the operation pipeline.
//!
//! Transports call the four typed methods; the client wraps each request in
//! an [`Operation`], drives it through the pipeline, and unwraps the
//! matching response variant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use roster_core::{
    CreateUserRequest, CreateUserResponse, DeleteUserRequest, GetUsersRequest, GetUsersResponse,
    Status, UpdateUserRequest,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use super::middleware::PipelineService;
use super::operation::{Operation, OperationContext, OperationError, OperationResponse, Protocol};

#[derive(Clone)]
pub struct UserClient {
    pipeline: PipelineService,
    next_call_id: Arc<AtomicU64>,
    call_timeout_ms: u64,
    shutdown: CancellationToken,
}

impl UserClient {
    #[must_use]
    pub fn new(pipeline: PipelineService, call_timeout_ms: u64) -> Self {
        Self {
            pipeline,
            next_call_id: Arc::new(AtomicU64::new(1)),
            call_timeout_ms,
            shutdown: CancellationToken::new(),
        }
    }

    /// Ties every context handed out afterwards to `shutdown`: cancelling it
    /// interrupts in-flight store calls.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Fresh context with the next call id and the default deadline.
    #[must_use]
    pub fn context(&self, protocol: Protocol) -> OperationContext {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        OperationContext::new(call_id, protocol, self.call_timeout_ms)
            .with_cancellation(self.shutdown.child_token())
    }

    /// # Errors
    ///
    /// Returns the pipeline's [`OperationError`] unchanged.
    pub async fn create_user(
        &self,
        ctx: OperationContext,
        req: CreateUserRequest,
    ) -> Result<CreateUserResponse, OperationError> {
        match self.call(Operation::CreateUser { ctx, req }).await? {
            OperationResponse::Created(resp) => Ok(resp),
            other => Err(mismatch("CreateUser", &other)),
        }
    }

    /// # Errors
    ///
    /// Returns the pipeline's [`OperationError`] unchanged.
    pub async fn get_users(
        &self,
        ctx: OperationContext,
        req: GetUsersRequest,
    ) -> Result<GetUsersResponse, OperationError> {
        match self.call(Operation::GetUsers { ctx, req }).await? {
            OperationResponse::Users(resp) => Ok(resp),
            other => Err(mismatch("GetUsers", &other)),
        }
    }

    /// # Errors
    ///
    /// Returns the pipeline's [`OperationError`] unchanged.
    pub async fn update_user(
        &self,
        ctx: OperationContext,
        req: UpdateUserRequest,
    ) -> Result<Status, OperationError> {
        match self.call(Operation::UpdateUser { ctx, req }).await? {
            OperationResponse::Status(status) => Ok(status),
            other => Err(mismatch("UpdateUser", &other)),
        }
    }

    /// # Errors
    ///
    /// Returns the pipeline's [`OperationError`] unchanged.
    pub async fn delete_user(
        &self,
        ctx: OperationContext,
        req: DeleteUserRequest,
    ) -> Result<Status, OperationError> {
        match self.call(Operation::DeleteUser { ctx, req }).await? {
            OperationResponse::Status(status) => Ok(status),
            other => Err(mismatch("DeleteUser", &other)),
        }
    }

    async fn call(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        self.pipeline.clone().oneshot(op).await
    }
}

fn mismatch(operation: &'static str, resp: &OperationResponse) -> OperationError {
    OperationError::unavailable(
        operation,
        anyhow::anyhow!("unexpected response variant: {resp:?}"),
    )
}
