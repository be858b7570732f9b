//! Core user service: business rules without observation concerns.
//!
//! Validates input, delegates to the repository within the operation's
//! cancellation and deadline, translates repository errors into the
//! `{ValidationFailed, NotFound, Unavailable}` vocabulary, and fires the
//! change notification after a committed update.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use roster_core::{
    CreateUserRequest, CreateUserResponse, DeleteUserRequest, GetUsersRequest, GetUsersResponse,
    Pagination, Status, UpdateUserRequest, UserEnvelope, UserView, Validate,
};
use tower::Service;
use tracing::{debug, error};

use crate::notify::Notifier;
use crate::repository::{RepositoryError, UserRepository};
use crate::service::config::ServiceConfig;
use crate::service::operation::{
    operation_names, Operation, OperationContext, OperationError, OperationResponse,
};

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
    config: ServiceConfig,
}

impl UserService {
    #[must_use]
    pub fn new(
        repo: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            notifier,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Creates a user and returns its identifier.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` when the password confirmation differs,
    /// `Unavailable` when the store fails.
    pub async fn create_user(
        &self,
        ctx: &OperationContext,
        req: &CreateUserRequest,
    ) -> Result<CreateUserResponse, OperationError> {
        req.validate()?;
        let user = req.to_new_user();
        let id = guarded(ctx, operation_names::CREATE_USER, self.repo.create(&user)).await?;
        Ok(CreateUserResponse { id })
    }

    /// Lists one page of users matching the supplied filter fields.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` when the limit exceeds the ceiling,
    /// `Unavailable` when the store fails.
    pub async fn get_users(
        &self,
        ctx: &OperationContext,
        req: &GetUsersRequest,
    ) -> Result<GetUsersResponse, OperationError> {
        let page = Pagination::resolve(req.limit, req.offset, self.config.max_page_limit)?;
        let conditions = req.conditions();
        let users = guarded(
            ctx,
            operation_names::GET_USERS,
            self.repo.get(&conditions, page),
        )
        .await?;
        Ok(GetUsersResponse(users.iter().map(UserView::from).collect()))
    }

    /// Applies the non-empty fields of `req`, then publishes the change in
    /// the background.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` without an id, `NotFound` for an unknown id,
    /// `Unavailable` when the store fails.
    pub async fn update_user(
        &self,
        ctx: &OperationContext,
        req: &UpdateUserRequest,
    ) -> Result<Status, OperationError> {
        req.validate()?;
        guarded(
            ctx,
            operation_names::UPDATE_USER,
            self.repo.update(&req.to_update()),
        )
        .await?;

        self.publish_detached(req.to_envelope());
        Ok(Status::ok())
    }

    /// Removes a user. Deletes emit no notification.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` without an id, `NotFound` for an unknown id,
    /// `Unavailable` when the store fails.
    pub async fn delete_user(
        &self,
        ctx: &OperationContext,
        req: &DeleteUserRequest,
    ) -> Result<Status, OperationError> {
        req.validate()?;
        guarded(ctx, operation_names::DELETE_USER, self.repo.delete(&req.id)).await?;
        Ok(Status::ok())
    }

    /// Spawns the publish on its own task. The caller's result is already
    /// decided; a failure here is only logged.
    fn publish_detached(&self, envelope: UserEnvelope) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match notifier.publish(&envelope).await {
                Ok(()) => debug!(channel = notifier.channel(), id = %envelope.id, "change published"),
                Err(err) => error!(
                    channel = notifier.channel(),
                    id = %envelope.id,
                    error = %err,
                    "change notification failed"
                ),
            }
        });
    }

    async fn dispatch(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        match op {
            Operation::CreateUser { ctx, req } => self
                .create_user(&ctx, &req)
                .await
                .map(OperationResponse::Created),
            Operation::GetUsers { ctx, req } => {
                self.get_users(&ctx, &req).await.map(OperationResponse::Users)
            }
            Operation::UpdateUser { ctx, req } => self
                .update_user(&ctx, &req)
                .await
                .map(OperationResponse::Status),
            Operation::DeleteUser { ctx, req } => self
                .delete_user(&ctx, &req)
                .await
                .map(OperationResponse::Status),
        }
    }
}

/// Runs a repository call under the operation's cancellation and deadline.
async fn guarded<T, F>(
    ctx: &OperationContext,
    operation: &'static str,
    fut: F,
) -> Result<T, OperationError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match ctx.guard(fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(RepositoryError::NotFound { .. })) => Err(OperationError::NotFound),
        Ok(Err(err)) => Err(OperationError::unavailable(operation, err)),
        Err(interrupted) => Err(OperationError::unavailable(operation, interrupted)),
    }
}

impl Service<Operation> for Arc<UserService> {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let svc = Arc::clone(self);
        Box::pin(async move { svc.dispatch(op).await })
    }
}
