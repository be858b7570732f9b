//! Repository decorators.
//!
//! Both wrap any [`UserRepository`] and forward every call unchanged; they
//! only observe the outcome.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use roster_core::{Conditions, NewUser, Pagination, User, UserUpdate};
use tracing::{info_span, Instrument};

use super::{repository_ops, RepositoryError, UserRepository};
use crate::report::{ErrorReport, ErrorReporter};

// ---------------------------------------------------------------------------
// TracingRepository
// ---------------------------------------------------------------------------

/// Opens a `repository` span around every data call.
pub struct TracingRepository<R> {
    inner: R,
}

impl<R> TracingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    async fn traced<T, F>(operation: &'static str, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        let span = info_span!(
            "repository",
            operation,
            outcome = tracing::field::Empty,
        );
        let span_handle = span.clone();
        let result = fut.instrument(span).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(RepositoryError::NotFound { .. }) => "not_found",
            Err(RepositoryError::Persistence { .. }) => "error",
        };
        span_handle.record("outcome", outcome);
        result
    }
}

#[async_trait]
impl<R: UserRepository> UserRepository for TracingRepository<R> {
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    async fn create(&self, user: &NewUser) -> Result<String, RepositoryError> {
        Self::traced(repository_ops::CREATE, self.inner.create(user)).await
    }

    async fn update(&self, update: &UserUpdate) -> Result<(), RepositoryError> {
        Self::traced(repository_ops::UPDATE, self.inner.update(update)).await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        Self::traced(repository_ops::DELETE, self.inner.delete(id)).await
    }

    async fn get(
        &self,
        conditions: &Conditions,
        page: Pagination,
    ) -> Result<Vec<User>, RepositoryError> {
        Self::traced(repository_ops::GET, self.inner.get(conditions, page)).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}

// ---------------------------------------------------------------------------
// ReportingRepository
// ---------------------------------------------------------------------------

/// Captures persistence failures. A missing row is an answer, not a fault,
/// and is never reported.
pub struct ReportingRepository<R> {
    inner: R,
    reporter: Arc<dyn ErrorReporter>,
}

impl<R> ReportingRepository<R> {
    pub fn new(inner: R, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { inner, reporter }
    }

    fn observe<T>(&self, result: Result<T, RepositoryError>) -> Result<T, RepositoryError> {
        if let Err(err @ RepositoryError::Persistence { .. }) = &result {
            self.reporter.capture(
                ErrorReport::new(err.to_string())
                    .tag("repository", "user")
                    .tag("method", err.operation()),
            );
        }
        result
    }
}

#[async_trait]
impl<R: UserRepository> UserRepository for ReportingRepository<R> {
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    async fn create(&self, user: &NewUser) -> Result<String, RepositoryError> {
        self.observe(self.inner.create(user).await)
    }

    async fn update(&self, update: &UserUpdate) -> Result<(), RepositoryError> {
        self.observe(self.inner.update(update).await)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.observe(self.inner.delete(id).await)
    }

    async fn get(
        &self,
        conditions: &Conditions,
        page: Pagination,
    ) -> Result<Vec<User>, RepositoryError> {
        self.observe(self.inner.get(conditions, page).await)
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
