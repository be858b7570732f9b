//! User repository: the persistence boundary of the user service.
//!
//! - [`MemoryUserRepository`]: backed by a [`MemoryStore`](crate::store::MemoryStore)
//! - [`PgUserRepository`]: master writes, replica reads (`postgres` feature)
//! - [`TracingRepository`] / [`ReportingRepository`]: decorators that add a
//!   span per call or capture persistence failures
//!
//! Readiness of every implementation is driven by a [`ReadinessMonitor`].

use std::sync::Arc;

use async_trait::async_trait;
use roster_core::{Conditions, NewUser, Pagination, User, UserUpdate};

pub mod decorators;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod readiness;

pub use decorators::{ReportingRepository, TracingRepository};
pub use memory::MemoryUserRepository;
#[cfg(feature = "postgres")]
pub use postgres::PgUserRepository;
pub use readiness::{ReadinessMonitor, DEFAULT_PROBE_INTERVAL};

/// Repository method names, used as the operation label on errors and spans.
pub mod repository_ops {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const GET: &str = "get";
}

// ---------------------------------------------------------------------------
// RepositoryError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The targeted identifier matched no row.
    #[error("{operation}: user not found")]
    NotFound { operation: &'static str },
    /// The store rejected the call or could not be reached.
    #[error("{operation}: {source:#}")]
    Persistence {
        operation: &'static str,
        source: anyhow::Error,
    },
}

impl RepositoryError {
    pub fn persistence(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        RepositoryError::Persistence {
            operation,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            RepositoryError::NotFound { operation }
            | RepositoryError::Persistence { operation, .. } => operation,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}

// ---------------------------------------------------------------------------
// UserRepository
// ---------------------------------------------------------------------------

/// Persistence operations on user accounts.
///
/// Writes target the primary store; reads may be served by a replica.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Last readiness value written by the background probe. Never blocks.
    fn is_ready(&self) -> bool;

    /// Inserts a user, assigning identifier and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Persistence`] if the store rejects the row.
    async fn create(&self, user: &NewUser) -> Result<String, RepositoryError>;

    /// Overwrites the non-empty attributes of the addressed user and bumps
    /// `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no row has the identifier.
    async fn update(&self, update: &UserUpdate) -> Result<(), RepositoryError>;

    /// Removes the user with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no row has the identifier.
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    /// Lists users matching every condition, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Persistence`] if the store cannot be read.
    async fn get(
        &self,
        conditions: &Conditions,
        page: Pagination,
    ) -> Result<Vec<User>, RepositoryError>;

    /// Stops the readiness probe. Connections are owned by the caller.
    async fn close(&self);
}

#[async_trait]
impl<T: UserRepository + ?Sized> UserRepository for Arc<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    async fn create(&self, user: &NewUser) -> Result<String, RepositoryError> {
        (**self).create(user).await
    }

    async fn update(&self, update: &UserUpdate) -> Result<(), RepositoryError> {
        (**self).update(update).await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        (**self).delete(id).await
    }

    async fn get(
        &self,
        conditions: &Conditions,
        page: Pagination,
    ) -> Result<Vec<User>, RepositoryError> {
        (**self).get(conditions, page).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}

/// Matches `user` against every condition.
pub(crate) fn matches(user: &User, conditions: &Conditions) -> bool {
    use roster_core::FilterKey;

    conditions.iter().all(|(key, expected)| {
        let actual = match key {
            FilterKey::Id => user.id.as_str(),
            FilterKey::Country => user.fields.country.as_str(),
            FilterKey::Nickname => user.fields.nickname.as_str(),
            FilterKey::FirstName => user.fields.first_name.as_str(),
            FilterKey::LastName => user.fields.last_name.as_str(),
        };
        actual == expected
    })
}
