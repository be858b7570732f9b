//! Repository over the in-process [`MemoryStore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use roster_core::{Conditions, NewUser, Pagination, User, UserUpdate};

use super::readiness::ReadinessMonitor;
use super::{matches, repository_ops, RepositoryError, UserRepository};
use crate::store::MemoryStore;

pub struct MemoryUserRepository {
    store: Arc<MemoryStore>,
    readiness: ReadinessMonitor,
}

impl MemoryUserRepository {
    /// Starts the readiness probe over `store`. Must be called inside a
    /// tokio runtime.
    #[must_use]
    pub fn new(store: Arc<MemoryStore>, probe_interval: Duration) -> Self {
        let readiness = ReadinessMonitor::start("memory", store.clone(), probe_interval);
        Self { store, readiness }
    }

    #[must_use]
    pub fn readiness(&self) -> &ReadinessMonitor {
        &self.readiness
    }

    fn available(&self, operation: &'static str) -> Result<(), RepositoryError> {
        self.store
            .ensure_available()
            .map_err(|err| RepositoryError::persistence(operation, err))
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    async fn create(&self, user: &NewUser) -> Result<String, RepositoryError> {
        self.available(repository_ops::CREATE)?;

        let now = Utc::now();
        let row = User {
            id: uuid::Uuid::new_v4().to_string(),
            fields: user.fields.clone(),
            created_at: now,
            updated_at: now,
        };
        let id = row.id.clone();
        self.store.write(|rows| rows.push(row));
        Ok(id)
    }

    async fn update(&self, update: &UserUpdate) -> Result<(), RepositoryError> {
        self.available(repository_ops::UPDATE)?;

        let now = Utc::now();
        self.store.write(|rows| {
            let row = rows
                .iter_mut()
                .find(|row| row.id == update.id)
                .ok_or(RepositoryError::NotFound {
                    operation: repository_ops::UPDATE,
                })?;
            row.apply(&update.fields, now);
            Ok(())
        })
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.available(repository_ops::DELETE)?;

        self.store.write(|rows| {
            let before = rows.len();
            rows.retain(|row| row.id != id);
            if rows.len() == before {
                Err(RepositoryError::NotFound {
                    operation: repository_ops::DELETE,
                })
            } else {
                Ok(())
            }
        })
    }

    async fn get(
        &self,
        conditions: &Conditions,
        page: Pagination,
    ) -> Result<Vec<User>, RepositoryError> {
        self.available(repository_ops::GET)?;

        Ok(self.store.read(|rows| {
            rows.iter()
                .filter(|row| matches(row, conditions))
                .skip(page.skip() as usize)
                .take(page.limit as usize)
                .cloned()
                .collect()
        }))
    }

    async fn close(&self) {
        self.readiness.stop().await;
    }
}
