//! `PostgreSQL` user repository.
//!
//! Writes go to the master pool, list reads to the replica pool. Statements
//! are assembled with [`QueryBuilder`] so every value is a bound parameter;
//! column names only ever come from the typed [`Attribute`] and [`FilterKey`]
//! enums.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_core::{Attribute, Conditions, NewUser, Pagination, User, UserFields, UserUpdate};
use sqlx::{FromRow, Postgres, QueryBuilder};

use super::readiness::ReadinessMonitor;
use super::{repository_ops, RepositoryError, UserRepository};
use crate::store::ConnectionPair;

const USER_COLUMNS: &str =
    "id, first_name, last_name, nickname, password, email, country, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    first_name: String,
    last_name: String,
    nickname: String,
    password: String,
    email: String,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            fields: UserFields {
                first_name: row.first_name,
                last_name: row.last_name,
                nickname: row.nickname,
                password: row.password,
                email: row.email,
                country: row.country,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Statement builders
// ---------------------------------------------------------------------------

fn insert_user(id: &str, user: &NewUser, now: DateTime<Utc>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO users ({USER_COLUMNS}) VALUES ("));
    let mut values = qb.separated(", ");
    values.push_bind(id.to_string());
    for attr in Attribute::ALL {
        values.push_bind(user.fields.get(attr).to_string());
    }
    values.push_bind(now);
    values.push_bind(now);
    qb.push(")");
    qb
}

fn update_user(update: &UserUpdate, now: DateTime<Utc>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE users SET ");
    let mut set = qb.separated(", ");
    for (attr, value) in update.fields.non_empty() {
        set.push(attr.column())
            .push_unseparated(" = ")
            .push_bind_unseparated(value.to_string());
    }
    set.push("updated_at = ").push_bind_unseparated(now);
    qb.push(" WHERE id = ").push_bind(update.id.clone());
    qb
}

fn delete_user(id: &str) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("DELETE FROM users WHERE id = ");
    qb.push_bind(id.to_string());
    qb
}

fn select_users(conditions: &Conditions, page: Pagination) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
    for (i, (key, value)) in conditions.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(key.column()).push(" = ").push_bind(value.to_string());
    }
    qb.push(" ORDER BY created_at, id LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(i64::from(page.skip()));
    qb
}

// ---------------------------------------------------------------------------
// PgUserRepository
// ---------------------------------------------------------------------------

pub struct PgUserRepository {
    pool: ConnectionPair,
    readiness: ReadinessMonitor,
}

impl PgUserRepository {
    /// Starts the readiness probe over both pools. Must be called inside a
    /// tokio runtime.
    #[must_use]
    pub fn new(pool: ConnectionPair, probe_interval: Duration) -> Self {
        let readiness =
            ReadinessMonitor::start("postgres", Arc::new(pool.clone()), probe_interval);
        Self { pool, readiness }
    }

    #[must_use]
    pub fn readiness(&self) -> &ReadinessMonitor {
        &self.readiness
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    async fn create(&self, user: &NewUser) -> Result<String, RepositoryError> {
        let id = uuid::Uuid::new_v4().to_string();
        insert_user(&id, user, Utc::now())
            .build()
            .execute(self.pool.master())
            .await
            .map_err(|err| RepositoryError::persistence(repository_ops::CREATE, err))?;
        Ok(id)
    }

    async fn update(&self, update: &UserUpdate) -> Result<(), RepositoryError> {
        let result = update_user(update, Utc::now())
            .build()
            .execute(self.pool.master())
            .await
            .map_err(|err| RepositoryError::persistence(repository_ops::UPDATE, err))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                operation: repository_ops::UPDATE,
            });
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let result = delete_user(id)
            .build()
            .execute(self.pool.master())
            .await
            .map_err(|err| RepositoryError::persistence(repository_ops::DELETE, err))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                operation: repository_ops::DELETE,
            });
        }
        Ok(())
    }

    async fn get(
        &self,
        conditions: &Conditions,
        page: Pagination,
    ) -> Result<Vec<User>, RepositoryError> {
        let rows = select_users(conditions, page)
            .build_query_as::<UserRow>()
            .fetch_all(self.pool.replica())
            .await
            .map_err(|err| RepositoryError::persistence(repository_ops::GET, err))?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn close(&self) {
        self.readiness.stop().await;
    }
}
