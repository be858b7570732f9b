//! `PostgreSQL` master/replica connection pair.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use super::Probe;

/// Connection parameters for one `PostgreSQL` endpoint.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// libpq-style SSL mode (`disable`, `prefer`, `require`, ...).
    pub ssl_mode: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "roster".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl DatabaseConfig {
    /// Builds connect options for this endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `ssl_mode` is not a recognised mode.
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        let ssl_mode: PgSslMode = self
            .ssl_mode
            .parse()
            .with_context(|| format!("invalid ssl mode {:?}", self.ssl_mode))?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(ssl_mode))
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Read-write master pool and read-only replica pool.
///
/// Writes go through [`master`](Self::master) only. Every replica session
/// runs with `default_transaction_read_only=on`, so a write sent to the
/// replica is rejected by the server.
#[derive(Debug, Clone)]
pub struct ConnectionPair {
    master: PgPool,
    replica: PgPool,
}

impl ConnectionPair {
    /// Connects both pools.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint cannot be reached.
    pub async fn connect(master: &DatabaseConfig, replica: &DatabaseConfig) -> anyhow::Result<Self> {
        let master_pool = master
            .pool_options()
            .connect_with(master.connect_options()?)
            .await
            .context("master DB connect")?;

        let replica_pool = replica
            .pool_options()
            .connect_with(read_only(replica.connect_options()?))
            .await
            .context("replica DB connect")?;

        Ok(Self {
            master: master_pool,
            replica: replica_pool,
        })
    }

    /// Creates pools that connect on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration is invalid.
    pub fn connect_lazy(master: &DatabaseConfig, replica: &DatabaseConfig) -> anyhow::Result<Self> {
        Ok(Self {
            master: master.pool_options().connect_lazy_with(master.connect_options()?),
            replica: replica
                .pool_options()
                .connect_lazy_with(read_only(replica.connect_options()?)),
        })
    }

    /// Read-write handle.
    #[must_use]
    pub fn master(&self) -> &PgPool {
        &self.master
    }

    /// Read-only handle.
    #[must_use]
    pub fn replica(&self) -> &PgPool {
        &self.replica
    }

    /// Creates the `users` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statement fails.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id VARCHAR(64) PRIMARY KEY,
                first_name VARCHAR(64) NOT NULL DEFAULT '',
                last_name VARCHAR(64) NOT NULL DEFAULT '',
                nickname VARCHAR(64) NOT NULL DEFAULT '',
                password VARCHAR(64) NOT NULL DEFAULT '',
                email VARCHAR(64) NOT NULL DEFAULT '',
                country VARCHAR(64) NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.master)
        .await
        .context("create users table")?;

        for column in ["country", "nickname", "first_name", "last_name"] {
            let ddl = format!("CREATE INDEX IF NOT EXISTS users_{column}_idx ON users ({column})");
            sqlx::query(&ddl)
                .execute(&self.master)
                .await
                .with_context(|| format!("create index on {column}"))?;
        }
        Ok(())
    }

    /// Closes both pools, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.master.close().await;
        self.replica.close().await;
    }
}

fn read_only(options: PgConnectOptions) -> PgConnectOptions {
    options.options([("default_transaction_read_only", "on")])
}

#[async_trait]
impl Probe for ConnectionPair {
    async fn check(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.master)
            .await
            .context("ping master")?;
        sqlx::query("SELECT 1")
            .execute(&self.replica)
            .await
            .context("ping replica")?;
        Ok(())
    }
}
