//! Command-line and environment configuration.
//!
//! Every option has a `--flag` and a `ROSTER_*` environment variable. Layer
//! toggles take an explicit value (`--metrics-enabled false`).

use std::time::Duration;

use clap::{ArgAction, Args, Parser, ValueEnum};
use roster_core::{DEFAULT_MAX_PAGE_LIMIT, USER_UPDATED_CHANNEL};

use crate::network::NetworkConfig;
use crate::service::ServiceConfig;
#[cfg(feature = "postgres")]
use crate::store::DatabaseConfig;

/// Backing store for users and change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// In-process table and broadcast channel. Nothing survives a restart.
    Memory,
    /// `PostgreSQL` master/replica pair with `LISTEN`/`NOTIFY`.
    Postgres,
}

/// Roster user service.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct RosterConfig {
    #[command(flatten)]
    pub http: HttpArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub observability: ObservabilityArgs,

    /// Largest page size a list call may request.
    #[arg(
        long,
        env = "ROSTER_MAX_PAGE_LIMIT",
        default_value_t = DEFAULT_MAX_PAGE_LIMIT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_page_limit: u32,

    /// Deadline for store calls made on behalf of one request.
    #[arg(long, env = "ROSTER_OPERATION_TIMEOUT_MS", default_value_t = 30_000)]
    pub operation_timeout_ms: u64,

    /// Seconds between dependency readiness probes.
    #[arg(
        long,
        env = "ROSTER_PROBE_INTERVAL_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub probe_interval_secs: u64,
}

#[derive(Debug, Clone, Args)]
pub struct HttpArgs {
    #[arg(long = "http-host", env = "ROSTER_HTTP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long = "http-port", env = "ROSTER_HTTP_PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "ROSTER_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Comma-separated allowed origins; `*` allows any.
    #[arg(
        long,
        env = "ROSTER_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    #[arg(long, env = "ROSTER_STORE", value_enum, default_value_t = StoreKind::Postgres)]
    pub store: StoreKind,

    /// Channel change notifications are published on.
    #[arg(long, env = "ROSTER_NOTIFY_CHANNEL", default_value = USER_UPDATED_CHANNEL)]
    pub notify_channel: String,

    #[arg(long, env = "ROSTER_MASTER_HOST", default_value = "localhost")]
    pub master_host: String,
    #[arg(long, env = "ROSTER_MASTER_PORT", default_value_t = 5432)]
    pub master_port: u16,
    #[arg(long, env = "ROSTER_MASTER_USER", default_value = "postgres")]
    pub master_user: String,
    #[arg(long, env = "ROSTER_MASTER_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub master_password: String,
    #[arg(long, env = "ROSTER_MASTER_DATABASE", default_value = "roster")]
    pub master_database: String,
    #[arg(long, env = "ROSTER_MASTER_SSL_MODE", default_value = "disable")]
    pub master_ssl_mode: String,
    #[arg(long, env = "ROSTER_MASTER_MAX_CONNECTIONS", default_value_t = 10)]
    pub master_max_connections: u32,

    #[arg(long, env = "ROSTER_REPLICA_HOST", default_value = "localhost")]
    pub replica_host: String,
    #[arg(long, env = "ROSTER_REPLICA_PORT", default_value_t = 5432)]
    pub replica_port: u16,
    #[arg(long, env = "ROSTER_REPLICA_USER", default_value = "postgres")]
    pub replica_user: String,
    #[arg(long, env = "ROSTER_REPLICA_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub replica_password: String,
    #[arg(long, env = "ROSTER_REPLICA_DATABASE", default_value = "roster")]
    pub replica_database: String,
    #[arg(long, env = "ROSTER_REPLICA_SSL_MODE", default_value = "disable")]
    pub replica_ssl_mode: String,
    #[arg(long, env = "ROSTER_REPLICA_MAX_CONNECTIONS", default_value_t = 10)]
    pub replica_max_connections: u32,
}

#[derive(Debug, Clone, Args)]
pub struct ObservabilityArgs {
    /// `tracing` filter directive, e.g. `info,roster_server=debug`.
    #[arg(long, env = "ROSTER_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "ROSTER_LOG_JSON")]
    pub log_json: bool,

    #[arg(long, env = "ROSTER_LOGGING_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub logging_enabled: bool,

    #[arg(long, env = "ROSTER_TRACING_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub tracing_enabled: bool,

    #[arg(long, env = "ROSTER_METRICS_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub metrics_enabled: bool,

    #[arg(long, env = "ROSTER_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    #[arg(
        long,
        env = "ROSTER_ERROR_REPORTING_ENABLED",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub error_reporting_enabled: bool,

    /// Environment tag attached to error reports.
    #[arg(long, env = "ROSTER_ENVIRONMENT", default_value = "development")]
    pub environment: String,
}

impl RosterConfig {
    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        let obs = &self.observability;
        ServiceConfig {
            max_page_limit: self.max_page_limit,
            default_operation_timeout_ms: self.operation_timeout_ms,
            metrics_enabled: obs.metrics_enabled,
            logging_enabled: obs.logging_enabled,
            tracing_enabled: obs.tracing_enabled,
            error_reporting_enabled: obs.error_reporting_enabled,
            ..ServiceConfig::default()
        }
    }

    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.http.host.clone(),
            port: self.http.port,
            cors_origins: self.http.cors_origins.clone(),
            request_timeout: Duration::from_millis(self.http.request_timeout_ms),
        }
    }

    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn master_config(&self) -> DatabaseConfig {
        let s = &self.store;
        DatabaseConfig {
            host: s.master_host.clone(),
            port: s.master_port,
            user: s.master_user.clone(),
            password: s.master_password.clone(),
            database: s.master_database.clone(),
            ssl_mode: s.master_ssl_mode.clone(),
            max_connections: s.master_max_connections,
            ..DatabaseConfig::default()
        }
    }

    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn replica_config(&self) -> DatabaseConfig {
        let s = &self.store;
        DatabaseConfig {
            host: s.replica_host.clone(),
            port: s.replica_port,
            user: s.replica_user.clone(),
            password: s.replica_password.clone(),
            database: s.replica_database.clone(),
            ssl_mode: s.replica_ssl_mode.clone(),
            max_connections: s.replica_max_connections,
            ..DatabaseConfig::default()
        }
    }
}
