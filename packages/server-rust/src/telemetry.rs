//! Process-wide logging and metrics installation.

use std::net::SocketAddr;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::service::middleware::metrics::{REQUESTS_TOTAL, REQUEST_DURATION_SECONDS};

/// Builds the log filter. `RUST_LOG` wins over the configured directive.
///
/// # Errors
///
/// Returns an error if `directive` is not a valid filter.
pub fn env_filter(directive: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter {directive:?}")),
    }
}

/// Installs the global subscriber with human-readable or JSON output.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(directive: &str, json: bool) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(directive)?)
        .with(json.then(|| fmt::layer().json().with_current_span(true)))
        .with((!json).then(fmt::layer))
        .try_init()
        .context("installing tracing subscriber")
}

/// Installs the Prometheus recorder with a scrape listener on `port`.
///
/// Must be called inside a tokio runtime.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or the listener
/// cannot bind.
pub fn install_metrics_exporter(port: u16) -> anyhow::Result<SocketAddr> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("installing prometheus exporter")?;

    metrics::describe_counter!(REQUESTS_TOTAL, "Operations handled, by handler and status code");
    metrics::describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Operation latency including every inner layer"
    );

    info!(%addr, "Prometheus exporter listening");
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_accepts_directives() {
        assert!(env_filter("info,roster_server=debug").is_ok());
    }

    #[test]
    fn env_filter_rejects_garbage() {
        // Only meaningful when RUST_LOG is unset.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(env_filter("info,roster_server=loud").is_err());
        }
    }
}
