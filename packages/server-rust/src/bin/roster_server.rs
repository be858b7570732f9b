//! `roster-server`: wires store, repository, notifier, service pipeline and
//! HTTP transport, then serves until `ctrl_c` or SIGTERM.

use std::sync::Arc;

use clap::Parser;
use roster_core::UserEnvelope;
use roster_server::health::{Dependency, HealthService, Readiness};
use roster_server::network::{AppState, NetworkModule};
use roster_server::notify::{ChannelNotifier, EnvelopeHandler, Notifier};
use roster_server::repository::{
    MemoryUserRepository, ReportingRepository, TracingRepository, UserRepository,
};
use roster_server::service::{build_operation_pipeline, UserClient, UserService};
use roster_server::store::MemoryStore;
#[cfg(feature = "postgres")]
use roster_server::store::ConnectionPair;
use roster_server::{telemetry, ErrorReporter, LogReporter, RosterConfig, StoreKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Store-backed components and the pools behind them.
struct Backend {
    repo: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
    #[cfg(feature = "postgres")]
    pair: Option<ConnectionPair>,
}

impl Backend {
    async fn connect(config: &RosterConfig) -> anyhow::Result<Self> {
        let interval = config.probe_interval();
        let channel = config.store.notify_channel.clone();

        match config.store.store {
            StoreKind::Memory => {
                info!("using in-memory store");
                let store = Arc::new(MemoryStore::new());
                Ok(Self {
                    repo: Arc::new(MemoryUserRepository::new(store, interval)),
                    notifier: Arc::new(ChannelNotifier::new(channel)),
                    #[cfg(feature = "postgres")]
                    pair: None,
                })
            }
            #[cfg(feature = "postgres")]
            StoreKind::Postgres => {
                use roster_server::notify::PgNotifier;
                use roster_server::repository::PgUserRepository;

                let pair =
                    ConnectionPair::connect(&config.master_config(), &config.replica_config())
                        .await?;
                pair.migrate().await?;
                info!("connected to postgres master and replica");

                Ok(Self {
                    repo: Arc::new(PgUserRepository::new(pair.clone(), interval)),
                    notifier: Arc::new(PgNotifier::new(pair.master().clone(), channel)),
                    pair: Some(pair),
                })
            }
            #[cfg(not(feature = "postgres"))]
            StoreKind::Postgres => {
                anyhow::bail!("built without the `postgres` feature; use --store memory")
            }
        }
    }

    async fn close(self) {
        self.notifier.close().await;
        self.repo.close().await;
        #[cfg(feature = "postgres")]
        if let Some(pair) = self.pair {
            pair.close().await;
        }
    }
}

/// Tracing innermost, reporting outermost, each per its toggle.
fn decorate_repository(
    repo: Arc<dyn UserRepository>,
    config: &RosterConfig,
    reporter: &Arc<dyn ErrorReporter>,
) -> Arc<dyn UserRepository> {
    let obs = &config.observability;
    let repo: Arc<dyn UserRepository> = if obs.tracing_enabled {
        Arc::new(TracingRepository::new(repo))
    } else {
        repo
    };
    if obs.error_reporting_enabled {
        Arc::new(ReportingRepository::new(repo, Arc::clone(reporter)))
    } else {
        repo
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RosterConfig::parse();
    let obs = &config.observability;

    telemetry::init_tracing(&obs.log_level, obs.log_json)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting roster-server");

    if obs.metrics_enabled {
        telemetry::install_metrics_exporter(obs.metrics_port)?;
    }

    let reporter: Arc<dyn ErrorReporter> = Arc::new(LogReporter::new(obs.environment.clone()));

    let backend = Backend::connect(&config).await?;
    let repo = decorate_repository(Arc::clone(&backend.repo), &config, &reporter);
    let notifier = Arc::clone(&backend.notifier);

    let handler: EnvelopeHandler = Arc::new(|env: UserEnvelope| {
        debug!(id = %env.id, "user change notification received");
    });
    let subscription = notifier.subscribe(handler).await?;

    let service_config = config.service_config();
    let core = Arc::new(UserService::new(
        repo,
        Arc::clone(&notifier),
        service_config.clone(),
    ));
    let pipeline = build_operation_pipeline(core, &service_config, reporter);
    let shutdown = CancellationToken::new();
    let client = UserClient::new(pipeline, service_config.default_operation_timeout_ms)
        .with_shutdown(shutdown.clone());

    let deps: Vec<Arc<dyn Readiness>> = vec![
        Arc::new(Dependency::repository(Arc::clone(&backend.repo))),
        Arc::new(Dependency::notifier(Arc::clone(&notifier))),
    ];
    let health = Arc::new(HealthService::new(deps));

    let mut network = NetworkModule::new(config.network_config(), AppState { client, health });
    let port = network.start().await?;
    info!(port, "roster-server ready");

    network
        .serve(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    drop(subscription);
    backend.close().await;
    info!("roster-server stopped");
    Ok(())
}
