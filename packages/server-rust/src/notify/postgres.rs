//! Notifier over `PostgreSQL` `LISTEN` / `NOTIFY`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roster_core::UserEnvelope;
use sqlx::postgres::{PgListener, PgPool};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{deliver, EnvelopeHandler, Notifier, NotifyError, Subscription};

/// Pause before a subscription retries after the listener connection broke.
const LISTEN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Publishes with `pg_notify` on the master pool; each subscription holds
/// one dedicated `LISTEN` connection.
///
/// Readiness follows the last transport interaction: a failed publish or a
/// broken listener marks the notifier not ready until the next success.
pub struct PgNotifier {
    pool: PgPool,
    channel: String,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl PgNotifier {
    #[must_use]
    pub fn new(pool: PgPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
            connected: Arc::new(AtomicBool::new(true)),
            shutdown: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::Acquire)
            && !self.pool.is_closed()
            && !self.shutdown.is_cancelled()
    }

    async fn publish(&self, envelope: &UserEnvelope) -> Result<(), NotifyError> {
        if self.shutdown.is_cancelled() {
            return Err(NotifyError::Disconnected);
        }
        let payload = envelope.encode()?;
        let sent = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(self.channel.as_str())
            .bind(payload)
            .execute(&self.pool)
            .await;
        self.connected.store(sent.is_ok(), Ordering::Release);
        sent.map(|_| ())
            .map_err(|err| NotifyError::Transport(err.into()))
    }

    async fn subscribe(&self, handler: EnvelopeHandler) -> Result<Subscription, NotifyError> {
        if self.shutdown.is_cancelled() {
            return Err(NotifyError::Disconnected);
        }
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|err| NotifyError::Transport(err.into()))?;
        listener
            .listen(&self.channel)
            .await
            .map_err(|err| NotifyError::Transport(err.into()))?;

        let channel = self.channel.clone();
        let connected = self.connected.clone();
        let shutdown = self.shutdown.clone();
        info!(channel = %channel, "subscribed to notifications");

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    received = listener.recv() => match received {
                        Ok(notification) => {
                            connected.store(true, Ordering::Release);
                            deliver(&channel, notification.payload(), &handler);
                        }
                        Err(err) => {
                            connected.store(false, Ordering::Release);
                            warn!(channel = %channel, error = %err, "notification listener failed");
                            tokio::time::sleep(LISTEN_RETRY_DELAY).await;
                        }
                    },
                }
            }
        });
        Ok(Subscription::new(handle))
    }

    async fn close(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DatabaseConfig;

    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy_with(DatabaseConfig::default().connect_options().unwrap())
    }

    #[tokio::test]
    async fn ready_until_closed() {
        let notifier = PgNotifier::new(lazy_pool(), "roster_user_updated");
        assert_eq!(notifier.channel(), "roster_user_updated");
        assert!(notifier.is_ready());

        notifier.close().await;
        assert!(!notifier.is_ready());
        assert!(matches!(
            notifier.publish(&UserEnvelope::default()).await,
            Err(NotifyError::Disconnected)
        ));
    }
}
