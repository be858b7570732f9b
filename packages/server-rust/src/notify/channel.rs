//! In-process notifier over a `tokio` broadcast channel.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use roster_core::UserEnvelope;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{deliver, EnvelopeHandler, Notifier, NotifyError, Subscription};

/// Broadcast capacity used by [`ChannelNotifier::new`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Notifier whose transport lives inside the process.
///
/// Envelopes travel JSON-encoded, the same as on an external transport.
/// A subscriber that falls more than the channel capacity behind loses the
/// oldest messages. `set_connected(false)` makes publishes fail as if the
/// transport were unreachable.
pub struct ChannelNotifier {
    channel: String,
    sender: broadcast::Sender<String>,
    connected: AtomicBool,
    shutdown: CancellationToken,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self::with_capacity(channel, DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(channel: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            channel: channel.into(),
            sender,
            connected: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.shutdown.is_cancelled()
    }

    async fn publish(&self, envelope: &UserEnvelope) -> Result<(), NotifyError> {
        if !self.is_ready() {
            return Err(NotifyError::Disconnected);
        }
        let payload = envelope.encode()?;
        // No receivers is not a send failure: nobody is listening yet.
        if self.sender.send(payload).is_err() {
            debug!(channel = %self.channel, "published with no subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, handler: EnvelopeHandler) -> Result<Subscription, NotifyError> {
        if self.shutdown.is_cancelled() {
            return Err(NotifyError::Disconnected);
        }
        let mut rx = self.sender.subscribe();
        let shutdown = self.shutdown.clone();
        let channel = self.channel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(payload) => deliver(&channel, &payload, &handler),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(channel = %channel, skipped, "subscriber lagged, envelopes dropped");
                        }
                        Err(RecvError::Closed) => break,
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
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    fn envelope(id: &str, nickname: &str) -> UserEnvelope {
        UserEnvelope {
            id: id.to_string(),
            nickname: nickname.to_string(),
            ..UserEnvelope::default()
        }
    }

    fn collecting_handler() -> (EnvelopeHandler, mpsc::UnboundedReceiver<UserEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: EnvelopeHandler = Arc::new(move |env: UserEnvelope| {
            let _ = tx.send(env);
        });
        (handler, rx)
    }

    #[tokio::test]
    async fn subscriber_receives_published_envelope() {
        let notifier = ChannelNotifier::new("users");
        let (handler, mut rx) = collecting_handler();
        let _sub = notifier.subscribe(handler).await.unwrap();

        notifier.publish(&envelope("u1", "alice2")).await.unwrap();

        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, envelope("u1", "alice2"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let notifier = ChannelNotifier::new("users");
        assert!(notifier.publish(&envelope("u1", "a")).await.is_ok());
    }

    #[tokio::test]
    async fn disconnected_transport_fails_publish() {
        let notifier = ChannelNotifier::new("users");
        notifier.set_connected(false);
        assert!(!notifier.is_ready());
        assert!(matches!(
            notifier.publish(&envelope("u1", "a")).await,
            Err(NotifyError::Disconnected)
        ));

        notifier.set_connected(true);
        assert!(notifier.is_ready());
    }

    #[tokio::test]
    async fn close_stops_subscriptions() {
        let notifier = ChannelNotifier::new("users");
        let (handler, _rx) = collecting_handler();
        let sub = notifier.subscribe(handler).await.unwrap();
        assert!(sub.is_active());

        notifier.close().await;
        tokio::time::timeout(Duration::from_secs(1), async {
            while sub.is_active() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert!(!notifier.is_ready());
        assert!(notifier.subscribe(Arc::new(|_: UserEnvelope| {})).await.is_err());
    }

    #[tokio::test]
    async fn dropping_subscription_stops_delivery() {
        let notifier = ChannelNotifier::new("users");
        let (handler, mut rx) = collecting_handler();
        let sub = notifier.subscribe(handler).await.unwrap();
        drop(sub);

        notifier.publish(&envelope("u1", "a")).await.unwrap();
        // Handler (and its sender) is dropped with the aborted task.
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(got.is_none());
    }
}
