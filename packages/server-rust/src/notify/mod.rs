//! Change notification: best-effort publishing of user snapshots.
//!
//! Publishing is at-most-once. A publish only fails on a send-time error;
//! nothing waits for delivery or consumption. Each [`Subscription`] runs one
//! delivery task that invokes the registered callback per envelope.

use std::sync::Arc;

use async_trait::async_trait;
use roster_core::UserEnvelope;
use tokio::task::JoinHandle;
use tracing::warn;

pub mod channel;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use channel::ChannelNotifier;
#[cfg(feature = "postgres")]
pub use postgres::PgNotifier;

/// Callback invoked once per received envelope, on the subscription task.
pub type EnvelopeHandler = Arc<dyn Fn(UserEnvelope) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifier is not connected")]
    Disconnected,
    #[error("encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("notifier transport: {0:#}")]
    Transport(anyhow::Error),
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle to a running delivery task. Dropping it stops delivery.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Whether the delivery task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel every envelope is published to.
    fn channel(&self) -> &str;

    /// Current connectivity of the underlying transport.
    fn is_ready(&self) -> bool;

    /// Serializes and sends `envelope`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the envelope could not be handed to the
    /// transport.
    async fn publish(&self, envelope: &UserEnvelope) -> Result<(), NotifyError>;

    /// Starts delivering envelopes published on [`channel`](Self::channel)
    /// to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the transport refuses the subscription.
    async fn subscribe(&self, handler: EnvelopeHandler) -> Result<Subscription, NotifyError>;

    /// Stops every subscription and refuses further publishes.
    async fn close(&self);
}

/// Decodes a raw payload and hands it to `handler`. Undecodable payloads
/// are logged and skipped.
pub(crate) fn deliver(channel: &str, payload: &str, handler: &EnvelopeHandler) {
    match UserEnvelope::decode(payload) {
        Ok(envelope) => handler(envelope),
        Err(err) => warn!(channel, error = %err, "dropping undecodable envelope"),
    }
}
