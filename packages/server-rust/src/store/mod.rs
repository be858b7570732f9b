//! Store connections and liveness probing.
//!
//! - [`ConnectionPair`]: read-write master and read-only replica `PgPool`s
//! - [`MemoryStore`]: in-process table with reachability switches, for tests
//!   and store-less runs
//!
//! Both implement [`Probe`], which the repository readiness loop polls.

use async_trait::async_trait;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{ConnectionPair, DatabaseConfig};

/// Liveness check against a backing store.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Contacts every connection the store owns.
    ///
    /// # Errors
    ///
    /// Returns the first connection failure.
    async fn check(&self) -> anyhow::Result<()>;
}
