//! In-memory store with switchable reachability.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use roster_core::User;

use super::Probe;

/// In-process user table.
///
/// Rows keep insertion order, which is the order list queries page through.
/// Two switches simulate outages independently:
/// - `set_reachable(false)` makes the liveness probe fail
/// - `set_failing(true)` makes every data operation fail
pub struct MemoryStore {
    rows: RwLock<Vec<User>>,
    reachable: AtomicBool,
    failing: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            reachable: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Fails when data operations are switched off.
    ///
    /// # Errors
    ///
    /// Returns an error while `set_failing(true)` is in effect.
    pub fn ensure_available(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::Acquire) {
            anyhow::bail!("memory store rejected the operation");
        }
        Ok(())
    }

    /// Runs `f` with shared access to the rows.
    pub fn read<T>(&self, f: impl FnOnce(&[User]) -> T) -> T {
        f(&self.rows.read())
    }

    /// Runs `f` with exclusive access to the rows.
    pub fn write<T>(&self, f: impl FnOnce(&mut Vec<User>) -> T) -> T {
        f(&mut self.rows.write())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for MemoryStore {
    async fn check(&self) -> anyhow::Result<()> {
        if self.reachable.load(Ordering::Acquire) {
            Ok(())
        } else {
            anyhow::bail!("memory store unreachable")
        }
    }
}
