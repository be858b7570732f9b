//! Background readiness probing for repositories.
//!
//! A [`ReadinessMonitor`] owns a [`BackgroundWorker`] whose runnable checks
//! the store [`Probe`] once per tick and writes the outcome into an atomic
//! flag. Request handling never touches the flag: a burst of failed requests
//! leaves readiness unchanged, only the probe moves it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::service::worker::{BackgroundRunnable, BackgroundWorker};
use crate::store::Probe;

/// Default interval between readiness probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// ReadinessFlag
// ---------------------------------------------------------------------------

/// Single-writer, many-reader readiness cell. Reads never block.
#[derive(Debug, Clone)]
pub struct ReadinessFlag(Arc<AtomicBool>);

impl ReadinessFlag {
    #[must_use]
    pub fn new(ready: bool) -> Self {
        Self(Arc::new(AtomicBool::new(ready)))
    }

    #[must_use]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Stores `ready`, returning the previous value.
    pub fn set(&self, ready: bool) -> bool {
        self.0.swap(ready, Ordering::AcqRel)
    }
}

// ---------------------------------------------------------------------------
// ReadinessProbe
// ---------------------------------------------------------------------------

/// Tasks accepted by the probe worker besides its periodic tick.
#[derive(Debug)]
pub enum ProbeTask {
    /// Probe immediately and reply with the new readiness value.
    CheckNow(oneshot::Sender<bool>),
}

struct ReadinessProbe {
    name: &'static str,
    probe: Arc<dyn Probe>,
    flag: ReadinessFlag,
}

impl ReadinessProbe {
    async fn check(&self) -> bool {
        let ready = match self.probe.check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(dependency = self.name, error = %format!("{err:#}"), "readiness probe failed");
                false
            }
        };
        let previous = self.flag.set(ready);
        if previous != ready {
            debug!(dependency = self.name, ready, "readiness changed");
        }
        ready
    }
}

#[async_trait]
impl BackgroundRunnable for ReadinessProbe {
    type Task = ProbeTask;

    async fn run(&mut self, task: ProbeTask) {
        match task {
            ProbeTask::CheckNow(reply) => {
                let ready = self.check().await;
                let _ = reply.send(ready);
            }
        }
    }

    async fn on_tick(&mut self) {
        self.check().await;
    }
}

// ---------------------------------------------------------------------------
// ReadinessMonitor
// ---------------------------------------------------------------------------

/// Owns the probe loop of one store dependency.
///
/// The flag starts `true`: a freshly constructed repository has just
/// connected successfully.
pub struct ReadinessMonitor {
    flag: ReadinessFlag,
    worker: Mutex<BackgroundWorker<ReadinessProbe>>,
}

impl ReadinessMonitor {
    /// Spawns the probe loop. Must be called from within a tokio runtime.
    pub fn start(name: &'static str, probe: Arc<dyn Probe>, interval: Duration) -> Self {
        let flag = ReadinessFlag::new(true);
        let runnable = ReadinessProbe {
            name,
            probe,
            flag: flag.clone(),
        };
        Self {
            flag,
            worker: Mutex::new(BackgroundWorker::start(runnable, interval)),
        }
    }

    /// Last value written by the probe.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.flag.get()
    }

    /// Probes immediately instead of waiting for the next tick.
    ///
    /// Returns `None` once the monitor has been stopped.
    pub async fn check_now(&self) -> Option<bool> {
        let (tx, rx) = oneshot::channel();
        self.worker
            .lock()
            .await
            .submit(ProbeTask::CheckNow(tx))
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Stops the probe loop. The flag keeps its last value.
    pub async fn stop(&self) {
        self.worker.lock().await.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn starts_ready() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ReadinessMonitor::start("memory", store, DEFAULT_PROBE_INTERVAL);
        assert!(monitor.is_ready());
        monitor.stop().await;
    }

    #[tokio::test]
    async fn check_now_reflects_probe() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ReadinessMonitor::start("memory", store.clone(), DEFAULT_PROBE_INTERVAL);

        store.set_reachable(false);
        assert_eq!(monitor.check_now().await, Some(false));
        assert!(!monitor.is_ready());

        store.set_reachable(true);
        assert_eq!(monitor.check_now().await, Some(true));
        assert!(monitor.is_ready());

        monitor.stop().await;
        assert_eq!(monitor.check_now().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_tick_flips_flag() {
        let store = Arc::new(MemoryStore::new());
        let monitor =
            ReadinessMonitor::start("memory", store.clone(), Duration::from_secs(60));

        store.set_reachable(false);
        assert!(monitor.is_ready(), "flag only moves on a probe");

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!monitor.is_ready());

        store.set_reachable(true);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(monitor.is_ready());

        monitor.stop().await;
    }

    #[test]
    fn flag_set_returns_previous() {
        let flag = ReadinessFlag::new(true);
        assert!(flag.set(false));
        assert!(!flag.set(false));
        assert!(!flag.get());
    }
}
