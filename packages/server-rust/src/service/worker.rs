//! Single-task background loop used by the readiness probe.
//!
//! A [`BackgroundWorker`] owns one spawned task that serves on-demand jobs
//! from a bounded queue and calls back on a fixed interval. It is never tied
//! to a request, so a slow probe cannot hold up a caller.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Queue depth for on-demand jobs. Probe requests are rare and cheap.
const QUEUE_DEPTH: usize = 16;

/// Work driven by a [`BackgroundWorker`].
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    type Task: Send + 'static;

    /// Handles one job submitted through [`BackgroundWorker::submit`].
    async fn run(&mut self, task: Self::Task);

    /// Periodic callback.
    async fn on_tick(&mut self) {}

    /// Last call before the loop exits.
    async fn shutdown(&mut self) {}
}

/// Handle to a running background loop.
///
/// Dropping the handle stops the loop without waiting for it; [`stop`]
/// waits for `shutdown` to finish.
///
/// [`stop`]: BackgroundWorker::stop
pub struct BackgroundWorker<R: BackgroundRunnable> {
    jobs: Option<mpsc::Sender<R::Task>>,
    stop: Option<DropGuard>,
    task: Option<JoinHandle<()>>,
}

impl<R: BackgroundRunnable> BackgroundWorker<R> {
    /// Spawns the loop. The first tick comes one full `tick_interval` after
    /// start; a late tick is delayed, never bursted.
    ///
    /// # Panics
    ///
    /// Panics if `tick_interval` is zero.
    pub fn start(runnable: R, tick_interval: Duration) -> Self {
        let (jobs, queue) = mpsc::channel(QUEUE_DEPTH);
        let stop = CancellationToken::new();

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + tick_interval,
            tick_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = tokio::spawn(drive(runnable, queue, ticker, stop.clone()));

        Self {
            jobs: Some(jobs),
            stop: Some(stop.drop_guard()),
            task: Some(task),
        }
    }

    /// Queues a job, waiting for room if the queue is full.
    ///
    /// # Errors
    ///
    /// Fails once the worker has been stopped.
    pub async fn submit(&self, task: R::Task) -> anyhow::Result<()> {
        let Some(jobs) = &self.jobs else {
            anyhow::bail!("worker not running");
        };
        jobs.send(task)
            .await
            .map_err(|_| anyhow::anyhow!("worker loop has exited"))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Signals the loop and waits for its `shutdown` callback.
    pub async fn stop(&mut self) {
        self.jobs = None;
        // Dropping the guard cancels the token.
        self.stop = None;
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "background worker ended abnormally");
            }
        }
    }
}

async fn drive<R: BackgroundRunnable>(
    mut runnable: R,
    mut queue: mpsc::Receiver<R::Task>,
    mut ticker: Interval,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            () = stop.cancelled() => break,
            job = queue.recv() => match job {
                Some(job) => runnable.run(job).await,
                None => break,
            },
            _ = ticker.tick() => runnable.on_tick().await,
        }
    }
    runnable.shutdown().await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
