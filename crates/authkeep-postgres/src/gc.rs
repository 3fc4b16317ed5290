//! Background garbage collection.
//!
//! The sweeper is a single tokio task owned by the store that spawned it:
//! it ticks on a fixed interval and runs one sweep per tick. Sweep
//! failures are logged and absorbed; the next tick retries. Cancellation
//! preempts the next tick but never an in-flight sweep, which runs to
//! completion as one atomic statement.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Handle to the sweeper task.
///
/// Dropping the handle cancels the task; [`GcHandle::shutdown`] cancels
/// and joins it, guaranteeing no sweep executes afterwards. Both are
/// idempotent, and a handle for a disabled collector is inert.
#[derive(Debug)]
pub(crate) struct GcHandle {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl GcHandle {
    /// Handle for a store constructed with GC disabled.
    pub(crate) fn disabled() -> Self {
        Self {
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Stop the sweeper and wait for it to exit.
    pub(crate) async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "token sweeper task did not exit cleanly");
        }
    }
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn the sweeper task.
///
/// `sweep` executes once per tick and reports the number of rows it
/// reclaimed. The first tick fires one full interval after spawning.
pub(crate) fn spawn<F, Fut, E>(every: Duration, mut sweep: F) -> GcHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<u64, E>> + Send + 'static,
    E: fmt::Display + 'static,
{
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => {
                    debug!("token sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match sweep().await {
                        Ok(0) => {}
                        Ok(count) => debug!(count, "swept expired token rows"),
                        Err(e) => error!(error = %e, "expired token sweep failed"),
                    }
                }
            }
        }
    });

    GcHandle {
        cancel,
        task: Mutex::new(Some(task)),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const EVERY: Duration = Duration::from_secs(600);

    fn counting_sweeper(counter: Arc<AtomicUsize>) -> impl FnMut() -> SweepFuture + Send + 'static {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(1u64)
            }) as SweepFuture
        }
    }

    type SweepFuture =
        std::pin::Pin<Box<dyn Future<Output = Result<u64, String>> + Send + 'static>>;

    #[tokio::test(start_paused = true)]
    async fn test_no_sweep_before_first_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = spawn(EVERY, counting_sweeper(counter.clone()));

        tokio::time::sleep(EVERY / 2).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_once_per_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = spawn(EVERY, counting_sweeper(counter.clone()));

        tokio::time::sleep(EVERY * 3 + Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_failure_does_not_stop_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let failing = {
            let counter = counter.clone();
            move || {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("connection refused".to_string())
                }) as SweepFuture
            }
        };
        let handle = spawn(EVERY, failing);

        tokio::time::sleep(EVERY * 2 + Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweeping_and_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = spawn(EVERY, counting_sweeper(counter.clone()));

        tokio::time::sleep(EVERY + Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
        handle.shutdown().await;

        tokio::time::sleep(EVERY * 10).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_handle_is_inert() {
        let handle = GcHandle::disabled();
        handle.shutdown().await;
        handle.shutdown().await;
    }
}
