//! Self-rescheduling background loops with a shared shutdown path
//!
//! Each loop runs `step` repeatedly. A step returns how long to wait before
//! the next one; the wait is a `select!` against the scheduler's
//! `CancellationToken`, so shutdown never has to wait out a pending timer.
//! The step itself is raced against cancellation too.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;

/// Owns the task handle of every spawned loop.
#[derive(Debug, Default)]
pub struct Scheduler {
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a loop named `name`.
    ///
    /// The returned receiver fires once the first step has finished and the
    /// second one is scheduled. It is dropped without firing if the loop
    /// stops before that.
    pub fn spawn_loop<F, Fut>(&self, name: &'static str, mut step: F) -> oneshot::Receiver<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Duration>> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ready = Some(ready_tx);
            loop {
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => break,
                    outcome = step() => outcome,
                };
                let wait = match outcome {
                    Ok(wait) => wait,
                    Err(e) => {
                        debug!(task = name, reason = %e, "loop stopping");
                        break;
                    }
                };

                if let Some(tx) = ready.take() {
                    let _ = tx.send(());
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            debug!(task = name, "loop stopped");
        });

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        ready_rx
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every pending step and timer, then wait for the loops to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *tasks)
        };
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "poll loop task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn loop_reschedules_with_returned_delay() {
        let scheduler = Scheduler::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let ready = scheduler.spawn_loop("test", move || {
            let tx = tx.clone();
            async move {
                tx.send(Instant::now()).unwrap();
                Ok::<_, Error>(Duration::from_millis(300))
            }
        });
        ready.await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let third = rx.recv().await.unwrap();
        for gap in [second - first, third - second] {
            assert!(
                gap >= Duration::from_millis(300) && gap < Duration::from_millis(302),
                "gap {gap:?}"
            );
        }

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timer() {
        let scheduler = Scheduler::new();
        let steps = Arc::new(AtomicUsize::new(0));

        let counter = steps.clone();
        let ready = scheduler.spawn_loop("test", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(Duration::from_secs(3600))
            }
        });
        ready.await.unwrap();

        let started = Instant::now();
        scheduler.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(scheduler.is_cancelled());
        assert_eq!(steps.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn step_error_stops_loop_without_ready() {
        let scheduler = Scheduler::new();
        let ready = scheduler.spawn_loop("test", || async { Err(Error::Shutdown) });
        assert!(ready.await.is_err());
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_runs_next_step_immediately() {
        let scheduler = Scheduler::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let _ready = scheduler.spawn_loop("test", move || {
            let tx = tx.clone();
            async move {
                tx.send(Instant::now()).unwrap();
                Ok::<_, Error>(Duration::ZERO)
            }
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(second - first, Duration::ZERO);
        scheduler.shutdown().await;
    }
}
