use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

mod ingest;
pub use ingest::PriceIngestionTask;

mod evaluate;
pub use evaluate::ThresholdEvaluator;

mod detect;
pub use detect::ChangeDetector;

mod retention;
pub use retention::RetentionSweeper;

/// A unit of background work driven by a fixed-interval timer.
#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// One tick's worth of work. Errors are logged by the runner; they never
    /// stop the timer loop.
    async fn run(&self) -> crate::error::Result<()>;
}

struct TaskHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Process-wide registry of independent timer-driven tasks. Each task gets
/// its own timer and a size-1 semaphore: if a previous invocation is still
/// in flight when the timer fires, the new tick is skipped rather than
/// overlapped.
pub struct TaskRegistry {
    handles: Vec<TaskHandle>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn spawn(&mut self, task: Arc<dyn PeriodicTask>, every: Duration) {
        let name = task.name();
        let (shutdown, mut stopped) = watch::channel(false);
        let in_flight = Arc::new(Semaphore::new(1));

        let join = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(task = name, interval_secs = every.as_secs(), "task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let permit = match in_flight.clone().try_acquire_owned() {
                            Ok(permit) => permit,
                            Err(_) => {
                                tracing::warn!(
                                    task = name,
                                    "previous invocation still running, skipping tick"
                                );
                                continue;
                            }
                        };

                        let task = task.clone();
                        tokio::spawn(async move {
                            if let Err(e) = task.run().await {
                                tracing::error!(task = task.name(), error = %e, "task run failed");
                            }
                            drop(permit);
                        });
                    }
                    _ = stopped.changed() => {
                        tracing::info!(task = name, "task stopped");
                        break;
                    }
                }
            }
        });

        self.handles.push(TaskHandle {
            name,
            shutdown,
            join,
        });
    }

    /// Stop all timer loops. Invocations already in flight are left to
    /// finish on the runtime; store writes are per-row atomic so partial
    /// progress is safe.
    pub async fn shutdown(self) {
        for handle in self.handles {
            let _ = handle.shutdown.send(true);
            if let Err(e) = handle.join.await {
                tracing::error!(task = handle.name, error = %e, "task join failed");
            }
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct SlowTask {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl PeriodicTask for SlowTask {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn run(&self) -> crate::error::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            // Outlives several timer ticks.
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overlapping_ticks_are_skipped() {
        let task = Arc::new(SlowTask {
            runs: AtomicUsize::new(0),
        });

        let mut registry = TaskRegistry::new();
        registry.spawn(task.clone(), Duration::from_millis(20));

        // ~10 ticks elapse while each run takes 200ms; without the guard
        // the run count would track the tick count.
        tokio::time::sleep(Duration::from_millis(230)).await;
        registry.shutdown().await;

        let runs = task.runs.load(Ordering::SeqCst);
        assert!(runs >= 1, "task never ran");
        assert!(runs <= 2, "reentrancy guard failed, got {} runs", runs);
    }

    struct FailingTask {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl PeriodicTask for FailingTask {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn run(&self) -> crate::error::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Err(crate::error::AppError::Internal("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_the_timer_loop() {
        let task = Arc::new(FailingTask {
            runs: AtomicUsize::new(0),
        });

        let mut registry = TaskRegistry::new();
        registry.spawn(task.clone(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(55)).await;
        registry.shutdown().await;

        assert!(task.runs.load(Ordering::SeqCst) >= 3);
    }
}
