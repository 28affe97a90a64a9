//! Fixed-size worker pool for per-log fetches.
//!
//! Work is distributed over a shared queue of `(slot, LogId)` items. Results
//! land in a pre-sized arena addressed by slot index, so output order always
//! matches input order no matter which worker finishes first. Each slot is
//! written exactly once, which keeps the arena lock-free.

use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::FetchError;
use crate::fetcher::Slot;
use crate::model::LogId;
use fightstats_types::WorkerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// Receives coarse progress updates from the orchestrating thread
pub trait ProgressSink {
    fn on_progress(&self, progress: BatchProgress);
}

impl<F: Fn(BatchProgress)> ProgressSink for F {
    fn on_progress(&self, progress: BatchProgress) {
        self(progress)
    }
}

/// Discards progress updates
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: BatchProgress) {}
}

#[derive(Debug, Clone)]
pub struct BatchRunner {
    worker_count: usize,
    idle_timeout: Duration,
    poll_interval: Duration,
}

impl BatchRunner {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            worker_count: config.worker_count.max(1),
            idle_timeout: Duration::from_millis(config.queue_idle_timeout_ms),
            poll_interval: Duration::from_millis(config.progress_interval_ms.max(1)),
        }
    }

    /// Run `fetch` for every id on the pool. `result[i]` belongs to `ids[i]`.
    ///
    /// Blocks until every item is done. A panic inside `fetch` is confined
    /// to that item's slot.
    pub fn run<F>(&self, ids: &[LogId], fetch: F, progress: &dyn ProgressSink) -> Vec<Slot>
    where
        F: Fn(&LogId) -> Slot + Sync,
    {
        let total = ids.len();
        if total == 0 {
            progress.on_progress(BatchProgress { completed: 0, total });
            return Vec::new();
        }

        let arena: Vec<OnceLock<Slot>> = (0..total).map(|_| OnceLock::new()).collect();
        let (work_tx, work_rx) = crossbeam_channel::unbounded::<(usize, &LogId)>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<usize>();

        thread::scope(|scope| {
            let mut spawned = 0;
            for worker in 0..self.worker_count.min(total) {
                let ctx = WorkerContext {
                    queue: work_rx.clone(),
                    done: done_tx.clone(),
                    arena: &arena,
                    fetch: &fetch,
                    idle_timeout: self.idle_timeout,
                };
                let result = thread::Builder::new()
                    .name(format!("log-fetch-{worker}"))
                    .spawn_scoped(scope, move || ctx.run());
                match result {
                    Ok(_) => spawned += 1,
                    Err(e) => tracing::error!(worker, error = %e, "Failed to spawn fetch worker"),
                }
            }
            drop(done_tx);

            for item in ids.iter().enumerate() {
                if work_tx.send(item).is_err() {
                    break;
                }
            }
            drop(work_tx);

            if spawned == 0 {
                // No threads available; drain the queue on this thread instead
                let (inline_done, _) = crossbeam_channel::unbounded();
                WorkerContext {
                    queue: work_rx,
                    done: inline_done,
                    arena: &arena,
                    fetch: &fetch,
                    idle_timeout: Duration::ZERO,
                }
                .run();
                return;
            }
            drop(work_rx);
            self.wait_for_workers(&done_rx, total, progress);
        });

        let completed = arena.iter().filter(|slot| slot.get().is_some()).count();
        progress.on_progress(BatchProgress { completed, total });

        arena
            .into_iter()
            .zip(ids)
            .map(|(slot, id)| {
                slot.into_inner().unwrap_or_else(|| {
                    tracing::error!(log_id = %id, "Log was never processed");
                    Err(FetchError::NotProcessed { log_id: id.clone() })
                })
            })
            .collect()
    }

    /// Count completions, emitting progress at most once per poll interval.
    /// Returns once every item is done or every worker has exited.
    fn wait_for_workers(&self, done_rx: &Receiver<usize>, total: usize, progress: &dyn ProgressSink) {
        let mut completed = 0;
        progress.on_progress(BatchProgress { completed, total });
        while completed < total {
            match done_rx.recv_timeout(self.poll_interval) {
                Ok(_) => {
                    completed += 1;
                    completed += done_rx.try_iter().count();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            progress.on_progress(BatchProgress { completed, total });
        }
    }
}

struct WorkerContext<'a, F> {
    queue: Receiver<(usize, &'a LogId)>,
    done: Sender<usize>,
    arena: &'a [OnceLock<Slot>],
    fetch: &'a F,
    idle_timeout: Duration,
}

impl<F> WorkerContext<'_, F>
where
    F: Fn(&LogId) -> Slot + Sync,
{
    /// Pop items until the queue stays empty for the idle timeout or closes.
    fn run(self) {
        loop {
            let (index, id) = match self.queue.recv_timeout(self.idle_timeout) {
                Ok(item) => item,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return,
            };

            let slot = panic::catch_unwind(AssertUnwindSafe(|| (self.fetch)(id))).unwrap_or_else(|_| {
                tracing::error!(log_id = %id, "Fetch panicked");
                Err(FetchError::WorkerPanic { log_id: id.clone() })
            });

            if self.arena[index].set(slot).is_err() {
                tracing::error!(log_id = %id, index, "Slot written twice");
            }
            // Orchestrator may already be gone on the inline path
            let _ = self.done.send(index);
        }
    }
}
