//! Bounded-concurrency task batches.
//!
//! A [`TaskExecutor`] queues tasks, then runs the whole queue as one batch on
//! a shared `rayon` thread pool. `start` blocks until every task has
//! reported, the first task fails, or the timeout expires. Running tasks
//! cannot be interrupted: on timeout or failure the batch's
//! [`CancellationToken`] is cancelled so that tasks not yet started are
//! skipped and long tasks may bail out early.

use crate::errors::{BoxError, ExecutorError, TaskError, TaskFailure};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Cooperative cancellation flag shared by the tasks of one batch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A unit of work. Receives the batch token.
pub type Task = Box<dyn FnOnce(&CancellationToken) -> Result<(), BoxError> + Send + 'static>;

enum Outcome {
    Done,
    Skipped,
    Failed(TaskFailure),
}

/// Build a named worker pool with `threads` workers.
pub fn build_pool(threads: usize) -> Result<Arc<ThreadPool>, ExecutorError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("coevo-worker-{i}"))
        .build()?;
    Ok(Arc::new(pool))
}

/// Runs queued tasks as a batch on a worker pool.
pub struct TaskExecutor {
    pool: Arc<ThreadPool>,
    queue: Mutex<Vec<Task>>,
    timeout: Option<Duration>,
    current: Mutex<Option<CancellationToken>>,
}

impl TaskExecutor {
    /// Executor with its own pool of `threads` workers.
    pub fn new(threads: usize) -> Result<Self, ExecutorError> {
        Ok(Self::with_pool(build_pool(threads)?))
    }

    /// Executor sharing an existing pool.
    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self {
            pool,
            queue: Mutex::new(Vec::new()),
            timeout: None,
            current: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// `None` waits forever.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a task for the next batch.
    pub fn add<F>(&self, task: F)
    where
        F: FnOnce(&CancellationToken) -> Result<(), BoxError> + Send + 'static,
    {
        self.queue.lock().push(Box::new(task));
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Drop every queued task.
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    /// Cancel the current batch. Does not wait for running tasks.
    pub fn stop(&self) {
        if let Some(token) = self.current.lock().as_ref() {
            token.cancel();
        }
    }

    /// Run every queued task.
    ///
    /// Returns `Ok(true)` when all tasks completed, `Ok(false)` when the
    /// timeout expired or the batch was stopped, and `Err` for the first task
    /// that returned an error or panicked.
    #[instrument(level = "debug", skip(self), fields(tasks = tracing::field::Empty))]
    pub fn start(&self) -> Result<bool, TaskError> {
        let tasks = std::mem::take(&mut *self.queue.lock());
        let token = CancellationToken::new();
        *self.current.lock() = Some(token.clone());

        let total = tasks.len();
        tracing::Span::current().record("tasks", total);
        if total == 0 {
            return Ok(true);
        }

        let (tx, rx) = mpsc::channel::<(usize, Outcome)>();
        for (index, task) in tasks.into_iter().enumerate() {
            let tx = tx.clone();
            let token = token.clone();
            self.pool.spawn(move || {
                let outcome = if token.is_cancelled() {
                    Outcome::Skipped
                } else {
                    match panic::catch_unwind(AssertUnwindSafe(|| task(&token))) {
                        Ok(Ok(())) => Outcome::Done,
                        Ok(Err(err)) => Outcome::Failed(TaskFailure::Error(err)),
                        Err(payload) => Outcome::Failed(TaskFailure::Panicked(panic_message(&*payload))),
                    }
                };
                // The receiver is gone once the batch has been abandoned.
                let _ = tx.send((index, outcome));
            });
        }
        drop(tx);

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut remaining = total;

        while remaining > 0 {
            let received = match deadline {
                Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok((_, Outcome::Done | Outcome::Skipped)) => remaining -= 1,
                Ok((index, Outcome::Failed(failure))) => {
                    token.cancel();
                    return Err(TaskError { index, failure });
                }
                Err(RecvTimeoutError::Timeout) => {
                    token.cancel();
                    warn!(remaining, timeout = ?self.timeout, "Task batch timed out");
                    return Ok(false);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    token.cancel();
                    return Ok(false);
                }
            }
        }

        let completed = !token.is_cancelled();
        debug!(completed, "Task batch finished");
        Ok(completed)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("threads", &self.threads())
            .field("pending", &self.pending_count())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FitnessError;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn executor(threads: usize) -> TaskExecutor {
        TaskExecutor::new(threads).unwrap()
    }

    #[test]
    fn test_empty_batch_completes() {
        assert!(executor(1).start().unwrap());
    }

    #[test]
    fn test_runs_every_task() {
        let exec = executor(4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..32 {
            let counter = Arc::clone(&counter);
            exec.add(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(exec.pending_count(), 32);

        assert!(exec.start().unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 32);
        assert_eq!(exec.pending_count(), 0);
    }

    #[test]
    fn test_first_failure_is_reported_with_index() {
        let exec = executor(1);
        exec.add(|_| Ok(()));
        exec.add(|_| Err(Box::new(FitnessError::Evaluation("nope".into())) as BoxError));

        let err = exec.start().unwrap_err();
        assert_eq!(err.index, 1);
        assert!(matches!(err.failure, TaskFailure::Error(_)));
        assert_eq!(err.failure.to_string(), "Fitness evaluation failed: nope");
    }

    #[test]
    fn test_panicking_task_is_caught() {
        let exec = executor(2);
        exec.add(|_| panic!("worker exploded"));

        let err = exec.start().unwrap_err();
        match err.failure {
            TaskFailure::Panicked(msg) => assert_eq!(msg, "worker exploded"),
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[test]
    fn test_timeout_returns_false_and_cancels_token() {
        let exec = executor(1).with_timeout(Some(Duration::from_millis(20)));
        let observed = Arc::new(AtomicBool::new(false));

        let seen = Arc::clone(&observed);
        exec.add(move |token| {
            let started = Instant::now();
            while !token.is_cancelled() && started.elapsed() < Duration::from_secs(5) {
                thread::sleep(Duration::from_millis(1));
            }
            seen.store(token.is_cancelled(), Ordering::SeqCst);
            Ok(())
        });
        let skipped = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&skipped);
        exec.add(move |_| {
            flag.store(false, Ordering::SeqCst);
            Ok(())
        });

        assert!(!exec.start().unwrap());

        let started = Instant::now();
        while !observed.load(Ordering::SeqCst) && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(observed.load(Ordering::SeqCst));
        // Single worker: the second task was still queued when the token was cancelled.
        thread::sleep(Duration::from_millis(20));
        assert!(skipped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_clear_drops_pending_tasks() {
        let exec = executor(1);
        exec.add(|_| panic!("must not run"));
        exec.clear();

        assert_eq!(exec.pending_count(), 0);
        assert!(exec.start().unwrap());
    }

    #[test]
    fn test_stop_without_batch_is_harmless() {
        let exec = executor(1);
        exec.stop();
        exec.add(|_| Ok(()));
        assert!(exec.start().unwrap());
    }
}
