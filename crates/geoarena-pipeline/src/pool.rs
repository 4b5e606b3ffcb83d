use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::PipelineError;
use crate::oneshot::{self, Receiver};
use crate::queue::Queue;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Upper bound for [`Pool::default_size`].
pub const MAX_DEFAULT_THREADS: usize = 32;

/// Fixed set of worker threads fed from a shared job queue.
///
/// Each submitted task gets a one-shot receiver for its result. A task
/// that panics resolves its receiver with
/// [`PipelineError::WorkerPanicked`] and leaves the worker running.
/// Dropping the pool lets queued jobs finish, then joins every worker.
pub struct Pool {
    jobs: Arc<Queue<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl Pool {
    /// Start `threads` workers (at least one).
    ///
    /// # Errors
    ///
    /// [`PipelineError::Io`] if a thread cannot be spawned.
    pub fn new(threads: usize) -> Result<Self, PipelineError> {
        let threads = threads.max(1);
        let jobs: Arc<Queue<Job>> = Arc::new(Queue::new(threads * 4));
        let mut workers = Vec::with_capacity(threads);
        for n in 0..threads {
            let jobs = Arc::clone(&jobs);
            let handle = thread::Builder::new()
                .name(format!("geoarena-worker-{n}"))
                .spawn(move || {
                    while let Some(job) = jobs.pop() {
                        job();
                    }
                })?;
            workers.push(handle);
        }
        debug!(threads, "worker pool started");
        Ok(Self { jobs, workers })
    }

    /// Available parallelism, clamped to `1..=32`.
    #[must_use]
    pub fn default_size() -> usize {
        thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .clamp(1, MAX_DEFAULT_THREADS)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue `task` and return a receiver for its result. Blocks while
    /// the job queue is full.
    pub fn submit<F, T>(&self, task: F) -> Receiver<Result<T, PipelineError>>
    where
        F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
                Err(PipelineError::WorkerPanicked {
                    message: panic_message(payload.as_ref()),
                })
            });
            tx.send(result);
        });
        // A rejected job is dropped with its sender, which disconnects `rx`.
        let _ = self.jobs.push(job);
        rx
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.jobs.close();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        debug!("worker pool stopped");
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
