//! # Task Queue
//!
//! Runs producer closures on background workers and hands their results
//! back to the single consumer (the host's per-tick update).
//!
//! ## Architecture
//!
//! ```text
//!   consumer ──submit──> [job channel] ──> worker 0..N ──┐
//!      ▲                                                 │ producer()
//!      │                                                 ▼
//!      └──────poll──── [completion channel] <── Box<FnOnce(&mut C)>
//! ```
//!
//! - Producers run to completion on a worker. They own their inputs.
//! - The worker wraps the result and the completion callback into one boxed
//!   closure and pushes it onto the completion channel.
//! - `poll` runs those closures on the caller's thread, in the order the
//!   workers finished, against a context `C` borrowed from the consumer.
//!
//! No priority, no cancellation: every submitted task is delivered exactly
//! once. A producer that panics delivers `Err(TaskPanicked)` instead of its
//! result.

use std::num::NonZeroUsize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{error, info, trace};

use crate::error::{TaskPanicked, TaskQueueError, TaskQueueResult};

/// Unit of work sent to a worker.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// A finished task: result plus callback, waiting for the consumer.
type Completion<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

/// Task queue configuration.
#[derive(Clone, Debug)]
pub struct TaskQueueConfig {
    /// Number of worker threads. 0 = available parallelism.
    pub worker_threads: usize,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            thread_name: "horizon-worker".into(),
        }
    }
}

impl TaskQueueConfig {
    /// Config with a fixed worker count.
    #[must_use]
    pub fn with_workers(worker_threads: usize) -> Self {
        Self {
            worker_threads,
            ..Self::default()
        }
    }

    fn resolved_worker_count(&self) -> usize {
        if self.worker_threads > 0 {
            self.worker_threads
        } else {
            thread::available_parallelism().map_or(1, NonZeroUsize::get)
        }
    }
}

/// Counters for queue traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks handed to `submit`.
    pub submitted: u64,
    /// Producers that finished on a worker.
    pub completed: u64,
    /// Completion callbacks run by `poll`/`wait`.
    pub delivered: u64,
    /// Producers that panicked (their callbacks receive `TaskPanicked`).
    pub panicked: u64,
}

/// State shared between the queue and its workers.
struct Shared {
    /// Submitted but not yet delivered.
    pending: AtomicUsize,
    stats: Mutex<QueueStats>,
}

/// Background task queue with consumer-side completion delivery.
///
/// `C` is the context the completion callbacks receive. The chunk streamer
/// uses an event buffer; a plain `()` works for fire-and-forget callers.
pub struct TaskQueue<C: 'static> {
    /// Job sender. `None` only while dropping.
    job_tx: Option<Sender<Job>>,
    completion_tx: Sender<Completion<C>>,
    completion_rx: Receiver<Completion<C>>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl<C: 'static> TaskQueue<C> {
    /// Starts the worker pool.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(config: TaskQueueConfig) -> TaskQueueResult<Self> {
        let worker_count = config.resolved_worker_count();
        let (job_tx, job_rx) = unbounded::<Job>();
        let (completion_tx, completion_rx) = unbounded();

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let name = format!("{}-{index}", config.thread_name);
            let jobs = job_rx.clone();
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&jobs))
                .map_err(|source| TaskQueueError::SpawnFailed { name, source })?;
            workers.push(handle);
        }

        info!(workers = worker_count, "task queue started");

        Ok(Self {
            job_tx: Some(job_tx),
            completion_tx,
            completion_rx,
            workers,
            shared: Arc::new(Shared {
                pending: AtomicUsize::new(0),
                stats: Mutex::new(QueueStats::default()),
            }),
        })
    }

    /// Queues `producer` for a worker. `on_complete` later receives its
    /// result during `poll` or `wait`, on the consumer's thread.
    ///
    /// The callback always runs, with `Err(TaskPanicked)` if the producer
    /// panicked.
    pub fn submit<T, P, F>(&self, producer: P, on_complete: F)
    where
        T: Send + 'static,
        P: FnOnce() -> T + Send + 'static,
        F: FnOnce(Result<T, TaskPanicked>, &mut C) + Send + 'static,
    {
        let completion_tx = self.completion_tx.clone();
        let shared = Arc::clone(&self.shared);

        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(producer)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                error!(%message, "background task panicked");
                TaskPanicked { message }
            });
            let panicked = result.is_err();
            let completion: Completion<C> = Box::new(move |ctx: &mut C| on_complete(result, ctx));
            // The receiver lives inside the queue; it outlives every worker.
            let _ = completion_tx.send(completion);

            // Counted after the send, so `completed` never runs ahead of what
            // `poll` can see.
            let mut stats = shared.stats.lock();
            if panicked {
                stats.panicked += 1;
            } else {
                stats.completed += 1;
            }
        });

        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        self.shared.stats.lock().submitted += 1;

        let sent = self
            .job_tx
            .as_ref()
            .is_some_and(|jobs| jobs.send(job).is_ok());
        if !sent {
            error!("task queue has no live workers; task dropped");
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);
        }
        trace!(pending = self.pending(), "task submitted");
    }

    /// Runs every completion that was ready when the call started, in the
    /// order workers recorded them. Never blocks.
    ///
    /// Returns the number of callbacks run.
    pub fn poll(&mut self, ctx: &mut C) -> usize {
        let ready = self.completion_rx.len();
        if ready == 0 {
            return 0;
        }

        let mut delivered = 0;
        for completion in self.completion_rx.try_iter().take(ready) {
            completion(ctx);
            delivered += 1;
        }
        self.record_delivered(delivered);
        trace!(delivered, pending = self.pending(), "completions drained");
        delivered
    }

    /// Blocks up to `timeout` for at least one completion, then drains
    /// everything else that is ready.
    ///
    /// For load screens and tests only; the per-tick path uses `poll`.
    pub fn wait(&mut self, ctx: &mut C, timeout: Duration) -> usize {
        if self.pending() == 0 {
            return 0;
        }
        match self.completion_rx.recv_timeout(timeout) {
            Ok(completion) => {
                completion(ctx);
                self.record_delivered(1);
                1 + self.poll(ctx)
            }
            Err(_) => 0,
        }
    }

    /// Tasks submitted whose callbacks have not run yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Snapshot of queue counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        *self.shared.stats.lock()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn record_delivered(&self, delivered: usize) {
        self.shared.pending.fetch_sub(delivered, Ordering::AcqRel);
        self.shared.stats.lock().delivered += delivered as u64;
    }
}

impl<C: 'static> Drop for TaskQueue<C> {
    fn drop(&mut self) {
        // Closing the job channel ends each worker loop once queued jobs finish.
        self.job_tx = None;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

fn worker_loop(jobs: &Receiver<Job>) {
    for job in jobs.iter() {
        job();
    }
}
