use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tracing::{debug, error, warn};

use crate::error::{PoolError, TaskFault};
use crate::padded_type::PaddedAtomicUsize;
use crate::queue::{Job, JobQueue};
use crate::wait_gate::WaitGate;
use crate::worker;

/// Construction options for a [`ThreadPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of workers. `0` uses the hardware-reported concurrency.
    pub num_threads: usize,
    /// Worker threads are named `{prefix}{id}`.
    pub thread_name_prefix: String,
    /// Stack size for worker threads, or the platform default.
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            thread_name_prefix: "od".to_owned(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads,
            ..Self::default()
        }
    }

    // 0 means "ask the platform", which may itself fail; never go below one worker
    pub fn resolved_threads(&self) -> usize {
        if self.num_threads > 0 {
            return self.num_threads;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

// state shared between the pool handle and its workers
pub(crate) struct Shared {
    pub(crate) queue: JobQueue,
    completed: PaddedAtomicUsize,
    gate: WaitGate,
    fault: Mutex<Option<TaskFault>>,
}

impl Shared {
    fn new() -> Self {
        Shared {
            queue: JobQueue::new(),
            completed: PaddedAtomicUsize::new(AtomicUsize::new(0)),
            gate: WaitGate::new(),
            fault: Mutex::new(None),
        }
    }

    // the increment orders the task's writes before the waiter's load of the count
    pub(crate) fn complete_one(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.gate.notify_all_if_waiters();
    }

    pub(crate) fn record_fault(&self, fault: TaskFault) {
        error!(worker = fault.worker, message = %fault.message, "task panicked");
        let mut slot = self.fault.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(fault);
        }
    }

    fn take_fault(&self) -> Option<TaskFault> {
        self.fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// A fixed set of worker threads pulling tasks from one shared FIFO queue.
///
/// Work is submitted in batches: [`submit`](Self::submit) any number of
/// tasks, then call [`wait_until`](Self::wait_until) with that number.
/// Both take `&mut self`, so a pool runs one batch at a time.
///
/// Dropping the pool (or calling [`shutdown`](Self::shutdown)) lets every
/// queued task run before the workers are joined.
pub struct ThreadPool {
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
    num_threads: usize,
    submitted: usize,
}

impl ThreadPool {
    /// Creates a pool with `num_threads` workers, or one per hardware
    /// thread when `num_threads` is 0.
    pub fn new(num_threads: usize) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::with_threads(num_threads))
    }

    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        let num_threads = config.resolved_threads();

        let mut pool = ThreadPool {
            workers: Vec::with_capacity(num_threads),
            shared: Arc::new(Shared::new()),
            num_threads,
            submitted: 0,
        };

        for id in 0..num_threads {
            // on failure `pool` drops here and joins the workers spawned so far
            let handle = worker::spawn_worker(id, pool.shared.clone(), &config)
                .map_err(|source| PoolError::Spawn { worker: id, source })?;
            pool.workers.push(handle);
        }

        debug!(
            requested = config.num_threads,
            num_threads, "thread pool started"
        );
        Ok(pool)
    }

    /// Queues a task. Never blocks beyond the queue lock and never rejects.
    pub fn submit<F>(&mut self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(task));
    }

    /// Queues a task that borrows from the caller's stack.
    ///
    /// # Safety
    ///
    /// Everything `task` borrows must stay alive until a later
    /// [`wait_until`](Self::wait_until) covering this task has returned.
    pub(crate) unsafe fn submit_scoped<'a, F>(&mut self, task: F)
    where
        F: FnOnce() + Send + 'a,
    {
        let job: Box<dyn FnOnce() + Send + 'a> = Box::new(task);
        // SAFETY: only the lifetime changes, the caller keeps the borrows alive
        let job: Job = unsafe { std::mem::transmute::<Box<dyn FnOnce() + Send + 'a>, Job>(job) };
        self.push(job);
    }

    fn push(&mut self, job: Job) {
        self.submitted += 1;
        self.shared.queue.push(job);
    }

    /// Blocks until `expected` tasks have completed, then resets the
    /// completion count for the next batch.
    ///
    /// `expected` must equal the number of tasks submitted since the last
    /// wait; anything else is rejected with [`PoolError::BatchMismatch`]
    /// before waiting. If a task of the batch panicked, the first captured
    /// panic is returned once the whole batch has finished.
    pub fn wait_until(&mut self, expected: usize) -> Result<(), PoolError> {
        if expected != self.submitted {
            return Err(PoolError::BatchMismatch {
                expected,
                submitted: self.submitted,
            });
        }

        let shared = &*self.shared;
        shared.gate.wait_until(|| {
            shared.completed.load(Ordering::SeqCst) >= expected || shared.queue.is_shutdown()
        });
        shared.completed.store(0, Ordering::SeqCst);
        self.submitted = 0;

        match shared.take_fault() {
            Some(fault) => Err(PoolError::TaskPanicked(fault)),
            None => Ok(()),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Tasks submitted since the last completed [`wait_until`](Self::wait_until).
    pub fn outstanding(&self) -> usize {
        self.submitted
    }

    /// Tasks still sitting in the queue, not yet picked up by a worker.
    pub fn total_pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Drains the queue, joins every worker and reports a task panic that
    /// no [`wait_until`](Self::wait_until) has returned yet.
    pub fn shutdown(mut self) -> Result<(), PoolError> {
        self.join_workers();
        match self.shared.take_fault() {
            Some(fault) => Err(PoolError::TaskPanicked(fault)),
            None => Ok(()),
        }
    }

    fn join_workers(&mut self) {
        self.shared.queue.shutdown();

        let workers = std::mem::take(&mut self.workers);
        for (id, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                warn!(worker = id, "worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.join_workers();
    }
}
