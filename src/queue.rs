use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

// a unit of work, boxed so the queue can hold any closure
pub type Job = Box<dyn FnOnce() + Send + 'static>;

// fifo of pending jobs shared by all workers
// the lock is held across push and pop only, never while a job runs
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    available: Condvar,
    shutdown: AtomicBool,
}

impl JobQueue {
    pub fn new() -> Self {
        JobQueue {
            jobs: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    // jobs never run under the lock, so a poisoned mutex still guards a valid deque
    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, job: Job) {
        self.lock().push_back(job);
        self.available.notify_one();
    }

    // blocks until a job is available, returns None once shut down and drained
    pub fn pop(&self) -> Option<Job> {
        let mut jobs = self.lock();
        loop {
            if let Some(job) = jobs.pop_front() {
                return Some(job);
            }
            if self.is_shutdown() {
                return None;
            }
            jobs = self
                .available
                .wait(jobs)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn shutdown(&self) {
        // set under the lock so a worker between its checks and wait() cannot miss it
        let _jobs = self.lock();
        self.shutdown.store(true, Ordering::Release);
        self.available.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn pops_in_submission_order() {
        let queue = JobQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            queue.push(Box::new(move || order.lock().unwrap().push(i)));
        }
        assert_eq!(queue.len(), 5);

        for _ in 0..5 {
            let job = queue.pop().unwrap();
            job();
        }
        assert_eq!(queue.len(), 0);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn drains_before_reporting_shutdown() {
        let queue = JobQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let ran = ran.clone();
            queue.push(Box::new(move || {
                ran.fetch_add(1, Ordering::Relaxed);
            }));
        }
        queue.shutdown();

        while let Some(job) = queue.pop() {
            job();
        }
        assert_eq!(ran.load(Ordering::Relaxed), 3);
        assert!(queue.is_shutdown());
    }

    #[test]
    fn shutdown_wakes_a_blocked_popper() {
        let queue = Arc::new(JobQueue::new());
        let popper = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.pop().is_none())
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        queue.shutdown();
        assert!(popper.join().unwrap());
    }
}
