use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use crate::padded_type::PaddedType;

// lets the submitting thread sleep until the workers have finished a batch
//
// waiters publish themselves in `waiters` before their last predicate check,
// notifiers change state before reading `waiters`. both sides are SeqCst, so
// either the waiter sees the new state or the notifier sees the waiter.
pub struct WaitGate {
    waiters: PaddedType<AtomicUsize>,
    mutex: Mutex<()>,
    cv: Condvar,
}

impl WaitGate {
    pub fn new() -> Self {
        Self {
            waiters: PaddedType::new(AtomicUsize::new(0)),
            mutex: Mutex::new(()),
            cv: Condvar::new(),
        }
    }

    // block until predicate becomes true
    pub fn wait_until<P: Fn() -> bool>(&self, predicate: P) {
        if predicate() {
            return;
        }
        let mut guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);

        self.waiters.fetch_add(1, Ordering::SeqCst);
        while !predicate() {
            guard = self.cv.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
        self.waiters.fetch_sub(1, Ordering::SeqCst);
    }

    // fast path notify: only if some thread registered as waiting
    pub fn notify_all_if_waiters(&self) {
        if self.waiters.load(Ordering::SeqCst) == 0 {
            return;
        }
        let _g = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        self.cv.notify_all();
    }
}
