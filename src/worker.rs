use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::trace;

use crate::error::TaskFault;
use crate::pool::{PoolConfig, Shared};

pub fn spawn_worker(id: usize, shared: Arc<Shared>, config: &PoolConfig) -> io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(format!("{}{}", config.thread_name_prefix, id));
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    builder.spawn(move || run(id, &shared))
}

// idle -> executing -> idle until the queue reports shutdown with nothing left
fn run(id: usize, shared: &Shared) {
    trace!(worker = id, "worker started");

    while let Some(job) = shared.queue.pop() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            shared.record_fault(TaskFault {
                worker: id,
                message: panic_message(payload.as_ref()),
            });
        }
        // counted even when the job panicked, otherwise the waiter never wakes
        shared.complete_one();
    }

    trace!(worker = id, "worker exiting");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_panic_messages() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = panic::catch_unwind(|| panic!("cell {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "cell 7");

        let payload = panic::catch_unwind(|| panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
