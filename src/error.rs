use std::fmt;
use std::io;

use thiserror::Error;

use crate::shape::TensorShape;

/// A panic captured from a task while it ran on a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFault {
    pub worker: usize,
    // panic payload if it was a string
    pub message: String,
}

impl fmt::Display for TaskFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked on worker {}: {}", self.worker, self.message)
    }
}

/// Errors raised by [`ThreadPool`](crate::ThreadPool).
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker {worker}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },

    /// At least one task of the batch panicked. Only the first fault is kept.
    #[error("{0}")]
    TaskPanicked(TaskFault),

    #[error("waited for {expected} completions but {submitted} tasks were submitted")]
    BatchMismatch { expected: usize, submitted: usize },

    #[error("pool still has {outstanding} tasks from a batch that was not waited on")]
    BatchInProgress { outstanding: usize },
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("number of filters must be at least 1")]
    ZeroFilters,

    #[error("scale factor must be at least 1")]
    ZeroScale,

    #[error("buffer holds {actual} elements, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("tensor {shape} upsampled by {scale} has more elements than fit in memory")]
    ScaleOverflow { shape: TensorShape, scale: usize },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("outputs differ at index {index}: expected {expected}, got {actual}")]
    Mismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}
