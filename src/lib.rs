// objdetect-kernels: post-processing kernels for a small object detector
// - a fixed-size work-queue thread pool (submit, then wait for N completions)
// - argmax over the filter axis: sequential, iterator-based and pool-parallel
// - nearest-neighbour upsampling of row-major tensors
// - caller-owned timings and the benchmark drivers built on all of the above
//
// Tensors are flat row-major slices of `rows x columns x filters` elements.
// Reduced buffers hold one filter index per `(row, column)` cell.
//
// A pool runs one batch at a time: `submit` and `wait_until` take `&mut self`,
// and `wait_until` must be given exactly the number of tasks submitted.
mod argmax;
pub mod drivers;
mod error;
mod padded_type;
mod pool;
mod queue;
mod shape;
mod timing;
mod upsample;
mod wait_gate;
mod worker;

pub use argmax::{argmax, argmax_tensor, argmax_tensor_parallel, argmax_tensor_windowed, partition};
pub use error::{DriverError, KernelError, PoolError, TaskFault};
pub use pool::{PoolConfig, ThreadPool};
pub use shape::{TensorShape, render_tensor};
pub use timing::{TimingEntry, Timings};
pub use upsample::{upsample, upscaled_shape};

// convenience function to create a pool with one worker per hardware thread
pub fn new() -> Result<ThreadPool, PoolError> {
    ThreadPool::new(0)
}

// create thread pool with specific worker count
pub fn with_workers(worker_count: usize) -> Result<ThreadPool, PoolError> {
    ThreadPool::new(worker_count)
}
