//! Argmax reductions over the filter axis of a `rows x columns x filters`
//! tensor.
//!
//! Every variant resolves ties to the lowest filter index.

use std::ops::Range;

use tracing::debug;

use crate::error::{KernelError, PoolError};
use crate::pool::ThreadPool;

/// Index of the largest element, the first one on ties. `None` if empty.
pub fn argmax<T: PartialOrd>(window: &[T]) -> Option<usize> {
    let (first, rest) = window.split_first()?;

    let mut best = 0;
    let mut best_value = first;
    for (i, value) in rest.iter().enumerate() {
        if value > best_value {
            best = i + 1;
            best_value = value;
        }
    }
    Some(best)
}

fn check_shape(tensor_len: usize, cells: usize, num_filters: usize) -> Result<(), KernelError> {
    if num_filters == 0 {
        return Err(KernelError::ZeroFilters);
    }
    let expected = cells * num_filters;
    if tensor_len != expected {
        return Err(KernelError::ShapeMismatch {
            expected,
            actual: tensor_len,
        });
    }
    Ok(())
}

// shapes are checked by the callers
fn reduce_cells<T: PartialOrd>(tensor: &[T], result: &mut [usize], num_filters: usize) {
    for (window, slot) in tensor.chunks_exact(num_filters).zip(result.iter_mut()) {
        *slot = argmax(window).unwrap_or(0);
    }
}

// `tensor.len()` must be `result.len() * num_filters`
pub fn argmax_tensor<T: PartialOrd>(
    tensor: &[T],
    result: &mut [usize],
    num_filters: usize,
) -> Result<(), KernelError> {
    check_shape(tensor.len(), result.len(), num_filters)?;
    reduce_cells(tensor, result, num_filters);
    Ok(())
}

/// Same result as [`argmax_tensor`], written with iterator adaptors.
pub fn argmax_tensor_windowed<T: PartialOrd>(
    tensor: &[T],
    result: &mut [usize],
    num_filters: usize,
) -> Result<(), KernelError> {
    check_shape(tensor.len(), result.len(), num_filters)?;

    for (window, slot) in tensor.chunks_exact(num_filters).zip(result.iter_mut()) {
        // strict `>` so ties and NaN behave exactly like argmax
        *slot = window
            .iter()
            .enumerate()
            .reduce(|best, cur| if cur.1 > best.1 { cur } else { best })
            .map_or(0, |(i, _)| i);
    }
    Ok(())
}

// first `cells % chunks` ranges get one extra cell, trailing ranges may be empty
pub fn partition(cells: usize, chunks: usize) -> Vec<Range<usize>> {
    if chunks == 0 {
        return Vec::new();
    }

    let base = cells / chunks;
    let extra = cells % chunks;

    let mut start = 0;
    (0..chunks)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// [`argmax_tensor`] split across the pool, one contiguous chunk of cells
/// per worker. The pool must not have an unfinished batch.
pub fn argmax_tensor_parallel<T>(
    tensor: &[T],
    result: &mut [usize],
    num_filters: usize,
    pool: &mut ThreadPool,
) -> Result<(), KernelError>
where
    T: PartialOrd + Sync,
{
    check_shape(tensor.len(), result.len(), num_filters)?;
    if pool.outstanding() != 0 {
        return Err(PoolError::BatchInProgress {
            outstanding: pool.outstanding(),
        }
        .into());
    }

    let num_threads = pool.num_threads();
    let chunks = partition(result.len(), num_threads);
    debug!(cells = result.len(), num_threads, "argmax batch");

    // split every slice first so nothing can panic once tasks hold borrows
    let mut work = Vec::with_capacity(chunks.len());
    let mut tensor_rest = tensor;
    let mut result_rest = result;
    for range in &chunks {
        let (tensor_chunk, tensor_tail) = tensor_rest.split_at(range.len() * num_filters);
        let (result_chunk, result_tail) = std::mem::take(&mut result_rest).split_at_mut(range.len());
        work.push((tensor_chunk, result_chunk));
        tensor_rest = tensor_tail;
        result_rest = result_tail;
    }

    for (tensor_chunk, result_chunk) in work {
        // SAFETY: the pool has no other outstanding tasks, so wait_until below
        // returns only after every chunk task has finished with its slices
        unsafe {
            pool.submit_scoped(move || reduce_cells(tensor_chunk, result_chunk, num_filters));
        }
    }

    pool.wait_until(num_threads)?;
    Ok(())
}
