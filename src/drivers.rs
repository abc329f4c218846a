//! Benchmark and simulation drivers. Tensors come from a seeded generator,
//! so two runs with the same seed see the same data.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::argmax::{argmax_tensor, argmax_tensor_parallel, argmax_tensor_windowed};
use crate::error::DriverError;
use crate::pool::ThreadPool;
use crate::shape::TensorShape;
use crate::timing::Timings;
use crate::upsample::{upsample, upscaled_shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgmaxVariant {
    Sequential,
    Windowed,
    Parallel,
}

impl ArgmaxVariant {
    pub const ALL: [ArgmaxVariant; 3] = [Self::Sequential, Self::Windowed, Self::Parallel];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sequential => "argmax",
            Self::Windowed => "argmax-win",
            Self::Parallel => "argmax-mt",
        }
    }

    pub fn run(
        &self,
        tensor: &[i8],
        result: &mut [usize],
        num_filters: usize,
        pool: &mut ThreadPool,
    ) -> Result<(), DriverError> {
        match self {
            Self::Sequential => argmax_tensor(tensor, result, num_filters)?,
            Self::Windowed => argmax_tensor_windowed(tensor, result, num_filters)?,
            Self::Parallel => argmax_tensor_parallel(tensor, result, num_filters, pool)?,
        }
        Ok(())
    }
}

// uniform over the whole i8 range
pub fn fill_random(buf: &mut [i8], rng: &mut impl Rng) {
    for value in buf.iter_mut() {
        *value = rng.r#gen();
    }
}

pub fn random_tensor(len: usize, seed: u64) -> Vec<i8> {
    let mut tensor = vec![0; len];
    fill_random(&mut tensor, &mut StdRng::seed_from_u64(seed));
    tensor
}

pub fn compare(expected: &[usize], actual: &[usize]) -> Result<(), DriverError> {
    if let Some((index, (&e, &a))) = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (e, a))| e != a)
    {
        return Err(DriverError::Mismatch {
            index,
            expected: e,
            actual: a,
        });
    }
    if expected.len() != actual.len() {
        let index = expected.len().min(actual.len());
        return Err(DriverError::Mismatch {
            index,
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    Ok(())
}

/// Times `cycles` runs of one argmax variant over fresh random data.
/// Returns the reduced buffer of the last cycle.
pub fn argmax_benchmark(
    variant: ArgmaxVariant,
    shape: TensorShape,
    cycles: u32,
    seed: u64,
    pool: &mut ThreadPool,
    timings: &mut Timings,
) -> Result<Vec<usize>, DriverError> {
    let name = format!("{}-{shape}", variant.label());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tensor = vec![0i8; shape.len()];
    let mut mat = vec![0usize; shape.cells()];

    for _ in 0..cycles {
        fill_random(&mut tensor, &mut rng);
        timings.time(&name, || variant.run(&tensor, &mut mat, shape.filters, pool))?;
    }

    debug!(block = %name, cycles, "argmax benchmark done");
    Ok(mat)
}

pub fn upsample_benchmark(
    shape: TensorShape,
    scale: usize,
    cycles: u32,
    seed: u64,
    timings: &mut Timings,
) -> Result<Vec<i8>, DriverError> {
    let name = format!("upsample-{shape}-{scale}");
    let mut rng = StdRng::seed_from_u64(seed);
    let scaled_len = upscaled_shape(shape, scale)?.len();
    let mut tensor = vec![0i8; shape.len()];
    let mut scaled = vec![0i8; scaled_len];

    for _ in 0..cycles {
        fill_random(&mut tensor, &mut rng);
        timings.time(&name, || upsample(&tensor, &mut scaled, shape, scale))?;
    }

    debug!(block = %name, cycles, "upsample benchmark done");
    Ok(scaled)
}

// upsample the full tensor, then reduce the large one
pub fn simulate_upsample_then_argmax(
    shape: TensorShape,
    scale: usize,
    cycles: u32,
    seed: u64,
    pool: &mut ThreadPool,
    timings: &mut Timings,
) -> Result<Vec<usize>, DriverError> {
    let scaled_shape = upscaled_shape(shape, scale)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tensor = vec![0i8; shape.len()];
    let mut scaled = vec![0i8; scaled_shape.len()];
    let mut scaled_mat = vec![0usize; scaled_shape.cells()];

    for _ in 0..cycles {
        fill_random(&mut tensor, &mut rng);
        timings.time("upsample->argmax", || -> Result<(), DriverError> {
            upsample(&tensor, &mut scaled, shape, scale)?;
            argmax_tensor_parallel(&scaled, &mut scaled_mat, shape.filters, pool)?;
            Ok(())
        })?;
    }
    Ok(scaled_mat)
}

// reduce first, then upsample the index matrix
pub fn simulate_argmax_then_upsample(
    shape: TensorShape,
    scale: usize,
    cycles: u32,
    seed: u64,
    pool: &mut ThreadPool,
    timings: &mut Timings,
) -> Result<Vec<usize>, DriverError> {
    let scaled_cells = upscaled_shape(shape, scale)?.cells();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tensor = vec![0i8; shape.len()];
    let mut mat = vec![0usize; shape.cells()];
    let mut scaled_mat = vec![0usize; scaled_cells];

    for _ in 0..cycles {
        fill_random(&mut tensor, &mut rng);
        timings.time("argmax->upsample", || -> Result<(), DriverError> {
            argmax_tensor_parallel(&tensor, &mut mat, shape.filters, pool)?;
            upsample(&mat, &mut scaled_mat, shape.reduced(), scale)?;
            Ok(())
        })?;
    }
    Ok(scaled_mat)
}

/// Runs both pipeline orders with the same seed and checks they agree.
pub fn simulate(
    shape: TensorShape,
    scale: usize,
    cycles: u32,
    seed: u64,
    pool: &mut ThreadPool,
    timings: &mut Timings,
) -> Result<(), DriverError> {
    let first = simulate_upsample_then_argmax(shape, scale, cycles, seed, pool, timings)?;
    let second = simulate_argmax_then_upsample(shape, scale, cycles, seed, pool, timings)?;
    compare(&first, &second)?;
    info!(%shape, scale, cycles, "pipeline orders agree");
    Ok(())
}

// windowed and parallel against the sequential result
pub fn cross_check(shape: TensorShape, seed: u64, pool: &mut ThreadPool) -> Result<(), DriverError> {
    let tensor = random_tensor(shape.len(), seed);
    let mut expected = vec![0usize; shape.cells()];
    argmax_tensor(&tensor, &mut expected, shape.filters)?;

    for variant in [ArgmaxVariant::Windowed, ArgmaxVariant::Parallel] {
        let mut actual = vec![usize::MAX; shape.cells()];
        variant.run(&tensor, &mut actual, shape.filters, pool)?;
        compare(&expected, &actual)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyCase {
    pub num_threads: usize,
    pub shape: TensorShape,
}

/// Cross-checks `rounds` random shapes, each on a fresh pool with a random
/// worker count in `1..=max_threads`.
pub fn verify_random(
    rounds: usize,
    max_threads: usize,
    max_dim: usize,
    seed: u64,
) -> Result<Vec<VerifyCase>, DriverError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cases = Vec::with_capacity(rounds);

    for round in 0..rounds {
        let case = VerifyCase {
            num_threads: rng.gen_range(1..=max_threads.max(1)),
            shape: TensorShape::new(
                rng.gen_range(1..=max_dim.max(1)),
                rng.gen_range(1..=max_dim.max(1)),
                rng.gen_range(1..=max_dim.max(1)),
            ),
        };

        let mut pool = ThreadPool::new(case.num_threads)?;
        cross_check(case.shape, rng.r#gen(), &mut pool)?;
        pool.shutdown()?;

        debug!(round, threads = case.num_threads, shape = %case.shape, "verified");
        cases.push(case);
    }
    Ok(cases)
}

/// The fixed benchmark suite: 224x224x21 and 28x28x21 argmax in every
/// variant, then 28x28x21 and 28x28x1 upsampling by 8.
pub fn run_suite(
    cycles: u32,
    seed: u64,
    pool: &mut ThreadPool,
    timings: &mut Timings,
) -> Result<(), DriverError> {
    for shape in [TensorShape::new(224, 224, 21), TensorShape::new(28, 28, 21)] {
        for variant in ArgmaxVariant::ALL {
            argmax_benchmark(variant, shape, cycles, seed, pool, timings)?;
        }
    }
    for shape in [TensorShape::new(28, 28, 21), TensorShape::new(28, 28, 1)] {
        upsample_benchmark(shape, 8, cycles, seed, timings)?;
    }
    info!(cycles, seed, "benchmark suite finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;

    #[test]
    fn compare_reports_the_first_difference() {
        assert!(compare(&[1, 2, 3], &[1, 2, 3]).is_ok());
        assert!(matches!(
            compare(&[1, 2, 3], &[1, 5, 6]),
            Err(DriverError::Mismatch {
                index: 1,
                expected: 2,
                actual: 5
            })
        ));
        assert!(matches!(
            compare(&[1, 2], &[1, 2, 3]),
            Err(DriverError::Mismatch { index: 2, .. })
        ));
    }

    #[test]
    fn oversized_scale_fails_before_allocating() {
        let mut pool = ThreadPool::new(1).unwrap();
        let mut timings = Timings::new();
        let shape = TensorShape::new(28, 28, 21);
        let scale = 1 << (usize::BITS / 2);

        for result in [
            simulate_upsample_then_argmax(shape, scale, 1, 0, &mut pool, &mut timings),
            simulate_argmax_then_upsample(shape, scale, 1, 0, &mut pool, &mut timings),
        ] {
            assert!(matches!(
                result,
                Err(DriverError::Kernel(KernelError::ScaleOverflow { .. }))
            ));
        }
        assert!(matches!(
            upsample_benchmark(shape, scale, 1, 0, &mut timings),
            Err(DriverError::Kernel(KernelError::ScaleOverflow { .. }))
        ));
        assert!(timings.is_empty());
    }

    #[test]
    fn random_tensors_are_reproducible() {
        assert_eq!(random_tensor(64, 7), random_tensor(64, 7));
        assert_ne!(random_tensor(64, 7), random_tensor(64, 8));
    }

    #[test]
    fn benchmarks_record_one_cycle_per_run() {
        let mut pool = ThreadPool::new(2).unwrap();
        let mut timings = Timings::new();
        let shape = TensorShape::new(5, 4, 3);

        for variant in ArgmaxVariant::ALL {
            argmax_benchmark(variant, shape, 3, 11, &mut pool, &mut timings).unwrap();
        }
        upsample_benchmark(shape, 2, 2, 11, &mut timings).unwrap();

        assert_eq!(timings.get("argmax-4x5x3").unwrap().cycles, 3);
        assert_eq!(timings.get("argmax-win-4x5x3").unwrap().cycles, 3);
        assert_eq!(timings.get("argmax-mt-4x5x3").unwrap().cycles, 3);
        assert_eq!(timings.get("upsample-4x5x3-2").unwrap().cycles, 2);
    }

    #[test]
    fn variants_agree_on_the_last_cycle() {
        let mut pool = ThreadPool::new(3).unwrap();
        let mut timings = Timings::new();
        let shape = TensorShape::new(9, 7, 5);

        let results: Vec<Vec<usize>> = ArgmaxVariant::ALL
            .iter()
            .map(|&v| argmax_benchmark(v, shape, 2, 99, &mut pool, &mut timings).unwrap())
            .collect();

        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }
}
