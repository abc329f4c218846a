//! Property tests for partitioning and the parallel argmax kernel.

use proptest::prelude::*;

use objdetect_kernels::{ThreadPool, argmax, argmax_tensor, argmax_tensor_parallel, partition};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: chunks are contiguous, cover every cell once and differ in
    /// size by at most one, larger chunks first
    #[test]
    fn prop_partition_covers_cells_exactly_once(
        cells in 0usize..10_000,
        chunks in 1usize..64,
    ) {
        let ranges = partition(cells, chunks);
        prop_assert_eq!(ranges.len(), chunks);

        let mut next = 0;
        for range in &ranges {
            prop_assert_eq!(range.start, next);
            next = range.end;
        }
        prop_assert_eq!(next, cells);

        let sizes: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
        prop_assert_eq!(sizes.iter().sum::<usize>(), cells);
        prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
        prop_assert!(sizes[0] - sizes[chunks - 1] <= 1);
    }

    /// Property: the parallel kernel matches the sequential one for any
    /// shape and any pool size up to the number of cells
    #[test]
    fn prop_parallel_matches_sequential(
        (rows, columns, filters, threads, tensor) in (1usize..12, 1usize..12, 1usize..9)
            .prop_flat_map(|(r, c, f)| (
                Just(r),
                Just(c),
                Just(f),
                1usize..=r * c,
                proptest::collection::vec(-4i8..4, r * c * f),
            )),
    ) {
        let cells = rows * columns;
        let mut expected = vec![0usize; cells];
        argmax_tensor(&tensor, &mut expected, filters).unwrap();

        let mut pool = ThreadPool::new(threads).unwrap();
        let mut actual = vec![usize::MAX; cells];
        argmax_tensor_parallel(&tensor, &mut actual, filters, &mut pool).unwrap();

        prop_assert_eq!(actual, expected);
    }

    /// Property: argmax returns the first index holding the maximum
    #[test]
    fn prop_argmax_is_first_maximum(window in proptest::collection::vec(-3i32..3, 1..32)) {
        let index = argmax(&window).unwrap();
        let max = *window.iter().max().unwrap();

        prop_assert_eq!(window[index], max);
        prop_assert!(window[..index].iter().all(|&v| v < max));
    }
}
