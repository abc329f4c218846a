use crate::error::KernelError;
use crate::shape::TensorShape;

/// Output shape of [`upsample`], checked for a zero or overflowing scale.
pub fn upscaled_shape(shape: TensorShape, scale: usize) -> Result<TensorShape, KernelError> {
    if scale == 0 {
        return Err(KernelError::ZeroScale);
    }
    shape
        .checked_upscaled(scale)
        .ok_or(KernelError::ScaleOverflow { shape, scale })
}

/// Nearest-neighbour upsampling of rows and columns by `scale`.
///
/// Each source cell (all of its filters) is repeated `scale` times along the
/// output row, then every finished output row is repeated `scale - 1` more
/// times. `dst` must hold exactly `shape.upscaled(scale).len()` elements.
pub fn upsample<T: Copy>(
    src: &[T],
    dst: &mut [T],
    shape: TensorShape,
    scale: usize,
) -> Result<(), KernelError> {
    // a scaled shape that fits in usize means the source shape does too
    let scaled = upscaled_shape(shape, scale)?;
    if src.len() != shape.len() {
        return Err(KernelError::ShapeMismatch {
            expected: shape.len(),
            actual: src.len(),
        });
    }
    if dst.len() != scaled.len() {
        return Err(KernelError::ShapeMismatch {
            expected: scaled.len(),
            actual: dst.len(),
        });
    }
    if shape.is_empty() {
        return Ok(());
    }

    let cell_len = shape.filters;
    let src_row_len = shape.columns * cell_len;
    let dst_row_len = scaled.columns * cell_len;

    for (src_row, dst_rows) in src
        .chunks_exact(src_row_len)
        .zip(dst.chunks_exact_mut(dst_row_len * scale))
    {
        let (first, repeats) = dst_rows.split_at_mut(dst_row_len);

        for (src_cell, dst_cells) in src_row
            .chunks_exact(cell_len)
            .zip(first.chunks_exact_mut(cell_len * scale))
        {
            for dst_cell in dst_cells.chunks_exact_mut(cell_len) {
                dst_cell.copy_from_slice(src_cell);
            }
        }

        for repeat in repeats.chunks_exact_mut(dst_row_len) {
            repeat.copy_from_slice(first);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicates_cells_and_rows() {
        let shape = TensorShape::new(2, 2, 1);
        let src = [1, 2, 3, 4];
        let mut dst = [0; 16];

        upsample(&src, &mut dst, shape, 2).unwrap();

        #[rustfmt::skip]
        let expected = [
            1, 1, 2, 2,
            1, 1, 2, 2,
            3, 3, 4, 4,
            3, 3, 4, 4,
        ];
        assert_eq!(dst, expected);
    }

    #[test]
    fn keeps_filters_together() {
        let shape = TensorShape::new(1, 2, 2);
        let src = [1, 2, 3, 4];
        let mut dst = [0; 16];

        upsample(&src, &mut dst, shape, 2).unwrap();

        assert_eq!(&dst[..8], &[1, 2, 1, 2, 3, 4, 3, 4]);
        assert_eq!(&dst[8..], &dst[..8]);
    }

    #[test]
    fn scale_of_one_copies() {
        let shape = TensorShape::new(2, 3, 1);
        let src = [6, 5, 4, 3, 2, 1];
        let mut dst = [0; 6];
        upsample(&src, &mut dst, shape, 1).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn rejects_bad_buffers() {
        let shape = TensorShape::new(2, 2, 1);
        let mut dst = [0; 16];
        assert!(matches!(
            upsample(&[1, 2, 3, 4], &mut dst, shape, 0),
            Err(KernelError::ZeroScale)
        ));
        assert!(matches!(
            upsample(&[1, 2, 3], &mut dst, shape, 2),
            Err(KernelError::ShapeMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(matches!(
            upsample(&[1, 2, 3, 4], &mut dst[..15], shape, 2),
            Err(KernelError::ShapeMismatch {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn huge_scale_is_an_error_not_a_panic() {
        let shape = TensorShape::new(1, 1, 1);
        let scale = usize::MAX / 2 + 1;
        let mut dst: [u8; 0] = [];

        assert!(matches!(
            upsample(&[1u8], &mut dst, shape, scale),
            Err(KernelError::ScaleOverflow { scale: s, .. }) if s == scale
        ));
        assert!(matches!(
            upscaled_shape(TensorShape::new(28, 28, 21), 1 << (usize::BITS / 2)),
            Err(KernelError::ScaleOverflow { .. })
        ));
        assert_eq!(
            upscaled_shape(shape, 8).unwrap(),
            TensorShape::new(8, 8, 1)
        );
    }

    #[test]
    fn empty_shapes_are_a_no_op() {
        let mut dst: [u8; 0] = [];
        upsample(&[], &mut dst, TensorShape::new(0, 4, 3), 8).unwrap();
    }
}
