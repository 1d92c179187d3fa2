use rayon::prelude::*;

use arcv_image::Image;

/// Apply a function to each pixel in the image in parallel.
pub fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Clone + Send + Sync,
    T2: Clone + Send + Sync,
{
    let cols = src.cols();
    if cols == 0 {
        return;
    }
    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .chunks_exact(C1)
                .zip(dst_chunk.chunks_exact_mut(C2))
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

/// Apply a function to each pixel of `dst` in parallel, together with the
/// matching pixel of `src` and the matching value of a single channel `mask`.
pub fn par_iter_rows_masked<T, const C: usize>(
    src: &Image<T, C>,
    mask: &Image<u8, 1>,
    dst: &mut Image<T, C>,
    f: impl Fn(&[T], u8, &mut [T]) + Send + Sync,
) where
    T: Clone + Send + Sync,
{
    let cols = src.cols();
    if cols == 0 {
        return;
    }
    src.as_slice()
        .par_chunks_exact(C * cols)
        .zip(mask.as_slice().par_chunks_exact(cols))
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C * cols))
        .for_each(|((src_chunk, mask_chunk), dst_chunk)| {
            src_chunk
                .chunks_exact(C)
                .zip(mask_chunk.iter())
                .zip(dst_chunk.chunks_exact_mut(C))
                .for_each(|((src_pixel, &m), dst_pixel)| {
                    f(src_pixel, m, dst_pixel);
                });
        });
}

/// Apply a function to each pixel of the image in parallel, passing the
/// `(x, y)` position of the pixel.
///
/// This is the building block for gather-style kernels (warping, filtering)
/// where each output pixel reads an arbitrary neighbourhood of the input.
pub fn par_iter_rows_indexed<T, const C: usize>(
    dst: &mut Image<T, C>,
    f: impl Fn(usize, usize, &mut [T]) + Send + Sync,
) where
    T: Send + Sync,
{
    let cols = dst.cols();
    if cols == 0 {
        return;
    }
    dst.as_slice_mut()
        .par_chunks_exact_mut(C * cols)
        .enumerate()
        .for_each(|(y, row)| {
            row.chunks_exact_mut(C)
                .enumerate()
                .for_each(|(x, pixel)| f(x, y, pixel));
        });
}
