use arcv_image::{Image, ImageDtype};

/// Free parameter of the cubic convolution kernel.
const A: f32 = -0.75;

/// Weights of the four taps at offsets `-1, 0, 1, 2` for a fractional
/// position `x` in `[0, 1)`.
///
/// The weights always sum to one.
pub fn cubic_weights(x: f32) -> [f32; 4] {
    let x1 = x + 1.0;
    let w0 = ((A * x1 - 5.0 * A) * x1 + 8.0 * A) * x1 - 4.0 * A;
    let w1 = ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0;
    let xr = 1.0 - x;
    let w2 = ((A + 2.0) * xr - (A + 3.0)) * xr * xr + 1.0;
    let w3 = 1.0 - w0 - w1 - w2;
    [w0, w1, w2, w3]
}

/// Kernel for bicubic interpolation.
///
/// Neighbours outside the image replicate the border pixel.
pub(crate) fn bicubic_interpolation<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
) -> [f32; C] {
    let (rows, cols) = (image.rows() as isize, image.cols() as isize);

    let u0 = u.floor();
    let v0 = v.floor();
    let wx = cubic_weights(u - u0);
    let wy = cubic_weights(v - v0);
    let (iu, iv) = (u0 as isize, v0 as isize);

    let data = image.as_slice();

    let mut pixel = [0.0; C];
    for (j, wyj) in wy.iter().enumerate() {
        let y = (iv + j as isize - 1).clamp(0, rows - 1) as usize;
        for (i, wxi) in wx.iter().enumerate() {
            let x = (iu + i as isize - 1).clamp(0, cols - 1) as usize;
            let base = (y * cols as usize + x) * C;
            let w = wyj * wxi;
            for (k, p) in pixel.iter_mut().enumerate() {
                let val: f32 = data[base + k].into();
                *p += w * val;
            }
        }
    }

    pixel
}
