use arcv_image::{Image, ImageDtype};

/// Blend the four pixels around `(u, v)` by their overlap.
///
/// Taps beyond the last row or column reuse the border pixel.
pub(crate) fn bilinear_interpolation<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
) -> [f32; C] {
    let (last_x, last_y) = (image.cols() - 1, image.rows() - 1);
    let (u, v) = (u.max(0.0), v.max(0.0));

    let x0 = (u.floor() as usize).min(last_x);
    let y0 = (v.floor() as usize).min(last_y);
    let x1 = (x0 + 1).min(last_x);
    let y1 = (y0 + 1).min(last_y);
    let (fx, fy) = (u - u.floor(), v - v.floor());

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x1, y0, fx * (1.0 - fy)),
        (x0, y1, (1.0 - fx) * fy),
        (x1, y1, fx * fy),
    ];

    let mut pixel = [0.0; C];
    for (x, y, w) in taps {
        if let Some(values) = image.pixel(x, y) {
            for (p, &val) in pixel.iter_mut().zip(values) {
                let val: f32 = val.into();
                *p += w * val;
            }
        }
    }
    pixel
}
