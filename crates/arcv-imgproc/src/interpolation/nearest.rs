use arcv_image::{Image, ImageDtype};

/// Take the pixel whose center is closest to `(u, v)`, clamped to the image.
pub(crate) fn nearest_neighbor_interpolation<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
) -> [f32; C] {
    // negative coordinates saturate to zero in the cast
    let x = (u.round() as usize).min(image.cols() - 1);
    let y = (v.round() as usize).min(image.rows() - 1);

    let mut pixel = [0.0; C];
    if let Some(values) = image.pixel(x, y) {
        for (p, &val) in pixel.iter_mut().zip(values) {
            *p = val.into();
        }
    }
    pixel
}
