//! Sub-pixel refinement of corner locations.
//!
//! A corner sits where the image gradient at every nearby pixel is orthogonal
//! to the vector from the corner to that pixel. Each iteration solves the
//! Gaussian-weighted normal equations of that condition over a square window
//! and moves the corner to the solution, until the update falls below the
//! tolerance or the iteration budget is spent.

use arcv_image::Image;
use serde::{Deserialize, Serialize};

/// Termination criteria of an iterative refinement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermCriteria {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Stop once a corner moves by less than this many pixels.
    pub epsilon: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            epsilon: 1e-4,
        }
    }
}

/// Default half side of the search window, an 11x11 region.
pub const DEFAULT_HALF_WINDOW: usize = 5;

// bilinear sample with the border replicated
fn sample(image: &Image<f32, 1>, x: f64, y: f64) -> f64 {
    let (cols, rows) = (image.cols() as isize, image.rows() as isize);
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let data = image.as_slice();
    let at = |xi: isize, yi: isize| {
        let xc = xi.clamp(0, cols - 1) as usize;
        let yc = yi.clamp(0, rows - 1) as usize;
        data[yc * cols as usize + xc] as f64
    };
    let (xi, yi) = (x0 as isize, y0 as isize);
    let top = at(xi, yi) * (1.0 - fx) + at(xi + 1, yi) * fx;
    let bottom = at(xi, yi + 1) * (1.0 - fx) + at(xi + 1, yi + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Refine corner locations to sub-pixel accuracy, in place.
///
/// Corners that drift further than `half_window` pixels from their starting
/// position along either axis are reset to it. An empty image leaves the
/// corners unchanged.
///
/// # Arguments
///
/// * `image` - The grayscale image the corners were detected in.
/// * `corners` - The corner positions as `[x, y]`, refined in place.
/// * `half_window` - Half side of the square search window.
/// * `criteria` - When to stop iterating.
pub fn corner_subpix(
    image: &Image<f32, 1>,
    corners: &mut [[f64; 2]],
    half_window: usize,
    criteria: &TermCriteria,
) {
    if image.cols() == 0 || image.rows() == 0 {
        return;
    }

    let win = half_window as isize;

    // separable gaussian weights over the window
    let weights: Vec<f64> = (-win..=win)
        .map(|i| {
            if win == 0 {
                1.0
            } else {
                let t = i as f64 / win as f64;
                (-t * t).exp()
            }
        })
        .collect();

    let (max_x, max_y) = (image.cols() as f64, image.rows() as f64);
    let eps_sq = criteria.epsilon * criteria.epsilon;

    for corner in corners.iter_mut() {
        let start = *corner;
        let mut c = start;

        for _ in 0..criteria.max_iterations.max(1) {
            let (mut a, mut b, mut cc, mut bb1, mut bb2) = (0.0, 0.0, 0.0, 0.0, 0.0);

            for (j, wy) in weights.iter().enumerate() {
                let py = j as f64 - win as f64;
                for (i, wx) in weights.iter().enumerate() {
                    let px = i as f64 - win as f64;
                    let (sx, sy) = (c[0] + px, c[1] + py);
                    let gx = sample(image, sx + 1.0, sy) - sample(image, sx - 1.0, sy);
                    let gy = sample(image, sx, sy + 1.0) - sample(image, sx, sy - 1.0);

                    let m = wx * wy;
                    let gxx = gx * gx * m;
                    let gxy = gx * gy * m;
                    let gyy = gy * gy * m;

                    a += gxx;
                    b += gxy;
                    cc += gyy;
                    bb1 += gxx * px + gxy * py;
                    bb2 += gxy * px + gyy * py;
                }
            }

            let det = a * cc - b * b;
            if det.abs() <= f64::EPSILON * f64::EPSILON {
                break;
            }
            let scale = 1.0 / det;
            let next = [
                c[0] + cc * scale * bb1 - b * scale * bb2,
                c[1] - b * scale * bb1 + a * scale * bb2,
            ];
            let dx = next[0] - c[0];
            let dy = next[1] - c[1];
            c = next;

            if c[0] < 0.0 || c[0] >= max_x || c[1] < 0.0 || c[1] >= max_y {
                break;
            }
            if dx * dx + dy * dy <= eps_sq {
                break;
            }
        }

        let drifted = (c[0] - start[0]).abs() > half_window as f64
            || (c[1] - start[1]).abs() > half_window as f64;
        if drifted || !c[0].is_finite() || !c[1].is_finite() {
            c = start;
        }
        *corner = c;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use arcv_image::ImageError;

    // checkerboard corner at (cx, cy), anti-aliased by 4x4 supersampling
    fn checker_corner(size: usize, cx: f64, cy: f64) -> Result<Image<f32, 1>, ImageError> {
        let mut data = vec![0.0f32; size * size];
        for y in 0..size {
            for x in 0..size {
                let mut acc = 0.0;
                for sy in 0..4 {
                    for sx in 0..4 {
                        let px = x as f64 + (sx as f64 + 0.5) / 4.0 - 0.5;
                        let py = y as f64 + (sy as f64 + 0.5) / 4.0 - 0.5;
                        if (px < cx) == (py < cy) {
                            acc += 1.0;
                        }
                    }
                }
                data[y * size + x] = acc / 16.0;
            }
        }
        Image::new([size, size].into(), data)
    }

    #[test]
    fn test_corner_subpix_checker() -> Result<(), ImageError> {
        // the corner sits between four pixels
        let (cx, cy) = (15.5, 14.5);
        let image = checker_corner(32, cx, cy)?;

        let mut corners = [[17.0, 13.0], [14.0, 15.0]];
        corner_subpix(&image, &mut corners, DEFAULT_HALF_WINDOW, &TermCriteria::default());

        for c in corners {
            assert_relative_eq!(c[0], cx, epsilon = 1e-3);
            assert_relative_eq!(c[1], cy, epsilon = 1e-3);
        }
        Ok(())
    }

    #[test]
    fn test_corner_subpix_flat_image_keeps_corner() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::from_size_val([16, 16].into(), 0.3)?;
        let mut corners = [[7.5, 8.25]];
        corner_subpix(&image, &mut corners, 3, &TermCriteria::default());
        assert_eq!(corners, [[7.5, 8.25]]);
        Ok(())
    }

    #[test]
    fn test_term_criteria_serde() -> Result<(), serde_json::Error> {
        let criteria: TermCriteria = serde_json::from_str(r#"{"max_iterations": 10}"#)?;
        assert_eq!(criteria.max_iterations, 10);
        assert_eq!(criteria.epsilon, 1e-4);
        Ok(())
    }
}
