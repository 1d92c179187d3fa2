use arcv_image::Image;

#[inline]
fn set_pixel<T: Copy, const C: usize>(img: &mut Image<T, C>, x: i64, y: i64, color: [T; C]) {
    if x >= 0 && x < img.cols() as i64 && y >= 0 && y < img.rows() as i64 {
        let start = (y as usize * img.cols() + x as usize) * C;
        img.as_slice_mut()[start..start + C].copy_from_slice(&color);
    }
}

/// Draws a line on an image inplace using Bresenham's line algorithm.
///
/// Pixels falling outside the image are skipped.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `p0` - The start point of the line as a tuple of (x, y).
/// * `p1` - The end point of the line as a tuple of (x, y).
/// * `color` - The color of the line as an array of `C` elements.
/// * `thickness` - The thickness of the line. Thickness above one stamps a
///   square brush, which is approximate for diagonal lines.
pub fn draw_line<T: Copy, const C: usize>(
    img: &mut Image<T, C>,
    p0: (i64, i64),
    p1: (i64, i64),
    color: [T; C],
    thickness: usize,
) {
    let (mut x0, mut y0) = p0;
    let (x1, y1) = p1;

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut err = dx - dy;

    let half = if thickness > 1 {
        thickness as i64 / 2
    } else {
        0
    };

    loop {
        for i in -half..=half {
            for j in -half..=half {
                set_pixel(img, x0 + i, y0 + j, color);
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Fills a convex polygon on an image inplace.
///
/// Each image row crossing the polygon is filled between the leftmost and
/// rightmost intersections with its edges, boundary included. The vertices
/// may be given in either winding order. Parts of the polygon outside the
/// image are clipped.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `points` - The polygon vertices as (x, y) pixel coordinates.
/// * `color` - The fill color.
pub fn fill_convex_poly<T: Copy, const C: usize>(
    img: &mut Image<T, C>,
    points: &[(i64, i64)],
    color: [T; C],
) {
    if points.is_empty() || img.cols() == 0 || img.rows() == 0 {
        return;
    }

    let y_min = points.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let y_max = points
        .iter()
        .map(|p| p.1)
        .max()
        .unwrap_or(-1)
        .min(img.rows() as i64 - 1);

    let n = points.len();
    for y in y_min..=y_max {
        let mut span: Option<(f64, f64)> = None;
        let mut extend = |x: f64| {
            span = Some(match span {
                Some((lo, hi)) => (lo.min(x), hi.max(x)),
                None => (x, x),
            });
        };

        for i in 0..n {
            let (xa, ya) = points[i];
            let (xb, yb) = points[(i + 1) % n];
            if y < ya.min(yb) || y > ya.max(yb) {
                continue;
            }
            if ya == yb {
                extend(xa as f64);
                extend(xb as f64);
            } else {
                let t = (y - ya) as f64 / (yb - ya) as f64;
                extend(xa as f64 + t * (xb - xa) as f64);
            }
        }

        if let Some((lo, hi)) = span {
            let x_start = (lo.round() as i64).max(0);
            let x_end = (hi.round() as i64).min(img.cols() as i64 - 1);
            for x in x_start..=x_end {
                set_pixel(img, x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcv_image::{ImageError, ImageSize};

    #[test]
    fn test_draw_line() -> Result<(), ImageError> {
        let mut img = Image::new(
            ImageSize {
                width: 5,
                height: 5,
            },
            vec![0u8; 25],
        )?;
        draw_line(&mut img, (0, 0), (4, 4), [255], 1);

        #[rustfmt::skip]
        assert_eq!(
            img.as_slice(),
            vec![
                255, 0, 0, 0, 0,
                0, 255, 0, 0, 0,
                0, 0, 255, 0, 0,
                0, 0, 0, 255, 0,
                0, 0, 0, 0, 255,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_draw_line_clipped_and_thick() -> Result<(), ImageError> {
        let mut img = Image::<u8, 3>::from_size_val([4, 4].into(), 0)?;
        draw_line(&mut img, (-3, 1), (10, 1), [1, 2, 3], 3);
        for x in 0..4 {
            assert_eq!(img.pixel(x, 0), Some(&[1u8, 2, 3][..]));
            assert_eq!(img.pixel(x, 2), Some(&[1u8, 2, 3][..]));
            assert_eq!(img.pixel(x, 3), Some(&[0u8, 0, 0][..]));
        }
        Ok(())
    }

    #[test]
    fn test_fill_convex_poly_rect() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([6, 5].into(), 0)?;
        fill_convex_poly(&mut img, &[(1, 1), (4, 1), (4, 3), (1, 3)], [255]);

        #[rustfmt::skip]
        assert_eq!(
            img.as_slice(),
            vec![
                0, 0, 0, 0, 0, 0,
                0, 255, 255, 255, 255, 0,
                0, 255, 255, 255, 255, 0,
                0, 255, 255, 255, 255, 0,
                0, 0, 0, 0, 0, 0,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_fill_convex_poly_triangle() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([5, 5].into(), 0)?;
        // counter-clockwise winding
        fill_convex_poly(&mut img, &[(0, 0), (0, 4), (4, 4)], [1]);

        for y in 0..5 {
            for x in 0..5 {
                let expected = u8::from(x <= y);
                assert_eq!(img.get_pixel(x, y, 0)?, expected, "({x}, {y})");
            }
        }
        Ok(())
    }

    #[test]
    fn test_fill_convex_poly_clipped() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([3, 3].into(), 0)?;
        fill_convex_poly(&mut img, &[(-5, -5), (10, -5), (10, 10), (-5, 10)], [7]);
        assert!(img.as_slice().iter().all(|&v| v == 7));

        let mut img = Image::<u8, 1>::from_size_val([3, 3].into(), 0)?;
        fill_convex_poly(&mut img, &[(5, 5), (8, 5), (8, 8)], [7]);
        assert!(img.as_slice().iter().all(|&v| v == 0));
        Ok(())
    }
}
