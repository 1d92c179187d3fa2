//! Virtual objects drawn on a tracked chessboard.
//!
//! Points are given in board units: X runs along a row, rows step towards
//! negative Y and Z leaves the board plane.

use arcv_image::Image;
use arcv_imgproc::draw::draw_line;

/// Coordinate axes: origin, +X, -Y and +Z, each `length` long.
///
/// -Y points down the board's rows.
pub fn axes_points(length: f64) -> [[f64; 3]; 4] {
    [
        [0.0, 0.0, 0.0],
        [length, 0.0, 0.0],
        [0.0, -length, 0.0],
        [0.0, 0.0, length],
    ]
}

/// Index pairs of the projected axes points joined by a line.
pub const AXES_EDGES: [(usize, usize); 3] = [(0, 1), (0, 2), (0, 3)];

/// A 2x2x4 solid standing on the board with a corner at `(x, y)`.
///
/// Points 0 to 3 form the base, 4 to 7 the top at `z = 4`, point 8 is the
/// centre of the top.
pub fn solid_points(x: f64, y: f64) -> [[f64; 3]; 9] {
    [
        [x, y, 0.0],
        [x + 2.0, y, 0.0],
        [x, y - 2.0, 0.0],
        [x + 2.0, y - 2.0, 0.0],
        [x, y, 4.0],
        [x + 2.0, y, 4.0],
        [x, y - 2.0, 4.0],
        [x + 2.0, y - 2.0, 4.0],
        [x + 1.0, y - 1.0, 4.0],
    ]
}

/// Index pairs of the projected solid points joined by a line: the base, the
/// top, then the four uprights.
pub const SOLID_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Draws projected overlays onto a frame.
pub trait OverlayRenderer {
    /// Draw projected [`axes_points`].
    fn draw_axes(&mut self, frame: &mut Image<u8, 3>, points: &[[f64; 2]; 4]);

    /// Draw projected [`solid_points`].
    fn draw_solid(&mut self, frame: &mut Image<u8, 3>, points: &[[f64; 2]; 9]);
}

/// Renders overlays as coloured straight lines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRenderer {
    /// Line thickness in pixels.
    pub thickness: usize,
    /// Colours cycled over the edges.
    pub palette: [[u8; 3]; 4],
}

impl Default for LineRenderer {
    fn default() -> Self {
        Self {
            thickness: 2,
            // red, green, blue, orange
            palette: [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 165, 0]],
        }
    }
}

impl LineRenderer {
    fn draw_edges(&self, frame: &mut Image<u8, 3>, points: &[[f64; 2]], edges: &[(usize, usize)]) {
        for (i, &(a, b)) in edges.iter().enumerate() {
            let (Some(pa), Some(pb)) = (to_pixel(points[a]), to_pixel(points[b])) else {
                continue;
            };
            let color = self.palette[i % self.palette.len()];
            draw_line(frame, pa, pb, color, self.thickness);
        }
    }

    /// Outline a quadrilateral, e.g. the corners of a detected marker.
    pub fn draw_quad(&self, frame: &mut Image<u8, 3>, corners: &[[f64; 2]; 4], color: [u8; 3]) {
        for i in 0..4 {
            if let (Some(pa), Some(pb)) = (to_pixel(corners[i]), to_pixel(corners[(i + 1) % 4])) {
                draw_line(frame, pa, pb, color, self.thickness);
            }
        }
    }
}

// points behind the camera project to non-finite coordinates
fn to_pixel(p: [f64; 2]) -> Option<(i64, i64)> {
    (p[0].is_finite() && p[1].is_finite()).then(|| (p[0].round() as i64, p[1].round() as i64))
}

impl OverlayRenderer for LineRenderer {
    fn draw_axes(&mut self, frame: &mut Image<u8, 3>, points: &[[f64; 2]; 4]) {
        self.draw_edges(frame, points, &AXES_EDGES);
    }

    fn draw_solid(&mut self, frame: &mut Image<u8, 3>, points: &[[f64; 2]; 9]) {
        self.draw_edges(frame, points, &SOLID_EDGES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcv_image::ImageError;

    #[test]
    fn test_axes_geometry() {
        let axes = axes_points(1.0);
        assert_eq!(axes[0], [0.0, 0.0, 0.0]);
        assert_eq!(axes[2], [0.0, -1.0, 0.0]);
        for &(a, b) in &AXES_EDGES {
            let d: f64 = (0..3).map(|k| (axes[a][k] - axes[b][k]).powi(2)).sum();
            assert_eq!(d, 1.0);
        }
    }

    #[test]
    fn test_solid_geometry() {
        let solid = solid_points(3.0, -1.0);
        assert_eq!(solid[0], [3.0, -1.0, 0.0]);
        assert_eq!(solid[3], [5.0, -3.0, 0.0]);
        assert_eq!(solid[8], [4.0, -2.0, 4.0]);
        assert!(solid[..4].iter().all(|p| p[2] == 0.0));
        assert!(solid[4..].iter().all(|p| p[2] == 4.0));

        // every upright joins a base corner to the corner above it
        for &(a, b) in &SOLID_EDGES[8..] {
            assert_eq!(solid[a][..2], solid[b][..2]);
            assert_eq!(b, a + 4);
        }
        assert!(SOLID_EDGES.iter().all(|&(a, b)| a < 8 && b < 8));
    }

    #[test]
    fn test_line_renderer_draws_axes() -> Result<(), ImageError> {
        let mut frame = Image::<u8, 3>::from_size_val([20, 20].into(), 0)?;
        let mut renderer = LineRenderer {
            thickness: 1,
            ..Default::default()
        };
        let points = [[5.0, 5.0], [15.0, 5.0], [5.0, 15.0], [f64::NAN, 0.0]];
        renderer.draw_axes(&mut frame, &points);

        assert_eq!(frame.pixel(10, 5), Some(&[255u8, 0, 0][..]));
        assert_eq!(frame.pixel(5, 10), Some(&[0u8, 255, 0][..]));
        // the edge to a non-finite point is skipped
        assert!(frame.as_slice().chunks(3).all(|p| p[2] == 0));
        Ok(())
    }
}
