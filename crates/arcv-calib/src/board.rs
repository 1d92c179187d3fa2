use serde::{Deserialize, Serialize};

/// Number of inner corners of a chessboard along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    /// Inner corners per row.
    pub cols: usize,
    /// Inner corners per column.
    pub rows: usize,
}

impl BoardSize {
    /// Create a board size from its inner corner counts.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    /// Total number of inner corners.
    pub fn num_corners(&self) -> usize {
        self.cols * self.rows
    }

    /// World coordinates of the inner corners, in detector order.
    ///
    /// The origin is the first corner, X grows along a row and rows step
    /// towards negative Y, so corner `(row i, col j)` sits at
    /// `(j, -i, 0) * square_size`.
    ///
    /// # Example
    ///
    /// ```
    /// use arcv_calib::BoardSize;
    ///
    /// let points = BoardSize::new(3, 2).world_points(1.0);
    /// assert_eq!(points[1], [1.0, 0.0, 0.0]);
    /// assert_eq!(points[3], [0.0, -1.0, 0.0]);
    /// ```
    pub fn world_points(&self, square_size: f64) -> Vec<[f64; 3]> {
        (0..self.rows)
            .flat_map(|i| {
                (0..self.cols).map(move |j| [j as f64 * square_size, -(i as f64) * square_size, 0.0])
            })
            .collect()
    }
}
