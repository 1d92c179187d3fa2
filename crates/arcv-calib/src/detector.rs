use arcv_image::Image;

use crate::board::BoardSize;

/// Output of a chessboard detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChessboardDetection {
    /// Whether every inner corner was found.
    pub found: bool,
    /// The corners in pixels, row by row. May be partial when `found` is false.
    pub points: Vec<[f64; 2]>,
}

/// Contract of an external chessboard corner detector.
///
/// Implementations return the inner corners row-major, starting at the corner
/// that maps to the world origin of [`BoardSize::world_points`].
pub trait ChessboardDetector {
    /// Detect the inner corners of a `board` in a grayscale image.
    fn detect(&self, image: &Image<f32, 1>, board: BoardSize) -> ChessboardDetection;
}
