use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Error types for camera operations.
#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    /// Invalid camera intrinsics matrix
    #[error("Invalid camera intrinsics: {0}")]
    InvalidIntrinsics(String),

    /// The number of distortion coefficients is not 4, 5 or 8.
    #[error("Invalid number of distortion coefficients: {0} (expected 4, 5 or 8)")]
    InvalidDistortionLength(usize),

    /// A distortion coefficient is NaN or infinite.
    #[error("Distortion coefficient {0} is not finite")]
    NonFiniteDistortion(usize),
}

impl CameraError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Input
    }
}

/// Represents the intrinsic parameters of a pinhole camera.
///
/// The skew term is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in x direction
    pub fx: f64,
    /// Focal length in y direction
    pub fy: f64,
    /// Principal point x coordinate
    pub cx: f64,
    /// Principal point y coordinate
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create camera intrinsics from focal lengths and principal point.
    ///
    /// # Errors
    ///
    /// Fails if a focal length is not strictly positive or a value is not finite.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, CameraError> {
        let intrinsics = Self { fx, fy, cx, cy };
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    /// Create camera intrinsics from a 3x3 intrinsics matrix.
    ///
    /// The matrix must have the form `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Result<Self, CameraError> {
        if k[0][1] != 0.0 || k[1][0] != 0.0 || k[2][0] != 0.0 || k[2][1] != 0.0 || k[2][2] != 1.0
        {
            return Err(CameraError::InvalidIntrinsics(
                "matrix must have the form [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]".to_string(),
            ));
        }

        Self::new(k[0][0], k[1][1], k[0][2], k[1][2])
    }

    /// Convert to a row-major 3x3 intrinsics matrix.
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// The intrinsics matrix as a nalgebra matrix.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Check that the focal lengths are positive and all values finite.
    pub fn validate(&self) -> Result<(), CameraError> {
        let values = [self.fx, self.fy, self.cx, self.cy];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CameraError::InvalidIntrinsics(
                "values must be finite".to_string(),
            ));
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(CameraError::InvalidIntrinsics(format!(
                "focal lengths must be positive, got fx={} fy={}",
                self.fx, self.fy
            )));
        }
        Ok(())
    }
}

/// Lens distortion coefficients in OpenCV order `k1 k2 p1 p2 [k3 [k4 k5 k6]]`.
///
/// The number of coefficients (4, 5 or 8) selects the model order. Absent
/// coefficients behave as zero, so the 8-coefficient rational model reduces to
/// the polynomial one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct DistortionCoefficients {
    coeffs: Vec<f64>,
}

impl DistortionCoefficients {
    /// Create distortion coefficients from a list in OpenCV order.
    ///
    /// # Errors
    ///
    /// Fails if the length is not 4, 5 or 8 or if a value is not finite.
    pub fn new(coeffs: Vec<f64>) -> Result<Self, CameraError> {
        if !matches!(coeffs.len(), 4 | 5 | 8) {
            return Err(CameraError::InvalidDistortionLength(coeffs.len()));
        }
        if let Some(i) = coeffs.iter().position(|c| !c.is_finite()) {
            return Err(CameraError::NonFiniteDistortion(i));
        }
        Ok(Self { coeffs })
    }

    /// Four zero coefficients, i.e. no distortion.
    pub fn none() -> Self {
        Self {
            coeffs: vec![0.0; 4],
        }
    }

    /// `n` zero coefficients.
    pub fn zeros(n: usize) -> Result<Self, CameraError> {
        Self::new(vec![0.0; n])
    }

    /// The coefficients in OpenCV order.
    pub fn as_slice(&self) -> &[f64] {
        &self.coeffs
    }

    /// Number of coefficients (4, 5 or 8).
    pub fn num_coefficients(&self) -> usize {
        self.coeffs.len()
    }

    fn get(&self, i: usize) -> f64 {
        self.coeffs.get(i).copied().unwrap_or(0.0)
    }

    /// First radial coefficient.
    pub fn k1(&self) -> f64 {
        self.get(0)
    }

    /// Second radial coefficient.
    pub fn k2(&self) -> f64 {
        self.get(1)
    }

    /// First tangential coefficient.
    pub fn p1(&self) -> f64 {
        self.get(2)
    }

    /// Second tangential coefficient.
    pub fn p2(&self) -> f64 {
        self.get(3)
    }

    /// Third radial coefficient, zero when absent.
    pub fn k3(&self) -> f64 {
        self.get(4)
    }

    /// Rational denominator coefficients `[k4, k5, k6]`, zero when absent.
    pub fn rational(&self) -> [f64; 3] {
        [self.get(5), self.get(6), self.get(7)]
    }

    /// Whether any coefficient is non-zero.
    pub fn has_distortion(&self) -> bool {
        self.coeffs.iter().any(|&c| c != 0.0)
    }

    /// Apply the distortion model to a normalized image point.
    ///
    /// With `r² = x² + y²`:
    ///
    /// `x' = x·kr + 2·p1·x·y + p2·(r² + 2x²)`
    ///
    /// `y' = y·kr + p1·(r² + 2y²) + 2·p2·x·y`
    ///
    /// where `kr = (1 + k1r² + k2r⁴ + k3r⁶) / (1 + k4r² + k5r⁴ + k6r⁶)`.
    pub fn distort_normalized(&self, x: f64, y: f64) -> (f64, f64) {
        let (k1, k2, p1, p2, k3) = (self.k1(), self.k2(), self.p1(), self.p2(), self.k3());
        let [k4, k5, k6] = self.rational();

        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let kr = (1.0 + k1 * r2 + k2 * r4 + k3 * r6) / (1.0 + k4 * r2 + k5 * r4 + k6 * r6);

        let xy_2 = 2.0 * x * y;
        let xd = x * kr + p1 * xy_2 + p2 * (r2 + 2.0 * x * x);
        let yd = y * kr + p1 * (r2 + 2.0 * y * y) + p2 * xy_2;

        (xd, yd)
    }

    /// Invert the distortion model by fixed-point iteration.
    pub fn undistort_normalized(&self, xd: f64, yd: f64) -> (f64, f64) {
        const MAX_ITERATIONS: usize = 20;
        const EPSILON: f64 = 1e-14;

        if !self.has_distortion() {
            return (xd, yd);
        }

        let (mut x, mut y) = (xd, yd);
        for _ in 0..MAX_ITERATIONS {
            let (x_pred, y_pred) = self.distort_normalized(x, y);
            let dx = xd - x_pred;
            let dy = yd - y_pred;

            x += dx;
            y += dy;

            if dx.abs() < EPSILON && dy.abs() < EPSILON {
                break;
            }
        }

        (x, y)
    }
}

impl Default for DistortionCoefficients {
    fn default() -> Self {
        Self::none()
    }
}

impl TryFrom<Vec<f64>> for DistortionCoefficients {
    type Error = CameraError;

    fn try_from(coeffs: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(coeffs)
    }
}

impl From<DistortionCoefficients> for Vec<f64> {
    fn from(d: DistortionCoefficients) -> Self {
        d.coeffs
    }
}

/// A complete camera model with intrinsics and distortion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// Camera intrinsics
    pub intrinsics: CameraIntrinsics,
    /// Distortion coefficients
    pub distortion: DistortionCoefficients,
}

impl CameraModel {
    /// Create a camera model from intrinsics and distortion.
    pub fn new(
        intrinsics: CameraIntrinsics,
        distortion: DistortionCoefficients,
    ) -> Result<Self, CameraError> {
        intrinsics.validate()?;
        Ok(Self {
            intrinsics,
            distortion,
        })
    }

    /// Create a camera model without distortion.
    pub fn pinhole(intrinsics: CameraIntrinsics) -> Self {
        Self {
            intrinsics,
            distortion: DistortionCoefficients::none(),
        }
    }

    /// Check if the camera has distortion.
    pub fn has_distortion(&self) -> bool {
        self.distortion.has_distortion()
    }

    /// Map a normalized (undistorted) point to pixel coordinates.
    pub fn normalized_to_pixel(&self, p: &[f64; 2]) -> [f64; 2] {
        let (xd, yd) = self.distortion.distort_normalized(p[0], p[1]);
        let k = &self.intrinsics;
        [k.fx * xd + k.cx, k.fy * yd + k.cy]
    }

    /// Map a pixel to its undistorted normalized coordinates.
    pub fn pixel_to_normalized(&self, p: &[f64; 2]) -> [f64; 2] {
        let k = &self.intrinsics;
        let xd = (p[0] - k.cx) / k.fx;
        let yd = (p[1] - k.cy) / k.fy;
        let (x, y) = self.distortion.undistort_normalized(xd, yd);
        [x, y]
    }

    /// Undistort multiple pixels into normalized coordinates.
    pub fn undistort_points(&self, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
        points.iter().map(|p| self.pixel_to_normalized(p)).collect()
    }
}
