use nalgebra::{DMatrix, Matrix3, Vector3};
use thiserror::Error;

use crate::error::ErrorKind;

/// Ratio between the second smallest and the largest singular value of the
/// DLT system below which the correspondences are treated as degenerate.
const RANK_TOLERANCE: f64 = 1e-10;

/// Minimum absolute determinant of the unit-norm homography in normalized coordinates.
const DET_TOLERANCE: f64 = 1e-10;

/// Error types for homography estimation.
#[derive(Debug, Error, PartialEq)]
pub enum HomographyError {
    /// Fewer than four correspondences.
    #[error("Homography requires at least {required} correspondences, got {actual}")]
    InsufficientPoints {
        /// Minimum number of correspondences
        required: usize,
        /// Actual number of correspondences
        actual: usize,
    },

    /// Source and destination arrays differ in length.
    #[error("Mismatched array lengths: source ({src}) != destination ({dst})")]
    MismatchedLengths {
        /// Number of source points
        src: usize,
        /// Number of destination points
        dst: usize,
    },

    /// The points are collinear, duplicated or otherwise singular.
    #[error("Degenerate point configuration: {0}")]
    Degenerate(&'static str),

    /// Singular value decomposition failed
    #[error("SVD computation failed")]
    SvdFailed,
}

impl HomographyError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HomographyError::InsufficientPoints { .. } => ErrorKind::InsufficientData,
            HomographyError::MismatchedLengths { .. } => ErrorKind::Input,
            HomographyError::Degenerate(_) | HomographyError::SvdFailed => {
                ErrorKind::DegenerateGeometry
            }
        }
    }
}

/// Similarity transform moving the centroid to the origin and the mean
/// distance to sqrt(2) (Hartley normalization).
fn normalization_transform(points: &[[f64; 2]]) -> Result<Matrix3<f64>, HomographyError> {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |acc, p| (acc.0 + p[0], acc.1 + p[1]));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = points
        .iter()
        .map(|p| (p[0] - cx).hypot(p[1] - cy))
        .sum::<f64>()
        / n;

    if !mean_dist.is_finite() || mean_dist < f64::EPSILON {
        return Err(HomographyError::Degenerate("all points coincide"));
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

/// Apply a homography to a 2D point.
pub fn apply_homography(h: &Matrix3<f64>, p: &[f64; 2]) -> [f64; 2] {
    let q = h * Vector3::new(p[0], p[1], 1.0);
    [q.x / q.z, q.y / q.z]
}

/// Estimate the homography mapping `src` to `dst` with the normalized DLT.
///
/// Four correspondences give an exact solve, more give the algebraic
/// least-squares solution. The result is scaled so that `h[(2, 2)] = 1`
/// whenever that entry is not close to zero.
///
/// # Errors
///
/// Fails with [`HomographyError::Degenerate`] when three or more points are
/// collinear, points are duplicated, or the resulting matrix is singular.
///
/// # Example
///
/// ```
/// use arcv_3d::homography::{apply_homography, find_homography};
///
/// let src = [[0.0, 0.0], [100.0, 0.0], [100.0, 50.0], [0.0, 50.0]];
/// let dst = [[10.0, 20.0], [210.0, 25.0], [205.0, 130.0], [12.0, 118.0]];
/// let h = find_homography(&src, &dst)?;
/// let p = apply_homography(&h, &src[2]);
/// assert!((p[0] - 205.0).abs() < 1e-6 && (p[1] - 130.0).abs() < 1e-6);
/// # Ok::<(), arcv_3d::HomographyError>(())
/// ```
pub fn find_homography(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<Matrix3<f64>, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::MismatchedLengths {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < 4 {
        return Err(HomographyError::InsufficientPoints {
            required: 4,
            actual: n,
        });
    }

    let t_src = normalization_transform(src)?;
    let t_dst = normalization_transform(dst)?;

    // the null space needs a square system, so pad the 8x9 case with a zero row
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let sn = t_src * Vector3::new(s[0], s[1], 1.0);
        let dn = t_dst * Vector3::new(d[0], d[1], 1.0);
        let (x, y) = (sn.x, sn.y);
        let (u, v) = (dn.x, dn.y);

        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        a[(r, 8)] = -u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        a[(r + 1, 8)] = -v;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| svd.singular_values[j].total_cmp(&svd.singular_values[i]));
    let (largest, second_smallest, smallest) = (order[0], order[7], order[8]);

    let sigma_max = svd.singular_values[largest];
    if sigma_max <= 0.0 || svd.singular_values[second_smallest] / sigma_max < RANK_TOLERANCE {
        return Err(HomographyError::Degenerate(
            "correspondences do not constrain a unique homography",
        ));
    }

    let h = v_t.row(smallest);
    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    if (h_norm / h_norm.norm()).determinant().abs() < DET_TOLERANCE {
        return Err(HomographyError::Degenerate("homography is singular"));
    }

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or(HomographyError::Degenerate("normalization is singular"))?;
    let mut homography = t_dst_inv * h_norm * t_src;

    let h22 = homography[(2, 2)];
    if h22.abs() > f64::EPSILON * homography.norm() {
        homography /= h22;
    } else {
        homography /= homography.norm();
    }

    if homography.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::Degenerate("homography is not finite"));
    }

    Ok(homography)
}
