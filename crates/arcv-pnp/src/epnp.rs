//! Efficient Perspective-n-Point (EPnP) solver
//! Paper: https://www.tugraz.at/fileadmin/user_upload/Institute/ICG/Images/team_lepetit/publications/lepetit_ijcv08.pdf
//! Reference: https://github.com/opencv/opencv/blob/4.x/modules/calib3d/src/epnp.cpp
//!
//! The solver works on undistorted normalized image coordinates, so the
//! intrinsics reduce to the identity.

use crate::ops::{principal_axes, rigid_transform, rmse_normalized};
use crate::types::{NumericTol, PnPError, PnPSolver};
use arcv_3d::Pose;
use nalgebra::{
    DMatrix, DVector, Matrix3, Matrix4, SMatrix, SVector, SymmetricEigen, Vector3, Vector4,
};

/// Marker type representing the Efficient PnP algorithm.
pub struct EPnP;

impl PnPSolver for EPnP {
    type Param = EPnPParams;

    fn solve(
        world: &[[f64; 3]],
        normalized: &[[f64; 2]],
        params: &Self::Param,
    ) -> Result<Pose, PnPError> {
        solve_epnp(world, normalized, params)
    }
}

/// Parameters controlling the EPnP solver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EPnPParams {
    /// Shared numeric tolerances.
    pub tol: NumericTol,
}

const CP_PAIRS: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];

/// Solve Perspective-n-Point with EPnP.
///
/// # Arguments
/// * `world` – 3-D coordinates in the world frame, shape *(N,3)* with `N≥4`.
/// * `normalized` – Corresponding undistorted normalized image coordinates, shape *(N,2)*.
///
/// # Returns
/// The pose mapping world points into the camera frame. Among the candidate
/// beta estimates, the one with the lowest reprojection error wins.
pub fn solve_epnp(
    world: &[[f64; 3]],
    normalized: &[[f64; 2]],
    params: &EPnPParams,
) -> Result<Pose, PnPError> {
    let n = world.len();
    if n != normalized.len() {
        return Err(PnPError::MismatchedArrayLengths {
            left_name: "world points",
            left_len: n,
            right_name: "image points",
            right_len: normalized.len(),
        });
    }
    if n < 4 {
        return Err(PnPError::InsufficientCorrespondences {
            required: 4,
            actual: n,
        });
    }

    let cw = select_control_points(world);
    let alphas = compute_barycentric(world, &cw, params.tol.eps)?;

    // M^T M shares its null space with the 2N×12 design matrix M
    let m = build_m(&alphas, normalized);
    let mtm = m.tr_mul(&m);
    let null4 = null_space4(mtm);

    let l = build_l6x10(&null4);
    let rho = DVector::from_column_slice(&rho_ctrlpts(&cw));

    let candidates: Vec<[f64; 4]> = [
        estimate_beta(&[0, 1, 3, 6], &l, &rho, params.tol.svd).map(betas_approx_1),
        estimate_beta(&[0, 1, 2], &l, &rho, params.tol.svd).map(betas_approx_2),
        estimate_beta(&[0, 1, 2, 3, 4], &l, &rho, params.tol.svd).map(betas_approx_3),
    ]
    .into_iter()
    .flatten()
    .filter(|b| b.iter().all(|v| v.is_finite()))
    .map(|b| gauss_newton(b, &null4, &rho))
    .filter(|b| b.iter().all(|v| v.is_finite()))
    .collect();

    let mut best: Option<(f64, Matrix3<f64>, Vector3<f64>)> = None;
    for betas in &candidates {
        let Some((r, t)) = pose_from_betas(betas, &null4, &alphas, world) else {
            continue;
        };
        let err = rmse_normalized(world, normalized, &r, &t);
        if !err.is_finite() {
            continue;
        }
        if best.as_ref().map_or(true, |(e, _, _)| err < *e) {
            best = Some((err, r, t));
        }
    }

    let (err, r, t) = best.ok_or_else(|| {
        PnPError::SvdFailed("no EPnP candidate produced a valid pose".to_string())
    })?;
    log::debug!("EPnP selected candidate with normalized rmse {err:.3e}");

    Ok(Pose::new(r, t))
}

/// Control points: the centroid plus one point along each principal axis.
fn select_control_points(world: &[[f64; 3]]) -> [Vector3<f64>; 4] {
    let axes = principal_axes(world);
    let c = axes.centroid;

    let mut cw = [c; 4];
    for i in 0..3 {
        let sigma = axes.eigenvalues[i].sqrt();
        cw[i + 1] = c + axes.axes.column(i) * sigma;
    }
    cw
}

/// Compute barycentric coordinates of world-space points with respect to the
/// 4 control points returned by `select_control_points`.
///
/// If the determinant of the matrix built from the control points is below
/// `eps` (planar or degenerate sets), a Moore–Penrose pseudo-inverse is used
/// instead of the exact inverse.
///
/// Each returned `[α0, α1, α2, α3]` satisfies `α0 + α1 + α2 + α3 = 1` and
/// `pw_i = Σ αj Cw_j`.
fn compute_barycentric(
    world: &[[f64; 3]],
    cw: &[Vector3<f64>; 4],
    eps: f64,
) -> Result<Vec<[f64; 4]>, PnPError> {
    let b = Matrix3::from_columns(&[cw[1] - cw[0], cw[2] - cw[0], cw[3] - cw[0]]);

    let b_inv = if b.determinant().abs() > eps {
        b.try_inverse()
    } else {
        b.pseudo_inverse(eps).ok()
    }
    .ok_or_else(|| PnPError::SvdFailed("control points are singular".to_string()))?;

    Ok(world
        .iter()
        .map(|p| {
            let lamb = b_inv * (Vector3::from(*p) - cw[0]);
            [1.0 - (lamb.x + lamb.y + lamb.z), lamb.x, lamb.y, lamb.z]
        })
        .collect())
}

/// Construct the 2N×12 design matrix **M** for normalized coordinates.
fn build_m(alphas: &[[f64; 4]], normalized: &[[f64; 2]]) -> DMatrix<f64> {
    let n = alphas.len();
    let mut m = DMatrix::<f64>::zeros(2 * n, 12);

    for (i, (a, uv)) in alphas.iter().zip(normalized.iter()).enumerate() {
        let (u, v) = (uv[0], uv[1]);
        let row_x = 2 * i;
        let row_y = row_x + 1;

        for (j, &alpha) in a.iter().enumerate() {
            let base = 3 * j;
            m[(row_x, base)] = alpha;
            m[(row_x, base + 2)] = -alpha * u;
            m[(row_y, base + 1)] = alpha;
            m[(row_y, base + 2)] = -alpha * v;
        }
    }

    m
}

/// The four eigenvectors of `MᵀM` with the smallest eigenvalues, as a 12×4
/// matrix whose first column belongs to the smallest eigenvalue.
fn null_space4(mtm: DMatrix<f64>) -> SMatrix<f64, 12, 4> {
    let eig = SymmetricEigen::new(mtm);
    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

    let mut null4 = SMatrix::<f64, 12, 4>::zeros();
    for (k, &idx) in order.iter().take(4).enumerate() {
        null4.set_column(k, &eig.eigenvectors.column(idx));
    }
    null4
}

/// Control point `i` of null-space component `k`.
fn control_point(null4: &SMatrix<f64, 12, 4>, k: usize, i: usize) -> Vector3<f64> {
    null4.fixed_view::<3, 1>(3 * i, k).into_owned()
}

/// Build the 6×10 matrix **L** relating the beta products to the squared
/// control point distances.
fn build_l6x10(null4: &SMatrix<f64, 12, 4>) -> DMatrix<f64> {
    let dv: Vec<[Vector3<f64>; 6]> = (0..4)
        .map(|k| CP_PAIRS.map(|(a, b)| control_point(null4, k, a) - control_point(null4, k, b)))
        .collect();

    let mut l = DMatrix::<f64>::zeros(6, 10);
    for j in 0..6 {
        l[(j, 0)] = dv[0][j].dot(&dv[0][j]);
        l[(j, 1)] = 2.0 * dv[0][j].dot(&dv[1][j]);
        l[(j, 2)] = dv[1][j].dot(&dv[1][j]);
        l[(j, 3)] = 2.0 * dv[0][j].dot(&dv[2][j]);
        l[(j, 4)] = 2.0 * dv[1][j].dot(&dv[2][j]);
        l[(j, 5)] = dv[2][j].dot(&dv[2][j]);
        l[(j, 6)] = 2.0 * dv[0][j].dot(&dv[3][j]);
        l[(j, 7)] = 2.0 * dv[1][j].dot(&dv[3][j]);
        l[(j, 8)] = 2.0 * dv[2][j].dot(&dv[3][j]);
        l[(j, 9)] = dv[3][j].dot(&dv[3][j]);
    }
    l
}

/// Least-squares solve of `L[:, cols] x = rho`.
fn estimate_beta(
    cols: &[usize],
    l: &DMatrix<f64>,
    rho: &DVector<f64>,
    tol_svd: f64,
) -> Option<DVector<f64>> {
    let l_sub = l.select_columns(cols);
    l_sub.svd(true, true).solve(rho, tol_svd).ok()
}

/// Betas from `[b11, b12, b13, b14]`.
fn betas_approx_1(x: DVector<f64>) -> [f64; 4] {
    let b0 = x[0].abs().sqrt();
    if x[0] < 0.0 {
        [-b0, -x[1] / b0, -x[2] / b0, -x[3] / b0]
    } else {
        [b0, x[1] / b0, x[2] / b0, x[3] / b0]
    }
}

/// Betas from `[b11, b12, b22]`.
fn betas_approx_2(x: DVector<f64>) -> [f64; 4] {
    let mut beta = [0.0; 4];
    if x[0] < 0.0 {
        beta[0] = (-x[0]).sqrt();
        beta[1] = if x[2] < 0.0 { (-x[2]).sqrt() } else { 0.0 };
    } else {
        beta[0] = x[0].sqrt();
        beta[1] = if x[2] > 0.0 { x[2].sqrt() } else { 0.0 };
    }
    if x[1] < 0.0 {
        beta[0] = -beta[0];
    }
    beta
}

/// Betas from `[b11, b12, b22, b13, b23]`.
fn betas_approx_3(x: DVector<f64>) -> [f64; 4] {
    let mut beta = betas_approx_2(x.rows(0, 3).into_owned());
    if beta[0] != 0.0 {
        beta[2] = x[3] / beta[0];
    }
    beta
}

/// Compute the six squared distances (ρ vector) between the 4 control points.
fn rho_ctrlpts(cw: &[Vector3<f64>; 4]) -> [f64; 6] {
    CP_PAIRS.map(|(i, j)| (cw[i] - cw[j]).norm_squared())
}

/// Refine the betas with Gauss-Newton so that the control point distances
/// match `rho`.
fn gauss_newton(
    beta_init: [f64; 4],
    null4: &SMatrix<f64, 12, 4>,
    rho: &DVector<f64>,
) -> [f64; 4] {
    const MAX_ITERATIONS: usize = 6;
    const DAMPING: f64 = 1e-12;
    const STOP_EPS: f64 = 1e-12;

    let mut bet = Vector4::from(beta_init);

    for _ in 0..MAX_ITERATIONS {
        let vs: [Vector3<f64>; 4] =
            std::array::from_fn(|i| null4.fixed_view::<3, 4>(3 * i, 0) * bet);

        let mut f = SVector::<f64, 6>::zeros();
        let mut j = SMatrix::<f64, 6, 4>::zeros();
        for (r, &(a, b)) in CP_PAIRS.iter().enumerate() {
            let diff = vs[a] - vs[b];
            f[r] = diff.norm_squared() - rho[r];
            for k in 0..4 {
                let d_col = control_point(null4, k, a) - control_point(null4, k, b);
                j[(r, k)] = 2.0 * diff.dot(&d_col);
            }
        }

        let mut a: Matrix4<f64> = j.transpose() * j;
        let b: Vector4<f64> = j.transpose() * f;
        for d in 0..4 {
            a[(d, d)] += DAMPING;
        }

        let Some(delta) = a.cholesky().map(|c| c.solve(&b)) else {
            break;
        };
        bet -= delta;
        if delta.norm() < STOP_EPS {
            break;
        }
    }

    bet.into()
}

/// Compute pose (R, t) from a set of betas using the null-space vectors.
fn pose_from_betas(
    betas: &[f64; 4],
    null4: &SMatrix<f64, 12, 4>,
    alphas: &[[f64; 4]],
    world: &[[f64; 3]],
) -> Option<(Matrix3<f64>, Vector3<f64>)> {
    let cc_flat = null4 * Vector4::from(*betas);
    let cc: [Vector3<f64>; 4] =
        std::array::from_fn(|i| cc_flat.fixed_rows::<3>(3 * i).into_owned());

    let mut pc: Vec<Vector3<f64>> = alphas
        .iter()
        .map(|a| cc[0] * a[0] + cc[1] * a[1] + cc[2] * a[2] + cc[3] * a[3])
        .collect();

    // the null space is defined up to sign; keep the points in front of the camera
    if pc.first().is_some_and(|p| p.z < 0.0) {
        pc.iter_mut().for_each(|p| *p = -*p);
    }

    let pw: Vec<Vector3<f64>> = world.iter().map(|p| Vector3::from(*p)).collect();
    rigid_transform(&pw, &pc)
}
