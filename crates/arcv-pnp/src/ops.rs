use nalgebra::{Matrix3, SymmetricEigen, Vector3};

/// Compute the centroid of a set of points.
pub(crate) fn compute_centroid(pts: &[[f64; 3]]) -> Vector3<f64> {
    let n = pts.len() as f64;
    let sum = pts
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + Vector3::from(*p));
    sum / n
}

/// Principal axes of a point set.
#[derive(Debug, Clone)]
pub(crate) struct PrincipalAxes {
    /// Centroid of the points.
    pub centroid: Vector3<f64>,
    /// Eigenvalues of the covariance, sorted in decreasing order.
    pub eigenvalues: [f64; 3],
    /// Matching unit eigenvectors as columns, forming a right-handed basis.
    pub axes: Matrix3<f64>,
}

impl PrincipalAxes {
    /// Whether the points lie on a plane, judged by the spread along the
    /// weakest axis relative to the strongest one.
    pub fn is_planar(&self, ratio: f64) -> bool {
        self.eigenvalues[2] <= ratio * self.eigenvalues[0]
    }
}

/// Eigen-decomposition of the covariance of a point set.
pub(crate) fn principal_axes(pts: &[[f64; 3]]) -> PrincipalAxes {
    let n = pts.len() as f64;
    let centroid = compute_centroid(pts);

    let mut cov = Matrix3::<f64>::zeros();
    for p in pts {
        let d = Vector3::from(*p) - centroid;
        cov += d * d.transpose();
    }
    cov /= n;

    let eig = SymmetricEigen::new(cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let e0 = eig.eigenvectors.column(order[0]).into_owned();
    let e1 = eig.eigenvectors.column(order[1]).into_owned();
    // third axis from the cross product keeps the basis right-handed
    let e2 = e0.cross(&e1);

    PrincipalAxes {
        centroid,
        eigenvalues: order.map(|i| eig.eigenvalues[i].max(0.0)),
        axes: Matrix3::from_columns(&[e0, e1, e2]),
    }
}

/// Least-squares rigid transform `dst ≈ R * src + t` (Kabsch).
///
/// Returns `None` if the SVD fails.
pub(crate) fn rigid_transform(
    src: &[Vector3<f64>],
    dst: &[Vector3<f64>],
) -> Option<(Matrix3<f64>, Vector3<f64>)> {
    let n = src.len() as f64;
    let c_src = src.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;
    let c_dst = dst.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;

    let mut h = Matrix3::<f64>::zeros();
    for (s, d) in src.iter().zip(dst.iter()) {
        h += (d - c_dst) * (s - c_src).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;

    let mut d = Matrix3::identity();
    if (u * v_t).determinant() < 0.0 {
        d[(2, 2)] = -1.0;
    }
    let r = u * d * v_t;
    let t = c_dst - r * c_src;
    Some((r, t))
}

/// Root-mean-square reprojection error in normalized image coordinates.
pub(crate) fn rmse_normalized(
    world: &[[f64; 3]],
    normalized: &[[f64; 2]],
    r: &Matrix3<f64>,
    t: &Vector3<f64>,
) -> f64 {
    let sum_sq: f64 = world
        .iter()
        .zip(normalized.iter())
        .map(|(pw, uv)| {
            let pc = r * Vector3::from(*pw) + t;
            let du = pc.x / pc.z - uv[0];
            let dv = pc.y / pc.z - uv[1];
            du.mul_add(du, dv * dv)
        })
        .sum();
    (sum_sq / world.len() as f64).sqrt()
}
