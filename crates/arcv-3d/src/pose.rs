use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// A rigid transform mapping world coordinates into the camera frame.
///
/// `p_cam = rotation * p_world + translation`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// 3x3 orthonormal rotation matrix, world to camera.
    pub rotation: Matrix3<f64>,
    /// Translation vector, world to camera.
    pub translation: Vector3<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Create a pose from a rotation matrix and a translation.
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The identity pose.
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Create a pose from a Rodrigues axis-angle vector and a translation.
    ///
    /// # Example
    ///
    /// ```
    /// use arcv_3d::Pose;
    ///
    /// let pose = Pose::from_rvec_tvec(&[0.0, 0.0, std::f64::consts::FRAC_PI_2], &[0.0, 0.0, 1.0]);
    /// let p = pose.transform_point(&[1.0, 0.0, 0.0]);
    /// assert!((p[0] - 0.0).abs() < 1e-12);
    /// assert!((p[1] - 1.0).abs() < 1e-12);
    /// assert!((p[2] - 1.0).abs() < 1e-12);
    /// ```
    pub fn from_rvec_tvec(rvec: &[f64; 3], tvec: &[f64; 3]) -> Self {
        let rotation = Rotation3::from_scaled_axis(Vector3::from(*rvec));
        Self {
            rotation: rotation.into_inner(),
            translation: Vector3::from(*tvec),
        }
    }

    /// Rodrigues axis-angle vector of the rotation.
    pub fn rvec(&self) -> [f64; 3] {
        rotation_to_rvec(&self.rotation)
    }

    /// The translation as an array.
    pub fn tvec(&self) -> [f64; 3] {
        [self.translation.x, self.translation.y, self.translation.z]
    }

    /// Transform a world point into the camera frame.
    pub fn transform_point(&self, p: &[f64; 3]) -> [f64; 3] {
        let pc = self.rotation * Vector3::from(*p) + self.translation;
        [pc.x, pc.y, pc.z]
    }

    /// The inverse transform, camera to world.
    pub fn inverse(&self) -> Self {
        let rt = self.rotation.transpose();
        Self {
            rotation: rt,
            translation: -(rt * self.translation),
        }
    }

    /// Angle in radians of the relative rotation between two poses.
    pub fn rotation_angle_to(&self, other: &Pose) -> f64 {
        let rel = self.rotation.transpose() * other.rotation;
        let cos = ((rel.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
        cos.acos()
    }
}

/// Convert a rotation matrix to its Rodrigues axis-angle vector.
///
/// The quaternion route stays well-conditioned for angles close to π.
pub fn rotation_to_rvec(r: &Matrix3<f64>) -> [f64; 3] {
    let rot = Rotation3::from_matrix_unchecked(*r);
    let v = UnitQuaternion::from_rotation_matrix(&rot).scaled_axis();
    [v.x, v.y, v.z]
}

/// Project an arbitrary 3x3 matrix onto the closest rotation in Frobenius norm.
///
/// Returns `None` if the SVD does not converge.
pub fn orthonormalize(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let svd = m.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;

    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut d = Matrix3::identity();
        d[(2, 2)] = -1.0;
        r = u * d * v_t;
    }
    Some(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rvec_roundtrip() {
        let rvecs = [
            [0.0, 0.0, 0.0],
            [0.1, -0.2, 0.3],
            [-0.39580156, -0.8011695, 0.08711894],
            [0.0, 3.0, 0.0],
        ];
        for rvec in rvecs {
            let pose = Pose::from_rvec_tvec(&rvec, &[0.0; 3]);
            let back = pose.rvec();
            for k in 0..3 {
                assert_relative_eq!(back[k], rvec[k], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_rvec_half_turn() {
        let pose = Pose::from_rvec_tvec(&[std::f64::consts::PI, 0.0, 0.0], &[0.0; 3]);
        let back = pose.rvec();
        assert_relative_eq!(back[0].abs(), std::f64::consts::PI, epsilon = 1e-9);
        assert_relative_eq!(back[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(back[2], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse() {
        let pose = Pose::from_rvec_tvec(&[0.2, 0.1, -0.3], &[1.0, -2.0, 3.0]);
        let p = [0.5, 0.25, 2.0];
        let q = pose.transform_point(&p);
        let back = pose.inverse().transform_point(&q);
        for k in 0..3 {
            assert_relative_eq!(back[k], p[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_orthonormalize() {
        let r = Pose::from_rvec_tvec(&[0.3, -0.1, 0.2], &[0.0; 3]).rotation;
        let noisy = r * 1.3 + Matrix3::from_element(1e-3);
        let fixed = orthonormalize(&noisy).expect("svd");
        assert_relative_eq!(fixed.determinant(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(fixed * fixed.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(fixed, r, epsilon = 1e-2);
    }

    #[test]
    fn test_orthonormalize_reflection() {
        let m = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0);
        let fixed = orthonormalize(&m).expect("svd");
        assert_relative_eq!(fixed.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_angle_to() {
        let a = Pose::from_rvec_tvec(&[0.0, 0.0, 0.1], &[0.0; 3]);
        let b = Pose::from_rvec_tvec(&[0.0, 0.0, 0.35], &[0.0; 3]);
        assert_relative_eq!(a.rotation_angle_to(&b), 0.25, epsilon = 1e-12);
    }
}
