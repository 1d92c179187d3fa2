//! Joint refinement of intrinsics, distortion and per-view poses.

use std::fmt;

use arcv_3d::projection::project_point;
use arcv_3d::{CameraIntrinsics, CameraModel, DistortionCoefficients, Pose};
use arcv_image::ImageSize;
use arcv_optim::{
    central_difference_step, LeastSquaresProblem, LevenbergMarquardt, OptimizerResult,
    ProblemError,
};
use arcv_pnp::{solve_pnp, PnPMethod};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::accumulator::CalibrationView;
use crate::error::CalibError;
use crate::init::init_intrinsics;

/// Largest |z| accepted for a world point of a planar target.
const PLANAR_TOLERANCE: f64 = 1e-9;

/// Pose parameters per view: rvec then translation.
const VIEW_PARAMS: usize = 6;

/// Number of distortion coefficients estimated by the solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistortionModel {
    /// `k1 k2 p1 p2`
    RadialTangential4,
    /// `k1 k2 p1 p2 k3`
    #[default]
    RadialTangential5,
    /// `k1 k2 p1 p2 k3 k4 k5 k6`
    Rational8,
}

impl DistortionModel {
    /// Number of coefficients of the model.
    pub fn num_coefficients(&self) -> usize {
        match self {
            DistortionModel::RadialTangential4 => 4,
            DistortionModel::RadialTangential5 => 5,
            DistortionModel::Rational8 => 8,
        }
    }
}

/// Settings of a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Distortion coefficients to estimate.
    pub distortion_model: DistortionModel,
    /// Fewest views accepted. Values below 5 are raised to 5.
    pub min_views: usize,
    /// RMS reprojection error above which the result carries a warning.
    pub max_rms_px: f64,
    /// Optimizer for the joint refinement.
    pub optimizer: LevenbergMarquardt,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            distortion_model: DistortionModel::default(),
            min_views: 5,
            max_rms_px: 0.5,
            optimizer: LevenbergMarquardt {
                max_iterations: 100,
                cost_tolerance: 1e-15,
                gradient_tolerance: 1e-12,
                step_tolerance: 1e-14,
                ..Default::default()
            },
        }
    }
}

/// Attached to a result whose RMS error exceeds the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityWarning {
    /// RMS reprojection error of the result, in pixels.
    pub rms: f64,
    /// The configured threshold, in pixels.
    pub threshold: f64,
}

/// Output of [`calibrate_camera`].
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    /// Estimated intrinsics.
    pub intrinsics: CameraIntrinsics,
    /// Estimated distortion coefficients.
    pub distortion: DistortionCoefficients,
    /// Pose of the target in each view, in input order.
    pub poses: Vec<Pose>,
    /// RMS reprojection error over all points, in pixels.
    pub rms: f64,
    /// RMS reprojection error of each view, in pixels.
    pub per_view_rms: Vec<f64>,
    /// Summary of the joint refinement.
    pub summary: OptimizerResult,
    /// Size of the images the views were taken from.
    pub image_size: ImageSize,
    /// Set when `rms` exceeds the configured threshold.
    pub quality_warning: Option<QualityWarning>,
}

impl CalibrationResult {
    /// The calibrated camera.
    pub fn camera_model(&self) -> CameraModel {
        CameraModel {
            intrinsics: self.intrinsics,
            distortion: self.distortion.clone(),
        }
    }
}

impl fmt::Display for CalibrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "camera matrix:")?;
        for row in self.intrinsics.to_matrix() {
            for v in row {
                write!(f, "{v:.2} ")?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        write!(f, "distortion coefficients: [ ")?;
        for v in self.distortion.as_slice() {
            write!(f, "{v:.6} ")?;
        }
        writeln!(f, " ]")?;
        writeln!(f)?;
        write!(f, "error: {:.6}", self.rms)
    }
}

/// Reprojection residuals of every view under a shared camera.
///
/// Parameters are `[fx, fy, cx, cy, d0..dn, (rvec, t) per view]` and each
/// point contributes `(u - û, v - v̂)`.
struct CalibrationProblem<'a> {
    views: &'a [CalibrationView],
    num_distortion: usize,
    // first residual row of each view, plus the total
    row_offsets: Vec<usize>,
}

impl<'a> CalibrationProblem<'a> {
    fn new(views: &'a [CalibrationView], num_distortion: usize) -> Self {
        let mut row_offsets = Vec::with_capacity(views.len() + 1);
        let mut rows = 0;
        row_offsets.push(rows);
        for view in views {
            rows += 2 * view.len();
            row_offsets.push(rows);
        }
        Self {
            views,
            num_distortion,
            row_offsets,
        }
    }

    fn num_global(&self) -> usize {
        4 + self.num_distortion
    }

    fn num_params(&self) -> usize {
        self.num_global() + VIEW_PARAMS * self.views.len()
    }

    fn camera(&self, params: &DVector<f64>) -> Result<CameraModel, ProblemError> {
        let coeffs = params.rows(4, self.num_distortion).iter().copied().collect();
        // the length is fixed, only non-finite values are rejected
        let distortion = DistortionCoefficients::new(coeffs)
            .map_err(|_| ProblemError::NonFiniteResidual { index: 0 })?;
        Ok(CameraModel {
            intrinsics: CameraIntrinsics {
                fx: params[0],
                fy: params[1],
                cx: params[2],
                cy: params[3],
            },
            distortion,
        })
    }

    fn pose(&self, params: &DVector<f64>, view: usize) -> Pose {
        let o = self.num_global() + VIEW_PARAMS * view;
        Pose::from_rvec_tvec(
            &[params[o], params[o + 1], params[o + 2]],
            &[params[o + 3], params[o + 4], params[o + 5]],
        )
    }

    fn view_residuals(&self, view: usize, camera: &CameraModel, pose: &Pose, out: &mut [f64]) {
        let v = &self.views[view];
        for (i, (pw, uv)) in v.world_points().iter().zip(v.image_points()).enumerate() {
            let proj = project_point(pw, pose, camera);
            out[2 * i] = proj[0] - uv[0];
            out[2 * i + 1] = proj[1] - uv[1];
        }
    }

    fn check_dimension(&self, params: &DVector<f64>) -> Result<(), ProblemError> {
        if params.len() != self.num_params() {
            return Err(ProblemError::DimensionMismatch {
                expected: self.num_params(),
                actual: params.len(),
            });
        }
        Ok(())
    }
}

impl LeastSquaresProblem for CalibrationProblem<'_> {
    fn num_residuals(&self) -> usize {
        self.row_offsets[self.views.len()]
    }

    fn residuals(&self, params: &DVector<f64>) -> Result<DVector<f64>, ProblemError> {
        self.check_dimension(params)?;
        let camera = self.camera(params)?;

        let mut r = DVector::zeros(self.num_residuals());
        let out = r.as_mut_slice();
        for k in 0..self.views.len() {
            let pose = self.pose(params, k);
            let rows = self.row_offsets[k]..self.row_offsets[k + 1];
            self.view_residuals(k, &camera, &pose, &mut out[rows]);
        }
        Ok(r)
    }

    /// Central differences that skip the zero blocks: the camera columns touch
    /// every row, a view's pose columns only touch that view's rows.
    fn jacobian(&self, params: &DVector<f64>) -> Result<DMatrix<f64>, ProblemError> {
        self.check_dimension(params)?;
        let m = self.num_residuals();
        let mut jac = DMatrix::<f64>::zeros(m, params.len());
        let mut x = params.clone();

        for j in 0..self.num_global() {
            let x0 = x[j];
            let h = central_difference_step(x0);
            x[j] = x0 + h;
            let r_plus = self.residuals(&x)?;
            x[j] = x0 - h;
            let r_minus = self.residuals(&x)?;
            x[j] = x0;

            let inv_2h = 1.0 / (2.0 * h);
            for i in 0..m {
                jac[(i, j)] = (r_plus[i] - r_minus[i]) * inv_2h;
            }
        }

        let camera = self.camera(params)?;
        let max_rows = self
            .row_offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0);
        let mut plus = vec![0.0; max_rows];
        let mut minus = vec![0.0; max_rows];

        for k in 0..self.views.len() {
            let start = self.row_offsets[k];
            let len = self.row_offsets[k + 1] - start;
            for c in 0..VIEW_PARAMS {
                let j = self.num_global() + VIEW_PARAMS * k + c;
                let x0 = x[j];
                let h = central_difference_step(x0);
                x[j] = x0 + h;
                self.view_residuals(k, &camera, &self.pose(&x, k), &mut plus[..len]);
                x[j] = x0 - h;
                self.view_residuals(k, &camera, &self.pose(&x, k), &mut minus[..len]);
                x[j] = x0;

                let inv_2h = 1.0 / (2.0 * h);
                for i in 0..len {
                    jac[(start + i, j)] = (plus[i] - minus[i]) * inv_2h;
                }
            }
        }

        Ok(jac)
    }
}

// fewest views that constrain the intrinsics and every pose
const MIN_VIEWS: usize = 5;

fn validate_views(
    views: &[CalibrationView],
    image_size: ImageSize,
    config: &CalibrationConfig,
) -> Result<(), CalibError> {
    let required = config.min_views.max(MIN_VIEWS);
    if views.len() < required {
        return Err(CalibError::InsufficientViews {
            required,
            actual: views.len(),
        });
    }
    if image_size.width == 0 || image_size.height == 0 {
        return Err(CalibError::InvalidInput(format!(
            "image size {image_size} is empty"
        )));
    }

    for (i, view) in views.iter().enumerate() {
        if view.image_points().len() != view.world_points().len() {
            return Err(CalibError::MismatchedLengths {
                view: i,
                image: view.image_points().len(),
                world: view.world_points().len(),
            });
        }
        if view.len() < 4 {
            return Err(CalibError::InsufficientPoints {
                view: i,
                required: 4,
                actual: view.len(),
            });
        }
        let finite = view.image_points().iter().flatten().all(|v| v.is_finite())
            && view.world_points().iter().flatten().all(|v| v.is_finite());
        if !finite {
            return Err(CalibError::InvalidInput(format!(
                "view {i} has non-finite points"
            )));
        }
        if view.world_points().iter().any(|p| p[2].abs() > PLANAR_TOLERANCE) {
            return Err(CalibError::NonPlanarTarget { view: i });
        }
    }
    Ok(())
}

/// Calibrate a camera from views of a planar target.
///
/// The intrinsics are initialised in closed form from the view homographies,
/// each view's pose by planar PnP under those intrinsics, and everything is
/// then refined jointly with Levenberg–Marquardt.
///
/// # Arguments
///
/// * `views` - The observations, at least `config.min_views`.
/// * `image_size` - Size of the images the points were detected in.
/// * `config` - Distortion model, thresholds and optimizer settings.
///
/// # Errors
///
/// * [`CalibError::InsufficientViews`] if there are too few views.
/// * [`CalibError::MismatchedLengths`], [`CalibError::InsufficientPoints`] or
///   [`CalibError::NonPlanarTarget`] for a malformed view.
/// * [`CalibError::DegenerateGeometry`] or [`CalibError::Homography`] if the
///   views do not determine the camera.
pub fn calibrate_camera(
    views: &[CalibrationView],
    image_size: ImageSize,
    config: &CalibrationConfig,
) -> Result<CalibrationResult, CalibError> {
    validate_views(views, image_size, config)?;

    let initial = init_intrinsics(views, image_size)?;
    let pinhole = CameraModel::pinhole(initial);

    let num_distortion = config.distortion_model.num_coefficients();
    let problem = CalibrationProblem::new(views, num_distortion);

    let mut params = Vec::with_capacity(problem.num_params());
    params.extend([initial.fx, initial.fy, initial.cx, initial.cy]);
    params.resize(4 + num_distortion, 0.0);
    for view in views {
        let pose = solve_pnp(
            view.world_points(),
            view.image_points(),
            &pinhole,
            PnPMethod::Planar,
        )?
        .pose;
        params.extend(pose.rvec());
        params.extend(pose.tvec());
    }
    let mut params = DVector::from_vec(params);

    let summary = config.optimizer.optimize(&problem, &mut params)?;

    let camera = problem.camera(&params).map_err(|_| {
        CalibError::DegenerateGeometry("distortion diverged".to_string())
    })?;
    camera
        .intrinsics
        .validate()
        .map_err(|e| CalibError::DegenerateGeometry(e.to_string()))?;

    let residuals = problem.residuals(&params).map_err(arcv_optim::OptimizerError::from)?;
    let per_view_rms = (0..views.len())
        .map(|k| {
            let rows = problem.row_offsets[k]..problem.row_offsets[k + 1];
            let sq: f64 = residuals.as_slice()[rows].iter().map(|r| r * r).sum();
            (sq / views[k].len() as f64).sqrt()
        })
        .collect();
    let num_points: usize = views.iter().map(CalibrationView::len).sum();
    let rms = (residuals.norm_squared() / num_points as f64).sqrt();

    let poses = (0..views.len()).map(|k| problem.pose(&params, k)).collect();

    log::info!(
        "Calibrated {} views ({num_points} points): fx {:.2}, fy {:.2}, cx {:.2}, cy {:.2}, rms {rms:.4} px after {} iterations ({:?})",
        views.len(),
        camera.intrinsics.fx,
        camera.intrinsics.fy,
        camera.intrinsics.cx,
        camera.intrinsics.cy,
        summary.iterations,
        summary.termination_reason
    );

    let quality_warning = (rms > config.max_rms_px).then(|| {
        log::warn!(
            "Calibration RMS {rms:.4} px exceeds {:.4} px",
            config.max_rms_px
        );
        QualityWarning {
            rms,
            threshold: config.max_rms_px,
        }
    });

    Ok(CalibrationResult {
        intrinsics: camera.intrinsics,
        distortion: camera.distortion,
        poses,
        rms,
        per_view_rms,
        summary,
        image_size,
        quality_warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distortion_model_sizes() {
        assert_eq!(DistortionModel::default().num_coefficients(), 5);
        assert_eq!(DistortionModel::RadialTangential4.num_coefficients(), 4);
        assert_eq!(DistortionModel::Rational8.num_coefficients(), 8);
    }

    #[test]
    fn test_config_serde_defaults() -> Result<(), serde_json::Error> {
        let config: CalibrationConfig =
            serde_json::from_str(r#"{"distortion_model": "Rational8", "max_rms_px": 1.0}"#)?;
        assert_eq!(config.distortion_model, DistortionModel::Rational8);
        assert_eq!(config.min_views, 5);
        assert_eq!(config.max_rms_px, 1.0);
        assert_eq!(config.optimizer, CalibrationConfig::default().optimizer);
        Ok(())
    }

    #[test]
    fn test_problem_jacobian_matches_dense() -> Result<(), Box<dyn std::error::Error>> {
        let views = [
            CalibrationView::new(
                vec![[100.0, 120.0], [300.0, 118.0], [305.0, 260.0], [98.0, 255.0]],
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, -1.0, 0.0], [0.0, -1.0, 0.0]],
            ),
            CalibrationView::new(
                vec![[50.0, 60.0], [150.0, 62.0], [149.0, 160.0]],
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, -1.0, 0.0]],
            ),
        ];
        let problem = CalibrationProblem::new(&views, 4);
        let params = DVector::from_vec(vec![
            500.0, 510.0, 320.0, 240.0, 0.01, -0.02, 0.001, 0.002, // camera
            0.1, -0.2, 0.05, -0.3, 0.2, 4.0, // view 0
            -0.1, 0.1, 0.2, 0.1, -0.1, 5.0, // view 1
        ]);

        let sparse = problem.jacobian(&params)?;
        let dense = arcv_optim::finite_difference_jacobian(&problem, &params)?;
        assert_eq!(sparse.shape(), (14, 20));
        approx::assert_relative_eq!(sparse, dense, epsilon = 1e-9);
        // view 1 rows do not depend on view 0 parameters
        assert_eq!(sparse[(9, 8)], 0.0);
        Ok(())
    }

    #[test]
    fn test_display_layout() -> Result<(), Box<dyn std::error::Error>> {
        let result = CalibrationResult {
            intrinsics: CameraIntrinsics::new(800.0, 780.5, 322.25, 238.0)?,
            distortion: DistortionCoefficients::new(vec![0.1, -0.05, 0.0, 0.0])?,
            poses: vec![],
            rms: 0.25,
            per_view_rms: vec![],
            summary: OptimizerResult {
                initial_cost: 1.0,
                final_cost: 0.0,
                iterations: 3,
                termination_reason: arcv_optim::TerminationReason::CostConverged,
            },
            image_size: [640, 480].into(),
            quality_warning: None,
        };
        let text = result.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "camera matrix:");
        assert_eq!(lines[1], "800.00 0.00 322.25 ");
        assert_eq!(lines[2], "0.00 780.50 238.00 ");
        assert_eq!(lines[3], "0.00 0.00 1.00 ");
        assert_eq!(
            lines[5],
            "distortion coefficients: [ 0.100000 -0.050000 0.000000 0.000000  ]"
        );
        assert_eq!(lines[7], "error: 0.250000");
        Ok(())
    }
}
