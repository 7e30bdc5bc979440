use log::{debug, info};
use nalgebra::{DVector, Matrix3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::correspondence::ViewCorrespondences;
use crate::init::{board_homographies, init_intrinsics, pose_from_homography, InitMethod};
use crate::lm::{solve, NllsProblem, SolveOptions};
use crate::model::{project_point, BrownConrady5, CameraIntrinsics, Pose};
use crate::CalibrationError;

/// Views needed before the principal point and `k3` are estimated.
pub const MIN_VIEWS_FULL_MODEL: usize = 3;

const INTRINSIC_PARAMS: usize = 9;
const POSE_PARAMS: usize = 6;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationOptions {
    /// Keep `cx, cy` at their initial value.
    pub fix_principal_point: bool,
    /// Force `p1 = p2 = 0`.
    pub zero_tangent_dist: bool,
    /// Force `k3 = 0`.
    pub fix_k3: bool,
    pub max_iters: usize,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            fix_principal_point: false,
            zero_tangent_dist: false,
            fix_k3: false,
            max_iters: 100,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CalibrationResult {
    pub intrinsics: CameraIntrinsics,
    pub distortion: BrownConrady5,
    /// One pose per input view, same order.
    pub poses: Vec<Pose>,
    /// RMS reprojection error over all points (pixels).
    pub rms: f64,
    pub per_view_rms: Vec<f64>,
    pub image_size: (u32, u32),
    pub iterations: usize,
    pub converged: bool,
}

impl CalibrationResult {
    pub fn camera_matrix(&self) -> Matrix3<f64> {
        self.intrinsics.matrix()
    }

    /// `[k1, k2, p1, p2, k3]`.
    pub fn distortion_coefficients(&self) -> [f64; 5] {
        self.distortion.to_array()
    }

    pub fn rvecs(&self) -> Vec<Vector3<f64>> {
        self.poses.iter().map(|p| p.rvec).collect()
    }

    pub fn tvecs(&self) -> Vec<Vector3<f64>> {
        self.poses.iter().map(|p| p.tvec).collect()
    }
}

fn pack(k: &CameraIntrinsics, d: &BrownConrady5, poses: &[Pose]) -> DVector<f64> {
    let mut x = DVector::<f64>::zeros(INTRINSIC_PARAMS + POSE_PARAMS * poses.len());
    let [k1, k2, p1, p2, k3] = d.to_array();
    for (i, v) in [k.fx, k.fy, k.cx, k.cy, k1, k2, p1, p2, k3].into_iter().enumerate() {
        x[i] = v;
    }
    for (n, pose) in poses.iter().enumerate() {
        let base = INTRINSIC_PARAMS + POSE_PARAMS * n;
        x.fixed_rows_mut::<3>(base).copy_from(&pose.rvec);
        x.fixed_rows_mut::<3>(base + 3).copy_from(&pose.tvec);
    }
    x
}

fn unpack(x: &DVector<f64>, num_views: usize) -> (CameraIntrinsics, BrownConrady5, Vec<Pose>) {
    let k = CameraIntrinsics::new(x[0], x[1], x[2], x[3]);
    let d = BrownConrady5::from_array([x[4], x[5], x[6], x[7], x[8]]);
    let poses = (0..num_views)
        .map(|n| {
            let base = INTRINSIC_PARAMS + POSE_PARAMS * n;
            Pose {
                rvec: x.fixed_rows::<3>(base).into_owned(),
                tvec: x.fixed_rows::<3>(base + 3).into_owned(),
            }
        })
        .collect();
    (k, d, poses)
}

/// Reprojection error over all views; only the `free` entries of the full
/// parameter vector are exposed to the solver.
struct ReprojectionProblem<'a> {
    views: &'a [ViewCorrespondences],
    full: DVector<f64>,
    free: Vec<usize>,
}

impl ReprojectionProblem<'_> {
    fn expand(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut full = self.full.clone();
        for (k, &idx) in self.free.iter().enumerate() {
            full[idx] = x[k];
        }
        full
    }

    fn reduce(&self) -> DVector<f64> {
        DVector::from_iterator(self.free.len(), self.free.iter().map(|&i| self.full[i]))
    }
}

impl NllsProblem for ReprojectionProblem<'_> {
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        let (k, d, poses) = unpack(&self.expand(x), self.views.len());
        let total: usize = self.views.iter().map(ViewCorrespondences::len).sum();
        let mut r = DVector::<f64>::zeros(2 * total);
        let mut row = 0;
        for (view, pose) in self.views.iter().zip(&poses) {
            for (obj, img) in view.object_points.iter().zip(&view.image_points) {
                let p = project_point(&k, &d, pose, obj);
                r[row] = p.x - img.x;
                r[row + 1] = p.y - img.y;
                row += 2;
            }
        }
        r
    }
}

fn free_parameters(num_views: usize, opts: &CalibrationOptions) -> Vec<usize> {
    let full_model = num_views >= MIN_VIEWS_FULL_MODEL;
    let mut free = vec![0, 1];
    if full_model && !opts.fix_principal_point {
        free.extend([2, 3]);
    }
    free.extend([4, 5]);
    if !opts.zero_tangent_dist {
        free.extend([6, 7]);
    }
    if full_model && !opts.fix_k3 {
        free.push(8);
    }
    free.extend(INTRINSIC_PARAMS..INTRINSIC_PARAMS + POSE_PARAMS * num_views);
    free
}

fn validate(views: &[ViewCorrespondences], image_size: (u32, u32)) -> Result<(), CalibrationError> {
    if views.is_empty() {
        return Err(CalibrationError::NoViews);
    }
    let (width, height) = image_size;
    if width == 0 || height == 0 {
        return Err(CalibrationError::InvalidImageSize { width, height });
    }
    for (view, v) in views.iter().enumerate() {
        if v.object_points.len() != v.image_points.len() {
            return Err(CalibrationError::MismatchedPoints {
                view,
                object: v.object_points.len(),
                image: v.image_points.len(),
            });
        }
        if v.len() < 4 {
            return Err(CalibrationError::NotEnoughPoints { view, got: v.len() });
        }
    }
    Ok(())
}

/// Estimate intrinsics, distortion and per-view poses from planar board views.
///
/// Object points must lie on `z = 0`. With fewer than
/// [`MIN_VIEWS_FULL_MODEL`] views the principal point stays at the image
/// center and `k3` at zero.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(views, opts), fields(num_views = views.len()))
)]
pub fn calibrate_camera(
    views: &[ViewCorrespondences],
    image_size: (u32, u32),
    opts: &CalibrationOptions,
) -> Result<CalibrationResult, CalibrationError> {
    validate(views, image_size)?;

    let homographies = board_homographies(views)?;
    let (k0, method) = init_intrinsics(&homographies, image_size);
    if method != InitMethod::Zhang {
        debug!("intrinsics initialized via {method:?}");
    }
    debug!("initial intrinsics {k0:?}");

    let poses0 = homographies
        .iter()
        .enumerate()
        .map(|(view, h)| pose_from_homography(&k0, h).ok_or(CalibrationError::Homography { view }))
        .collect::<Result<Vec<_>, _>>()?;

    let problem = ReprojectionProblem {
        views,
        full: pack(&k0, &BrownConrady5::default(), &poses0),
        free: free_parameters(views.len(), opts),
    };
    let solve_opts = SolveOptions {
        max_iters: opts.max_iters,
        ..SolveOptions::default()
    };
    let (x, report) = solve(&problem, problem.reduce(), &solve_opts);
    debug!(
        "LM: {} iterations, cost {:.3e} -> {:.3e}, converged: {}",
        report.iterations, report.initial_cost, report.final_cost, report.converged
    );

    let full = problem.expand(&x);
    if full.iter().any(|v| !v.is_finite()) {
        return Err(CalibrationError::NonFinite);
    }
    let (intrinsics, distortion, poses) = unpack(&full, views.len());

    let residuals = problem.residuals(&x);
    let mut offset = 0;
    let per_view_rms = views
        .iter()
        .map(|v| {
            let n = v.len();
            let sq = residuals.rows(offset, 2 * n).norm_squared();
            offset += 2 * n;
            (sq / n as f64).sqrt()
        })
        .collect();
    let total_points: usize = views.iter().map(ViewCorrespondences::len).sum();
    let rms = (residuals.norm_squared() / total_points as f64).sqrt();

    info!(
        "calibrated {} view(s): fx={:.2} fy={:.2} cx={:.2} cy={:.2}, rms {:.4} px",
        views.len(),
        intrinsics.fx,
        intrinsics.fy,
        intrinsics.cx,
        intrinsics.cy,
        rms
    );

    Ok(CalibrationResult {
        intrinsics,
        distortion,
        poses,
        rms,
        per_view_rms,
        image_size,
        iterations: report.iterations,
        converged: report.converged,
    })
}
