//! Closed-form initialization from board homographies.
//!
//! Homographies are conditioned first: pixels are shifted by the image center
//! and scaled by `1 / max(width, height)`, so the unknowns of the linear
//! systems are all of order one. Results are mapped back to pixels at the end.

use boardcal_core::{estimate_homography, Homography};
use log::debug;
use nalgebra::{DMatrix, Matrix2, Matrix3, Point2, Rotation3, Vector2};

use crate::correspondence::ViewCorrespondences;
use crate::model::{CameraIntrinsics, Pose};
use crate::CalibrationError;

/// How the initial intrinsics were obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitMethod {
    /// Full closed form over `B = K^-T K^-1` (three or more views).
    Zhang,
    /// Principal point at the image center, independent `fx`, `fy`.
    KnownCenter,
    /// Principal point at the image center, `fx = fy`.
    SharedFocal,
    /// No usable constraint; `f = max(width, height)`.
    Fallback,
}

/// Board plane -> image homography for every view.
pub fn board_homographies(views: &[ViewCorrespondences]) -> Result<Vec<Homography>, CalibrationError> {
    views
        .iter()
        .enumerate()
        .map(|(view, v)| {
            let src: Vec<Point2<f64>> = v.object_points.iter().map(|p| Point2::new(p.x, p.y)).collect();
            estimate_homography(&src, &v.image_points).ok_or(CalibrationError::Homography { view })
        })
        .collect()
}

/// Pixel conditioning transform and its scale.
fn conditioning(image_size: (u32, u32)) -> (Matrix3<f64>, f64, Vector2<f64>) {
    let (w, h) = (image_size.0 as f64, image_size.1 as f64);
    let s = 1.0 / w.max(h);
    let c = Vector2::new(0.5 * (w - 1.0), 0.5 * (h - 1.0));
    let t = Matrix3::new(s, 0.0, -s * c.x, 0.0, s, -s * c.y, 0.0, 0.0, 1.0);
    (t, s, c)
}

fn conditioned(hs: &[Homography], t: &Matrix3<f64>) -> Vec<Matrix3<f64>> {
    hs.iter()
        .map(|h| {
            let m = t * h.h;
            let n = m.norm();
            if n > 0.0 {
                m / n
            } else {
                m
            }
        })
        .collect()
}

fn v_ij(h: &Matrix3<f64>, i: usize, j: usize) -> [f64; 6] {
    [
        h[(0, i)] * h[(0, j)],
        h[(0, i)] * h[(1, j)] + h[(1, i)] * h[(0, j)],
        h[(1, i)] * h[(1, j)],
        h[(2, i)] * h[(0, j)] + h[(0, i)] * h[(2, j)],
        h[(2, i)] * h[(1, j)] + h[(1, i)] * h[(2, j)],
        h[(2, i)] * h[(2, j)],
    ]
}

/// Zhang's closed form on conditioned homographies; skew is discarded.
fn zhang_conditioned(hs: &[Matrix3<f64>]) -> Result<CameraIntrinsics, CalibrationError> {
    if hs.len() < 3 {
        return Err(CalibrationError::DegenerateIntrinsics("need at least 3 views"));
    }

    let mut v = DMatrix::<f64>::zeros(2 * hs.len(), 6);
    for (k, h) in hs.iter().enumerate() {
        let v12 = v_ij(h, 0, 1);
        let v11 = v_ij(h, 0, 0);
        let v22 = v_ij(h, 1, 1);
        for j in 0..6 {
            v[(2 * k, j)] = v12[j];
            v[(2 * k + 1, j)] = v11[j] - v22[j];
        }
    }

    // Null vector of V = eigenvector of VᵀV with the smallest eigenvalue.
    let vtv = v.transpose() * &v;
    let eig = vtv.symmetric_eigen();
    let (min_idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .ok_or(CalibrationError::DegenerateIntrinsics("empty system"))?;
    let mut b = eig.eigenvectors.column(min_idx).into_owned();
    if b[0] < 0.0 {
        b = -b;
    }
    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    let denom = b11 * b22 - b12 * b12;
    if denom <= 1e-18 || b11 <= 1e-18 {
        return Err(CalibrationError::DegenerateIntrinsics("B is not positive definite"));
    }
    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    if lambda <= 0.0 {
        return Err(CalibrationError::DegenerateIntrinsics("invalid scale"));
    }
    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    Ok(CameraIntrinsics::new(alpha, beta, u0, v0))
}

/// Least squares for `(1/fx², 1/fy²)` with the principal point at the origin
/// of the conditioned frame. Each view gives two rows: `h1 ⟂ h2` and
/// `|h1| = |h2|` under `diag(a, b, 1)`.
fn known_center_conditioned(hs: &[Matrix3<f64>]) -> Option<(f64, f64)> {
    let mut ata = Matrix2::<f64>::zeros();
    let mut aty = Vector2::<f64>::zeros();
    for h in hs {
        let rows = [
            (
                Vector2::new(h[(0, 0)] * h[(0, 1)], h[(1, 0)] * h[(1, 1)]),
                -h[(2, 0)] * h[(2, 1)],
            ),
            (
                Vector2::new(
                    h[(0, 0)].powi(2) - h[(0, 1)].powi(2),
                    h[(1, 0)].powi(2) - h[(1, 1)].powi(2),
                ),
                -(h[(2, 0)].powi(2) - h[(2, 1)].powi(2)),
            ),
        ];
        for (a, y) in rows {
            ata += a * a.transpose();
            aty += a * y;
        }
    }

    let trace = ata.trace();
    if trace <= 0.0 || ata.determinant() < 1e-10 * trace * trace {
        return None;
    }
    let ab = ata.try_inverse()? * aty;
    if ab.x > 0.0 && ab.y > 0.0 {
        Some((1.0 / ab.x.sqrt(), 1.0 / ab.y.sqrt()))
    } else {
        None
    }
}

fn shared_focal_conditioned(hs: &[Matrix3<f64>]) -> Option<f64> {
    let mut num = 0.0;
    let mut den = 0.0;
    for h in hs {
        let c1 = h[(0, 0)] * h[(0, 1)] + h[(1, 0)] * h[(1, 1)];
        let y1 = -h[(2, 0)] * h[(2, 1)];
        let c2 = h[(0, 0)].powi(2) - h[(0, 1)].powi(2) + h[(1, 0)].powi(2) - h[(1, 1)].powi(2);
        let y2 = -(h[(2, 0)].powi(2) - h[(2, 1)].powi(2));
        num += c1 * y1 + c2 * y2;
        den += c1 * c1 + c2 * c2;
    }
    if den <= 1e-18 {
        return None;
    }
    let a = num / den;
    (a > 0.0).then(|| 1.0 / a.sqrt())
}

fn plausible(k: &CameraIntrinsics) -> bool {
    // Conditioned units: the image spans at most [-0.5, 0.5].
    k.is_finite() && k.fx > 0.05 && k.fy > 0.05 && k.fx < 100.0 && k.fy < 100.0 && k.cx.abs() < 1.0 && k.cy.abs() < 1.0
}

/// Initial intrinsics from board homographies.
pub fn init_intrinsics(hs: &[Homography], image_size: (u32, u32)) -> (CameraIntrinsics, InitMethod) {
    let (t, s, c) = conditioning(image_size);
    let hn = conditioned(hs, &t);
    let to_pixels = |k: CameraIntrinsics| CameraIntrinsics::new(k.fx / s, k.fy / s, k.cx / s + c.x, k.cy / s + c.y);

    match zhang_conditioned(&hn) {
        Ok(k) if plausible(&k) => return (to_pixels(k), InitMethod::Zhang),
        Ok(k) => debug!("closed-form intrinsics rejected: {k:?}"),
        Err(e) => debug!("closed-form intrinsics unavailable: {e}"),
    }

    if let Some((fx, fy)) = known_center_conditioned(&hn) {
        let k = CameraIntrinsics::new(fx, fy, 0.0, 0.0);
        if plausible(&k) {
            return (to_pixels(k), InitMethod::KnownCenter);
        }
    }
    if let Some(f) = shared_focal_conditioned(&hn) {
        let k = CameraIntrinsics::new(f, f, 0.0, 0.0);
        if plausible(&k) {
            return (to_pixels(k), InitMethod::SharedFocal);
        }
    }
    (to_pixels(CameraIntrinsics::new(1.0, 1.0, 0.0, 0.0)), InitMethod::Fallback)
}

/// Board pose from `K^-1 H`, with the board in front of the camera.
pub fn pose_from_homography(k: &CameraIntrinsics, h: &Homography) -> Option<Pose> {
    let k_inv = k.matrix().try_inverse()?;
    let r1_raw = k_inv * h.h.column(0);
    let r2_raw = k_inv * h.h.column(1);
    let t_raw = k_inv * h.h.column(2);

    let norm = 0.5 * (r1_raw.norm() + r2_raw.norm());
    if norm <= 1e-18 {
        return None;
    }
    let mut scale = 1.0 / norm;
    if t_raw.z * scale < 0.0 {
        scale = -scale;
    }

    let r1 = r1_raw * scale;
    let r2 = r2_raw * scale;
    let r3 = r1.cross(&r2);
    let r = Matrix3::from_columns(&[r1, r2, r3]);

    let svd = r.svd(true, true);
    let mut r = svd.u? * svd.v_t?;
    if r.determinant() < 0.0 {
        r = -r;
    }

    Some(Pose::from_rotation(
        &Rotation3::from_matrix_unchecked(r),
        t_raw * scale,
    ))
}
