//! Console and JSON output.

use nalgebra::{Matrix3, Point2};
use serde::Serialize;

use crate::camera::CalibrationResult;

/// `<found> [(x, y), ...]`, `found` printed as `1` / `0`.
pub fn format_detection(found: bool, corners: &[Point2<f32>]) -> String {
    let list = corners
        .iter()
        .map(|p| format!("({:.3}, {:.3})", p.x, p.y))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} [{}]", u8::from(found), list)
}

pub fn format_matrix(m: &Matrix3<f64>) -> String {
    (0..3)
        .map(|r| format!("[{:12.4} {:12.4} {:12.4}]", m[(r, 0)], m[(r, 1)], m[(r, 2)]))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Camera matrix, distortion coefficients and RMS error, human readable.
pub fn format_calibration(result: &CalibrationResult) -> String {
    let [k1, k2, p1, p2, k3] = result.distortion_coefficients();
    format!(
        "camera matrix:\n{}\ndistortion (k1, k2, p1, p2, k3):\n[{k1:.6} {k2:.6} {p1:.6} {p2:.6} {k3:.6}]\nrms reprojection error: {:.4} px ({} view(s))",
        format_matrix(&result.camera_matrix()),
        result.rms,
        result.poses.len()
    )
}

#[derive(Clone, Debug, Serialize)]
pub struct ImageReport {
    pub path: String,
    pub found: bool,
    pub corners: Vec<[f32; 2]>,
}

impl ImageReport {
    pub fn new(path: String, found: bool, corners: &[Point2<f32>]) -> Self {
        Self {
            path,
            found,
            corners: corners.iter().map(|p| [p.x, p.y]).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CalibrationReport {
    /// Row-major 3x3 camera matrix.
    pub camera_matrix: [[f64; 3]; 3],
    /// `[k1, k2, p1, p2, k3]`.
    pub distortion: [f64; 5],
    pub rvecs: Vec<[f64; 3]>,
    pub tvecs: Vec<[f64; 3]>,
    pub rms: f64,
    pub per_view_rms: Vec<f64>,
    pub image_size: [u32; 2],
    /// Residual evaluations spent by the optimizer.
    pub iterations: usize,
    pub converged: bool,
}

impl From<&CalibrationResult> for CalibrationReport {
    fn from(r: &CalibrationResult) -> Self {
        let k = r.camera_matrix();
        let camera_matrix = [0, 1, 2].map(|row| [k[(row, 0)], k[(row, 1)], k[(row, 2)]]);
        Self {
            camera_matrix,
            distortion: r.distortion_coefficients(),
            rvecs: r.rvecs().iter().map(|v| [v.x, v.y, v.z]).collect(),
            tvecs: r.tvecs().iter().map(|v| [v.x, v.y, v.z]).collect(),
            rms: r.rms,
            per_view_rms: r.per_view_rms.clone(),
            image_size: [r.image_size.0, r.image_size.1],
            iterations: r.iterations,
            converged: r.converged,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub images: Vec<ImageReport>,
    pub calibration: Option<CalibrationReport>,
}
