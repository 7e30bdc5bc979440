//! Pinhole intrinsics, Brown-Conrady distortion and board poses.

use nalgebra::{Matrix3, Point2, Point3, Rotation3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics, zero skew.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// The 3x3 camera matrix `K`.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub fn pixel_to_normalized(&self, p: Point2<f64>) -> Vector2<f64> {
        Vector2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }

    #[inline]
    pub fn normalized_to_pixel(&self, n: Vector2<f64>) -> Point2<f64> {
        Point2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    pub fn is_finite(&self) -> bool {
        self.fx.is_finite() && self.fy.is_finite() && self.cx.is_finite() && self.cy.is_finite()
    }
}

/// Brown-Conrady lens distortion: three radial and two tangential terms.
///
/// Coefficient order everywhere (vectors, reports) is `k1, k2, p1, p2, k3`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady5 {
    pub fn from_array(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    pub fn to_array(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// Ideal normalized coordinates -> distorted normalized coordinates.
    pub fn distort(&self, n: Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let x_tan = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;

        Vector2::new(x * radial + x_tan, y * radial + y_tan)
    }

    /// Inverse of [`distort`](Self::distort) by fixed-point iteration.
    pub fn undistort(&self, distorted: Vector2<f64>, iters: u32) -> Vector2<f64> {
        let mut n = distorted;
        for _ in 0..iters.max(1) {
            let err = self.distort(n) - distorted;
            n -= err;
        }
        n
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }
}

/// Board pose in the camera frame: `X_cam = R(rvec) X_board + tvec`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Axis-angle rotation (direction = axis, norm = angle in radians).
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl Pose {
    pub fn from_rotation(rotation: &Rotation3<f64>, tvec: Vector3<f64>) -> Self {
        Self {
            rvec: rotation.scaled_axis(),
            tvec,
        }
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::new(self.rvec)
    }

    pub fn transform(&self, p: &Point3<f64>) -> Vector3<f64> {
        self.rotation() * p.coords + self.tvec
    }
}

/// Project a board point through pose, distortion and intrinsics.
pub fn project_point(
    intrinsics: &CameraIntrinsics,
    distortion: &BrownConrady5,
    pose: &Pose,
    object: &Point3<f64>,
) -> Point2<f64> {
    let pc = pose.transform(object);
    let n = Vector2::new(pc.x / pc.z, pc.y / pc.z);
    intrinsics.normalized_to_pixel(distortion.distort(n))
}
