use approx::assert_relative_eq;
use boardcal_camera::{
    build_correspondences, calibrate_camera, project_point, BrownConrady5, CalibrationOptions, CameraIntrinsics,
    Pose, ViewCorrespondences,
};
use boardcal_core::PatternSize;
use nalgebra::{Point2, Rotation3, Vector3};

const PATTERN: PatternSize = PatternSize::new(4, 6);

fn truth() -> (CameraIntrinsics, BrownConrady5) {
    (
        CameraIntrinsics::new(810.0, 795.0, 324.0, 236.0),
        BrownConrady5 {
            k1: -0.12,
            k2: 0.05,
            p1: 0.0008,
            p2: -0.0006,
            k3: 0.0,
        },
    )
}

fn poses() -> Vec<Pose> {
    [
        (0.30, -0.20, 0.05, Vector3::new(-2.5, -1.5, 10.0)),
        (-0.25, 0.30, -0.10, Vector3::new(-2.0, -1.0, 11.0)),
        (0.10, 0.35, 0.30, Vector3::new(-3.0, -2.0, 9.5)),
        (-0.35, -0.15, -0.25, Vector3::new(-2.5, -1.0, 12.0)),
        (0.20, 0.10, 1.40, Vector3::new(-1.0, -2.5, 10.5)),
    ]
    .into_iter()
    .map(|(a, b, c, t)| Pose::from_rotation(&Rotation3::from_euler_angles(a, b, c), t))
    .collect()
}

/// Detector-style row-major corners for a board seen at `pose`.
fn synthetic_view(k: &CameraIntrinsics, d: &BrownConrady5, pose: &Pose) -> ViewCorrespondences {
    let corners: Vec<Point2<f32>> = (0..PATTERN.corner_count())
        .map(|i| {
            let p = project_point(k, d, pose, &boardcal_camera::object_point(i, PATTERN.width));
            Point2::new(p.x as f32, p.y as f32)
        })
        .collect();
    build_correspondences(&corners, PATTERN).expect("24 corners")
}

#[test]
fn multi_view_recovers_ground_truth() {
    let (k, d) = truth();
    let views: Vec<_> = poses().iter().map(|p| synthetic_view(&k, &d, p)).collect();

    let result = calibrate_camera(&views, (640, 480), &CalibrationOptions::default()).expect("calibration");

    assert!(result.rms < 1e-2, "rms {}", result.rms);
    assert_relative_eq!(result.intrinsics.fx, k.fx, max_relative = 2e-3);
    assert_relative_eq!(result.intrinsics.fy, k.fy, max_relative = 2e-3);
    assert_relative_eq!(result.intrinsics.cx, k.cx, max_relative = 5e-3);
    assert_relative_eq!(result.intrinsics.cy, k.cy, max_relative = 5e-3);
    assert!((result.distortion.k1 - d.k1).abs() < 2e-2, "k1 {}", result.distortion.k1);

    assert_eq!(result.poses.len(), views.len());
    assert_eq!(result.per_view_rms.len(), views.len());
    for (est, gt) in result.tvecs().iter().zip(poses()) {
        assert_relative_eq!(*est, gt.tvec, max_relative = 1e-2);
    }
}

#[test]
fn single_view_keeps_principal_point_at_center() {
    let k = CameraIntrinsics::new(800.0, 800.0, 319.5, 239.5);
    let view = synthetic_view(&k, &BrownConrady5::default(), &poses()[0]);

    let result = calibrate_camera(&[view], (640, 480), &CalibrationOptions::default()).expect("calibration");

    let m = result.camera_matrix();
    assert!(m[(0, 0)].is_finite() && m[(0, 0)] > 0.0);
    assert!(m[(1, 1)].is_finite() && m[(1, 1)] > 0.0);
    assert_eq!(m[(0, 2)], 319.5);
    assert_eq!(m[(1, 2)], 239.5);
    assert_eq!(result.distortion_coefficients()[4], 0.0);
    assert_eq!(result.rvecs().len(), 1);
    assert!(result.tvecs()[0].z > 0.0);
    assert!(result.rms < 0.1, "rms {}", result.rms);
}

#[test]
fn fixed_tangential_terms_stay_zero() {
    let (k, _) = truth();
    let d = BrownConrady5 {
        k1: -0.1,
        ..BrownConrady5::default()
    };
    let views: Vec<_> = poses().iter().map(|p| synthetic_view(&k, &d, p)).collect();
    let opts = CalibrationOptions {
        zero_tangent_dist: true,
        fix_k3: true,
        ..CalibrationOptions::default()
    };
    let result = calibrate_camera(&views, (640, 480), &opts).expect("calibration");
    let [_, _, p1, p2, k3] = result.distortion_coefficients();
    assert_eq!((p1, p2, k3), (0.0, 0.0, 0.0));
    assert!(result.rms < 1e-2, "rms {}", result.rms);
}
