#![allow(dead_code)]

use std::path::{Path, PathBuf};

use boardcal::core::synthetic::{board_homography, project_corners, render_chessboard};
use boardcal::core::PatternSize;
use nalgebra::{Matrix3, Point2, Rotation3, Vector3};

pub const PATTERN: PatternSize = PatternSize::new(4, 6);
pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;
pub const FOCAL: f64 = 700.0;

pub fn camera_matrix() -> Matrix3<f64> {
    Matrix3::new(FOCAL, 0.0, 319.5, 0.0, FOCAL, 239.5, 0.0, 0.0, 1.0)
}

/// Board orientations used across the tests, all fully in frame.
pub fn board_poses() -> Vec<(Rotation3<f64>, Vector3<f64>)> {
    vec![
        (Rotation3::from_euler_angles(0.2, 0.15, -0.1), Vector3::new(-1.5, -2.5, 16.0)),
        (Rotation3::from_euler_angles(-0.25, 0.3, 0.05), Vector3::new(-1.2, -2.8, 17.0)),
        (Rotation3::from_euler_angles(0.1, -0.3, 0.2), Vector3::new(-1.8, -2.2, 15.0)),
    ]
}

/// Render the 4x6 board at `pose` and save it as a PNG; returns the path and
/// the true row-major corner positions.
pub fn write_board(dir: &Path, name: &str, pose: &(Rotation3<f64>, Vector3<f64>)) -> (PathBuf, Vec<Point2<f64>>) {
    write_pattern(dir, name, PATTERN, pose)
}

pub fn write_pattern(
    dir: &Path,
    name: &str,
    pattern: PatternSize,
    pose: &(Rotation3<f64>, Vector3<f64>),
) -> (PathBuf, Vec<Point2<f64>>) {
    let h = board_homography(&camera_matrix(), &pose.0, &pose.1);
    let rendered = render_chessboard(pattern, &h, WIDTH as usize, HEIGHT as usize);
    let img = image::GrayImage::from_raw(WIDTH, HEIGHT, rendered.data).expect("buffer size");
    let path = dir.join(name);
    img.save(&path).expect("save png");
    (path, project_corners(pattern, &h))
}

/// A 7x8 inner-corner board, centered and fully in frame.
pub fn write_large_board(dir: &Path, name: &str) -> PathBuf {
    let pose = (Rotation3::from_euler_angles(0.1, -0.1, 0.05), Vector3::new(-3.0, -3.5, 20.0));
    write_pattern(dir, name, PatternSize::new(7, 8), &pose).0
}

pub fn write_blank(dir: &Path, name: &str) -> PathBuf {
    let img = image::RgbImage::from_pixel(WIDTH, HEIGHT, image::Rgb([128, 128, 128]));
    let path = dir.join(name);
    img.save(&path).expect("save png");
    path
}
