//! Synthetic checkerboard rendering.
//!
//! Used by tests and demos to produce images with exactly known corner
//! positions. The board plane uses `(u, v)` coordinates in squares: the inner
//! corner at column `c`, row `r` sits at `(c, r)`, and the squares cover
//! `[-1, width] x [-1, height]`.

use nalgebra::{Matrix3, Point2, Rotation3, Vector3};

use crate::{GrayImage, Homography, PatternSize};

/// Rendering style for [`render_chessboard_with`].
#[derive(Clone, Copy, Debug)]
pub struct BoardStyle {
    pub dark: u8,
    pub light: u8,
    /// Value outside the board.
    pub background: u8,
    /// Subsamples per pixel along each axis (anti-aliasing).
    pub supersample: u32,
}

impl Default for BoardStyle {
    fn default() -> Self {
        Self {
            dark: 20,
            light: 235,
            background: 235,
            supersample: 3,
        }
    }
}

/// Homography board plane -> pixels for a pinhole camera `K [R | t]`.
pub fn board_homography(
    k: &Matrix3<f64>,
    rotation: &Rotation3<f64>,
    translation: &Vector3<f64>,
) -> Homography {
    let r = rotation.matrix();
    let rt = Matrix3::from_columns(&[r.column(0).into_owned(), r.column(1).into_owned(), *translation]);
    Homography::new(k * rt)
}

/// Ground-truth inner corner positions, row-major.
pub fn project_corners(pattern: PatternSize, h_img_from_board: &Homography) -> Vec<Point2<f64>> {
    (0..pattern.height)
        .flat_map(|r| (0..pattern.width).map(move |c| Point2::new(c as f64, r as f64)))
        .map(|p| h_img_from_board.apply(p))
        .collect()
}

pub fn render_chessboard(
    pattern: PatternSize,
    h_img_from_board: &Homography,
    width: usize,
    height: usize,
) -> GrayImage {
    render_chessboard_with(pattern, h_img_from_board, width, height, BoardStyle::default())
}

/// Render the board by inverse-mapping every subsample into the board plane.
///
/// Returns a uniform background image when `h_img_from_board` is singular.
pub fn render_chessboard_with(
    pattern: PatternSize,
    h_img_from_board: &Homography,
    width: usize,
    height: usize,
    style: BoardStyle,
) -> GrayImage {
    let Some(h_board_from_img) = h_img_from_board.inverse() else {
        return GrayImage::filled(width, height, style.background);
    };

    let ss = style.supersample.max(1);
    let step = 1.0 / ss as f64;
    let (u_max, v_max) = (pattern.width as f64, pattern.height as f64);

    let shade = |u: f64, v: f64| -> f64 {
        if !(-1.0..=u_max).contains(&u) || !(-1.0..=v_max).contains(&v) {
            return style.background as f64;
        }
        let parity = (u.floor() as i64 + v.floor() as i64).rem_euclid(2);
        if parity == 0 {
            style.dark as f64
        } else {
            style.light as f64
        }
    };

    let mut data = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for sy in 0..ss {
                for sx in 0..ss {
                    let px = x as f64 + (sx as f64 + 0.5) * step - 0.5;
                    let py = y as f64 + (sy as f64 + 0.5) * step - 0.5;
                    let b = h_board_from_img.apply(Point2::new(px, py));
                    acc += shade(b.x, b.y);
                }
            }
            data[y * width + x] = (acc / (ss * ss) as f64).round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fronto_parallel_board_has_expected_squares() {
        // 40 px squares, corner (0, 0) at pixel (100, 80).
        let h = Homography::new(Matrix3::new(40.0, 0.0, 100.0, 0.0, 40.0, 80.0, 0.0, 0.0, 1.0));
        let img = render_chessboard(PatternSize::default(), &h, 320, 360);

        // Centre of the first square (u, v) = (-0.5, -0.5) is dark.
        assert_eq!(img.get(80, 60), 20);
        // Its right neighbour is light.
        assert_eq!(img.get(120, 60), 235);
        // Far outside the board is background.
        assert_eq!(img.get(5, 5), 235);
    }

    #[test]
    fn projected_corners_are_row_major() {
        let h = Homography::new(Matrix3::identity());
        let pts = project_corners(PatternSize::default(), &h);
        assert_eq!(pts.len(), 24);
        assert_eq!(pts[4], Point2::new(0.0, 1.0));
        assert_eq!(pts[23], Point2::new(3.0, 5.0));
    }
}
