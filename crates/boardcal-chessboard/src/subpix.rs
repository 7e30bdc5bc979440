//! Sub-pixel corner refinement.
//!
//! For a true corner `c`, every point `q` near it satisfies
//! `∇I(q) · (q - c) = 0`: either the gradient vanishes (flat region) or `q`
//! lies on an edge through `c`. Stacking these constraints over a window
//! gives the normal equations `(Σ G) c = Σ G q` with `G = ∇I ∇Iᵀ`, solved
//! repeatedly with the window re-centred on the latest estimate.

use boardcal_core::{sample_bilinear, GrayImageView};
use nalgebra::{Matrix2, Point2, Vector2};

use crate::params::SubPixParams;

fn gradient(img: &GrayImageView<'_>, x: f32, y: f32) -> Vector2<f32> {
    let gx = 0.5 * (sample_bilinear(img, x + 1.0, y) - sample_bilinear(img, x - 1.0, y));
    let gy = 0.5 * (sample_bilinear(img, x, y + 1.0) - sample_bilinear(img, x, y - 1.0));
    Vector2::new(gx, gy)
}

/// Refine a single corner. The initial estimate is returned unchanged when the
/// system is degenerate or the iteration wanders outside the search window.
pub fn refine_corner(img: &GrayImageView<'_>, initial: Point2<f32>, params: &SubPixParams) -> Point2<f32> {
    let hw = params.half_window as i32;
    let inv_hw_sq = 1.0 / (params.half_window as f32).powi(2);
    let eps_sq = params.epsilon * params.epsilon;

    let mut current = initial;
    for _ in 0..params.max_iters.max(1) {
        let mut a = Matrix2::<f32>::zeros();
        let mut b = Vector2::<f32>::zeros();

        for dy in -hw..=hw {
            for dx in -hw..=hw {
                let (fx, fy) = (dx as f32, dy as f32);
                let weight = (-(fx * fx + fy * fy) * inv_hw_sq).exp();
                let q = Vector2::new(current.x + fx, current.y + fy);
                let g = gradient(img, q.x, q.y);
                let gg = g * g.transpose() * weight;
                a += gg;
                b += gg * q;
            }
        }

        let Some(a_inv) = a.try_inverse() else {
            return initial;
        };
        let next = a_inv * b;
        let next = Point2::new(next.x, next.y);
        let step_sq = (next - current).norm_squared();
        current = next;
        if step_sq <= eps_sq {
            break;
        }
    }

    let drift = current - initial;
    if !current.x.is_finite()
        || !current.y.is_finite()
        || drift.x.abs() > hw as f32
        || drift.y.abs() > hw as f32
    {
        return initial;
    }
    current
}

pub fn refine_corners(img: &GrayImageView<'_>, points: &mut [Point2<f32>], params: &SubPixParams) {
    for p in points.iter_mut() {
        *p = refine_corner(img, *p, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardcal_core::synthetic::{board_homography, project_corners, render_chessboard};
    use boardcal_core::PatternSize;
    use nalgebra::{Matrix3, Rotation3, Vector3};

    #[test]
    fn converges_to_synthetic_corner() {
        let pattern = PatternSize::new(4, 6);
        let k = Matrix3::new(600.0, 0.0, 160.0, 0.0, 600.0, 120.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.1, -0.15, 0.2);
        let h = board_homography(&k, &rot, &Vector3::new(-1.5, -2.5, 20.0));
        let img = render_chessboard(pattern, &h, 320, 240);
        let truth = project_corners(pattern, &h);

        let params = SubPixParams::default();
        for t in truth.iter().take(8) {
            let truth = Point2::new(t.x as f32, t.y as f32);
            let start = truth + Vector2::new(1.2, -0.9);
            let refined = refine_corner(&img.view(), start, &params);
            let err = (refined - truth).norm();
            assert!(err < 0.3, "refined {refined:?} vs {truth:?} (err {err})");
        }
    }

    #[test]
    fn flat_region_keeps_initial_estimate() {
        let img = boardcal_core::GrayImage::filled(40, 40, 128);
        let start = Point2::new(20.3, 19.7);
        let refined = refine_corner(&img.view(), start, &SubPixParams::default());
        assert_eq!(refined, start);
    }
}
