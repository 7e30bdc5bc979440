use std::f32::consts::FRAC_PI_2;

use nalgebra::Vector2;

/// Dominant direction of a set of grid edges, modulo π/2.
///
/// A square grid looks the same after a 90° turn, so edge angles are mapped
/// to quadruple-angle space (θ ≡ θ + π/2), averaged there and mapped back.
/// Returns an angle in `(-π/4, π/4]`, or `None` when no direction dominates.
pub fn grid_axis_angle<I>(edges: I) -> Option<f32>
where
    I: IntoIterator<Item = Vector2<f32>>,
{
    let mut sum = Vector2::<f32>::zeros();
    let mut count = 0usize;
    for e in edges {
        if e.norm_squared() <= f32::EPSILON {
            continue;
        }
        let four_theta = 4.0 * e.y.atan2(e.x);
        sum += Vector2::new(four_theta.cos(), four_theta.sin());
        count += 1;
    }
    if count == 0 {
        return None;
    }

    let mean = sum / count as f32;
    if mean.norm_squared() < 1e-4 {
        return None;
    }
    Some(0.25 * mean.y.atan2(mean.x))
}

/// Express `v` in a frame rotated by `angle`.
#[inline]
pub fn rotate_into_frame(v: Vector2<f32>, angle: f32) -> Vector2<f32> {
    let (s, c) = angle.sin_cos();
    Vector2::new(c * v.x + s * v.y, -s * v.x + c * v.y)
}

/// Angle between `v` and the closest of the frame axes, in `[0, π/4]`.
pub fn off_axis_angle(v: Vector2<f32>) -> f32 {
    let a = v.y.atan2(v.x).rem_euclid(FRAC_PI_2);
    a.min(FRAC_PI_2 - a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn axis_angle_is_invariant_to_quarter_turns() {
        let theta = 0.3f32;
        let edges = (0..4).map(|k| {
            let a = theta + k as f32 * FRAC_PI_2;
            Vector2::new(a.cos(), a.sin()) * 10.0
        });
        let est = grid_axis_angle(edges).expect("dominant");
        assert_abs_diff_eq!(est, theta, epsilon = 1e-5);
    }

    #[test]
    fn diagonal_mix_has_no_dominant_axis() {
        let edges = [Vector2::new(1.0, 0.0), Vector2::new(1.0, 1.0)];
        assert!(grid_axis_angle(edges).is_none());
    }

    #[test]
    fn rotation_and_off_axis() {
        let v = Vector2::new(1.0f32, 1.0);
        let r = rotate_into_frame(v, std::f32::consts::FRAC_PI_4);
        assert_abs_diff_eq!(r.x, 2f32.sqrt(), epsilon = 1e-5);
        assert_abs_diff_eq!(r.y, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(off_axis_angle(v), std::f32::consts::FRAC_PI_4, epsilon = 1e-5);
        assert_abs_diff_eq!(off_axis_angle(Vector2::new(0.0, -3.0)), 0.0, epsilon = 1e-5);
    }
}
