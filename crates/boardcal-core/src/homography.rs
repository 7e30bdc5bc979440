use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

/// Planar projective map `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v.x / v.z, v.y / v.z)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Scale so that `h[(2, 2)] == 1`; `None` when that entry vanishes.
    fn normalized(h: Matrix3<f64>) -> Option<Self> {
        let s = h[(2, 2)];
        (s.is_finite() && s.abs() > 1e-12).then(|| Self::new(h / s))
    }
}

/// Similarity moving the centroid to the origin with mean distance `sqrt(2)`.
fn conditioning(pts: &[Point2<f64>]) -> Matrix3<f64> {
    let n = pts.len() as f64;
    let c = pts.iter().fold(Vector3::<f64>::zeros(), |acc, p| acc + Vector3::new(p.x, p.y, 0.0)) / n;
    let mean = pts
        .iter()
        .map(|p| ((p.x - c.x).powi(2) + (p.y - c.y).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean > 1e-12 { std::f64::consts::SQRT_2 / mean } else { 1.0 };
    Matrix3::new(s, 0.0, -s * c.x, 0.0, s, -s * c.y, 0.0, 0.0, 1.0)
}

fn transform(t: &Matrix3<f64>, p: &Point2<f64>) -> Point2<f64> {
    let v = t * Vector3::new(p.x, p.y, 1.0);
    Point2::new(v.x, v.y)
}

/// Estimate `H` such that `dst ~ H * src` from N >= 4 correspondences
/// (normalized DLT).
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    let t_src = conditioning(src);
    let t_dst = conditioning(dst);

    let mut a = DMatrix::<f64>::zeros(2 * src.len(), 9);
    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        let p = transform(&t_src, s);
        let q = transform(&t_dst, d);
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);

        a.row_mut(2 * k)
            .copy_from_slice(&[-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]);
        a.row_mut(2 * k + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]);
    }

    // The null vector of A is the eigenvector of A^T A with the smallest
    // eigenvalue; A^T A stays 9x9 even for exactly four points.
    let ata = a.transpose() * &a;
    let eig = ata.symmetric_eigen();
    let (min_idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|l, r| l.1.total_cmp(r.1))?;
    let h = eig.eigenvectors.column(min_idx);
    let hn = Matrix3::from_row_iterator(h.iter().copied());

    let h = t_dst.try_inverse()? * hn * t_src;
    Homography::normalized(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        assert!(
            (a - b).norm() < tol,
            "expected ({:.6}, {:.6}) ~ ({:.6}, {:.6})",
            a.x,
            a.y,
            b.x,
            b.y
        );
    }

    fn board_to_image() -> Homography {
        Homography::new(Matrix3::new(
            42.0, 6.0, 210.0, //
            -3.0, 39.0, 120.0, //
            0.004, -0.002, 1.0,
        ))
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = board_to_image();
        let inv = h.inverse().expect("invertible");
        for p in [Point2::new(0.0, 0.0), Point2::new(3.0, 5.0), Point2::new(-1.0, 6.0)] {
            assert_close(inv.apply(h.apply(p)), p, 1e-9);
        }
    }

    #[test]
    fn four_points_are_enough() {
        let gt = board_to_image();
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 5.0),
            Point2::new(0.0, 5.0),
        ];
        let dst = src.map(|p| gt.apply(p));

        let est = estimate_homography(&src, &dst).expect("estimate");
        for p in [Point2::new(1.0, 1.0), Point2::new(2.5, 4.0)] {
            assert_close(est.apply(p), gt.apply(p), 1e-6);
        }
    }

    #[test]
    fn dlt_recovers_board_homography() {
        let gt = board_to_image();
        let src: Vec<Point2<f64>> = (0..6)
            .flat_map(|r| (0..4).map(move |c| Point2::new(c as f64, r as f64)))
            .collect();
        let dst: Vec<Point2<f64>> = src.iter().map(|&p| gt.apply(p)).collect();

        let est = estimate_homography(&src, &dst).expect("estimate");
        assert!((est.h - gt.h).norm() < 1e-6);
    }

    #[test]
    fn mismatched_input_lengths_fail() {
        let src = [Point2::new(0.0, 0.0); 5];
        let dst = [Point2::new(1.0, 1.0); 4];
        assert!(estimate_homography(&src, &dst).is_none());
    }
}
