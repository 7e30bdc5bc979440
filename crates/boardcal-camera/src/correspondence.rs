use boardcal_core::PatternSize;
use nalgebra::{Point2, Point3};

use crate::CorrespondenceError;

/// Board coordinate of corner `index` for a pattern with `width` corners per
/// row: `(index / width, index % width, 0)`, in squares.
pub fn object_point(index: usize, width: usize) -> Point3<f64> {
    Point3::new((index / width) as f64, (index % width) as f64, 0.0)
}

/// Object/image point pairs of a single view.
#[derive(Clone, Debug, Default)]
pub struct ViewCorrespondences {
    pub object_points: Vec<Point3<f64>>,
    pub image_points: Vec<Point2<f64>>,
}

impl ViewCorrespondences {
    pub fn len(&self) -> usize {
        self.image_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_points.is_empty()
    }
}

/// Pair row-major detected corners with their board coordinates.
pub fn build_correspondences(
    corners: &[Point2<f32>],
    pattern: PatternSize,
) -> Result<ViewCorrespondences, CorrespondenceError> {
    if pattern.width == 0 {
        return Err(CorrespondenceError::ZeroWidth);
    }
    let expected = pattern.corner_count();
    if corners.len() != expected {
        return Err(CorrespondenceError::CornerCount {
            expected,
            got: corners.len(),
        });
    }

    let object_points = (0..corners.len())
        .map(|i| object_point(i, pattern.width))
        .collect();
    let image_points = corners
        .iter()
        .map(|p| Point2::new(p.x as f64, p.y as f64))
        .collect();

    Ok(ViewCorrespondences {
        object_points,
        image_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_mapping_for_four_wide_board() {
        assert_eq!(object_point(0, 4), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(object_point(3, 4), Point3::new(0.0, 3.0, 0.0));
        assert_eq!(object_point(4, 4), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(object_point(23, 4), Point3::new(5.0, 3.0, 0.0));
    }

    #[test]
    fn builds_parallel_sequences() {
        let pattern = PatternSize::new(4, 6);
        let corners: Vec<Point2<f32>> = (0..24).map(|k| Point2::new(k as f32, 2.0 * k as f32)).collect();
        let view = build_correspondences(&corners, pattern).expect("24 corners");
        assert_eq!(view.len(), 24);
        assert_eq!(view.object_points.len(), view.image_points.len());
        assert_eq!(view.image_points[7], Point2::new(7.0, 14.0));
        assert_eq!(view.object_points[7], Point3::new(1.0, 3.0, 0.0));
    }

    #[test]
    fn wrong_count_is_rejected() {
        let corners = vec![Point2::new(0.0f32, 0.0); 23];
        assert_eq!(
            build_correspondences(&corners, PatternSize::new(4, 6)).unwrap_err(),
            CorrespondenceError::CornerCount {
                expected: 24,
                got: 23
            }
        );
    }
}
