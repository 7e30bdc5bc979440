//! Detection overlay on color images.

use ::image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use nalgebra::Point2;

use crate::core::PatternSize;

/// Row colors of a found board, cycled.
const ROW_COLORS: [Rgb<u8>; 6] = [
    Rgb([255, 0, 0]),
    Rgb([255, 128, 0]),
    Rgb([200, 200, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 200, 255]),
    Rgb([255, 0, 255]),
];

const NOT_FOUND_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const CORNER_RADIUS: i32 = 4;

fn draw_corner(img: &mut RgbImage, c: Point2<f32>, color: Rgb<u8>) {
    draw_hollow_circle_mut(img, (c.x.round() as i32, c.y.round() as i32), CORNER_RADIUS, color);
}

/// Mark detected corners. A found board gets one color per row and a
/// polyline through all corners in order; otherwise plain red circles.
pub fn draw_chessboard_corners(img: &mut RgbImage, pattern: PatternSize, corners: &[Point2<f32>], found: bool) {
    if !found || corners.len() != pattern.corner_count() {
        for &c in corners {
            draw_corner(img, c, NOT_FOUND_COLOR);
        }
        return;
    }

    let mut prev: Option<Point2<f32>> = None;
    for (k, &c) in corners.iter().enumerate() {
        let color = ROW_COLORS[(k / pattern.width) % ROW_COLORS.len()];
        if let Some(p) = prev {
            draw_line_segment_mut(img, (p.x, p.y), (c.x, c.y), color);
        }
        draw_corner(img, c, color);
        prev = Some(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_board_marks_corners_in_red() {
        let mut img = RgbImage::new(10, 10);
        let corners = [Point2::new(0.0, 0.0), Point2::new(9.0, 5.0)];
        draw_chessboard_corners(&mut img, PatternSize::new(4, 6), &corners, false);
        assert_eq!(*img.get_pixel(5, 5), NOT_FOUND_COLOR);
        assert_eq!(*img.get_pixel(4, 0), NOT_FOUND_COLOR);
    }

    #[test]
    fn short_corner_list_is_drawn_as_not_found() {
        let corners: Vec<Point2<f32>> = (0..23).map(|k| Point2::new(10.0 + 10.0 * k as f32, 20.0)).collect();
        let mut img = RgbImage::new(260, 40);
        draw_chessboard_corners(&mut img, PatternSize::new(4, 6), &corners, true);
        // No polyline between the first two corners.
        assert_eq!(*img.get_pixel(15, 20), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(14, 20), NOT_FOUND_COLOR);
    }

    #[test]
    fn found_board_rows_use_distinct_colors() {
        let pattern = PatternSize::new(4, 6);
        let corners: Vec<Point2<f32>> = (0..24)
            .map(|k| Point2::new(20.0 + 20.0 * (k % 4) as f32, 20.0 + 20.0 * (k / 4) as f32))
            .collect();
        let mut img = RgbImage::new(120, 150);
        draw_chessboard_corners(&mut img, pattern, &corners, true);
        // Right-most point of the first and second row circles.
        assert_eq!(*img.get_pixel(24, 20), ROW_COLORS[0]);
        assert_eq!(*img.get_pixel(24, 40), ROW_COLORS[1]);
    }
}
