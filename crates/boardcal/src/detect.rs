//! `chess-corners` adapter: raw ChESS responses in, ordered board out.

use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor, ThresholdMode};
use log::debug;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::chessboard::{ChessboardDetection, ChessboardDetector, ChessboardParams};
use crate::config::ChessCornerParams;
use crate::core::{Corner, GrayImageView};
use crate::PipelineError;

/// Single-scale ChESS settings built from the config values.
pub fn chess_config(params: &ChessCornerParams) -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.threshold_mode = ThresholdMode::Relative;
    cfg.threshold_value = params.threshold_rel;
    cfg.nms_radius = params.nms_radius;
    cfg
}

pub fn default_chess_config() -> ChessConfig {
    chess_config(&ChessCornerParams::default())
}

/// Borrow an `image::GrayImage` as a `boardcal-core` view.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

fn to_corner(c: &CornerDescriptor) -> Corner {
    Corner {
        position: Point2::new(c.x, c.y),
        strength: c.response,
    }
}

/// ChESS X-junction candidates, unordered.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, cfg), fields(width = img.width(), height = img.height()))
)]
pub fn detect_corners(img: &::image::GrayImage, cfg: &ChessConfig) -> Result<Vec<Corner>, PipelineError> {
    // Non-positive ChESS responses are not X-junctions.
    let corners: Vec<Corner> = find_chess_corners_image(img, cfg)?
        .iter()
        .filter(|c| c.response > 0.0)
        .map(to_corner)
        .collect();
    debug!("chess-corners: {} candidates", corners.len());
    Ok(corners)
}

/// ChESS corners, grid assembly and sub-pixel refinement on one image.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, chess_cfg, detector),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn detect_chessboard(
    img: &::image::GrayImage,
    chess_cfg: &ChessConfig,
    detector: &ChessboardDetector,
) -> Result<ChessboardDetection, PipelineError> {
    let candidates = detect_corners(img, chess_cfg)?;
    Ok(detector.detect(&gray_view(img), &candidates))
}

/// [`detect_chessboard`] with default settings (4x6 board).
pub fn detect_chessboard_default(img: &::image::GrayImage) -> Result<ChessboardDetection, PipelineError> {
    let detector = ChessboardDetector::new(ChessboardParams::default())?;
    detect_chessboard(img, &default_chess_config(), &detector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_borrows_the_buffer() {
        let img = ::image::GrayImage::from_fn(5, 3, |x, y| ::image::Luma([(x + 10 * y) as u8]));
        let view = gray_view(&img);
        assert_eq!((view.width, view.height), (5, 3));
        assert_eq!(view.data[5 + 2], 12);
    }

    #[test]
    fn config_values_reach_the_detector() {
        let cfg = chess_config(&ChessCornerParams {
            threshold_rel: 0.35,
            nms_radius: 4,
        });
        assert_eq!(cfg.threshold_mode, ThresholdMode::Relative);
        assert_eq!(cfg.threshold_value, 0.35);
        assert_eq!(cfg.nms_radius, 4);
    }

    #[test]
    fn uniform_image_has_no_board() {
        let img = ::image::GrayImage::from_pixel(64, 48, ::image::Luma([128]));
        let det = detect_chessboard_default(&img).expect("default params are valid");
        assert!(!det.found);
        assert!(!det.is_complete());
    }
}
