//! End-to-end flow: load -> detect -> calibrate -> undistort.
//!
//! Every image is decoded twice, once as grayscale for detection and once as
//! color for the overlay and the undistorted output. All images with a
//! complete board contribute one view to the calibration; the first of them
//! is the one that gets annotated and undistorted.

use std::path::{Path, PathBuf};

use ::image::{GrayImage, RgbImage};
use chess_corners::ChessConfig;
use log::{info, warn};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::camera::{build_correspondences, calibrate_camera, undistort_image, CalibrationResult};
use crate::chessboard::{ChessboardDetection, ChessboardDetector};
use crate::config::BoardcalConfig;
use crate::detect::{chess_config, detect_chessboard};
use crate::draw::draw_chessboard_corners;
use crate::report::{CalibrationReport, ImageReport, RunReport};
use crate::PipelineError;

/// One image, decoded as grayscale and as color.
pub struct LoadedImage {
    pub path: PathBuf,
    pub gray: GrayImage,
    pub color: RgbImage,
}

impl LoadedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }
}

fn open(path: &Path) -> Result<::image::DynamicImage, PipelineError> {
    ::image::open(path).map_err(|source| PipelineError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `path` twice: grayscale for detection, RGB for display.
pub fn load_image(path: &Path) -> Result<LoadedImage, PipelineError> {
    let gray = open(path)?.to_luma8();
    let color = open(path)?.to_rgb8();
    Ok(LoadedImage {
        path: path.to_path_buf(),
        gray,
        color,
    })
}

/// Detection result for one input image.
#[derive(Clone, Debug)]
pub struct ViewOutcome {
    pub path: PathBuf,
    pub detection: ChessboardDetection,
}

impl ViewOutcome {
    /// A complete board: usable as a calibration view.
    pub fn found(&self) -> bool {
        self.detection.is_complete()
    }
}

/// Calibration plus the images derived from the first usable view.
pub struct Calibrated {
    pub result: CalibrationResult,
    /// Image the overlay and the undistortion were applied to.
    pub source: PathBuf,
    pub annotated: RgbImage,
    pub undistorted: RgbImage,
}

pub struct PipelineOutcome {
    pub views: Vec<ViewOutcome>,
    /// `None` when no image contained the full board.
    pub calibration: Option<Calibrated>,
}

impl PipelineOutcome {
    pub fn report(&self) -> RunReport {
        RunReport {
            images: self
                .views
                .iter()
                .map(|v| {
                    ImageReport::new(
                        v.path.display().to_string(),
                        v.found(),
                        &v.detection.image_points(),
                    )
                })
                .collect(),
            calibration: self.calibration.as_ref().map(|c| CalibrationReport::from(&c.result)),
        }
    }
}

pub struct Pipeline {
    config: BoardcalConfig,
    chess_cfg: ChessConfig,
    detector: ChessboardDetector,
}

impl Pipeline {
    pub fn new(config: BoardcalConfig) -> Result<Self, PipelineError> {
        let detector = ChessboardDetector::new(config.chessboard.clone())?;
        let chess_cfg = chess_config(&config.chess);
        Ok(Self {
            config,
            chess_cfg,
            detector,
        })
    }

    pub fn detect(&self, image: &LoadedImage) -> Result<ChessboardDetection, PipelineError> {
        detect_chessboard(&image.gray, &self.chess_cfg, &self.detector)
    }

    /// Run detection on every image and calibrate from the complete boards.
    ///
    /// Views whose size differs from the first usable view are reported but
    /// left out of the calibration.
    pub fn run<P: AsRef<Path>>(&self, paths: &[P]) -> Result<PipelineOutcome, PipelineError> {
        self.run_with(paths, |_| {})
    }

    /// [`Pipeline::run`], calling `on_view` as soon as each image is detected.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, paths, on_view), fields(num_images = paths.len()))
    )]
    pub fn run_with<P, F>(&self, paths: &[P], mut on_view: F) -> Result<PipelineOutcome, PipelineError>
    where
        P: AsRef<Path>,
        F: FnMut(&ViewOutcome),
    {
        let pattern = self.config.chessboard.pattern;
        let mut views = Vec::with_capacity(paths.len());
        let mut correspondences = Vec::new();
        let mut first: Option<(LoadedImage, ChessboardDetection)> = None;

        for path in paths {
            let image = load_image(path.as_ref())?;
            let detection = self.detect(&image)?;
            let outcome = ViewOutcome {
                path: image.path.clone(),
                detection,
            };

            if outcome.found() {
                let size_ok = first
                    .as_ref()
                    .is_none_or(|(f, _)| f.dimensions() == image.dimensions());
                if size_ok {
                    info!("{}: board found", image.path.display());
                    correspondences.push(build_correspondences(&outcome.detection.image_points(), pattern)?);
                    if first.is_none() {
                        first = Some((image, outcome.detection.clone()));
                    }
                } else {
                    warn!(
                        "{}: image size {:?} differs from the first view, skipped",
                        image.path.display(),
                        image.dimensions()
                    );
                }
            } else {
                info!(
                    "{}: board not found ({} of {} corners)",
                    image.path.display(),
                    outcome.detection.corners.len(),
                    pattern.corner_count()
                );
            }
            on_view(&outcome);
            views.push(outcome);
        }

        let Some((image, detection)) = first else {
            return Ok(PipelineOutcome {
                views,
                calibration: None,
            });
        };

        let result = calibrate_camera(&correspondences, image.dimensions(), &self.config.calibration)?;
        info!(
            "calibrated from {} view(s), rms {:.4} px",
            correspondences.len(),
            result.rms
        );

        let mut annotated = image.color;
        draw_chessboard_corners(&mut annotated, pattern, &detection.image_points(), detection.found);
        let undistorted = undistort_image(&annotated, &result.intrinsics, &result.distortion)?;

        Ok(PipelineOutcome {
            views,
            calibration: Some(Calibrated {
                result,
                source: image.path,
                annotated,
                undistorted,
            }),
        })
    }
}

/// Save an RGB image, format picked from the extension.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<(), PipelineError> {
    img.save(path).map_err(|source| PipelineError::Save {
        path: path.to_path_buf(),
        source,
    })
}
