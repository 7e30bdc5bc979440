use thiserror::Error;

/// Failures while turning detections into object/image point pairs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrespondenceError {
    #[error("expected {expected} corners, got {got}")]
    CornerCount { expected: usize, got: usize },
    #[error("pattern width must be positive")]
    ZeroWidth,
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("no views to calibrate from")]
    NoViews,
    #[error("view {view}: {object} object points vs {image} image points")]
    MismatchedPoints {
        view: usize,
        object: usize,
        image: usize,
    },
    #[error("view {view}: need at least 4 correspondences, got {got}")]
    NotEnoughPoints { view: usize, got: usize },
    #[error("image size must be non-zero, got {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("view {view}: homography estimation failed")]
    Homography { view: usize },
    #[error("degenerate intrinsics initialization: {0}")]
    DegenerateIntrinsics(&'static str),
    #[error("calibration produced non-finite parameters")]
    NonFinite,
}
