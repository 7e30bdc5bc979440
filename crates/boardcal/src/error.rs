use std::path::PathBuf;

use thiserror::Error;

use crate::camera::{CalibrationError, CorrespondenceError};
use crate::chessboard::ChessboardError;

/// Errors surfaced by the pipeline and the CLI.
///
/// A board that cannot be found is not an error; it is reported through the
/// detection result instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "image")]
    #[error("failed to load image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[cfg(feature = "image")]
    #[error("failed to save image {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[cfg(feature = "image")]
    #[error("corner detection failed: {0}")]
    Corners(#[from] chess_corners::ChessError),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Chessboard(#[from] ChessboardError),

    #[error(transparent)]
    Correspondence(#[from] CorrespondenceError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error("display failed: {0}")]
    Display(String),
}
