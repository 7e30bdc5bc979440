//! Checkerboard camera calibration.
//!
//! This crate provides:
//! - re-exports of the workspace crates (`core`, `chessboard`, `camera`);
//! - (feature `image`) the ChESS corner adapter, the end-to-end pipeline
//!   (load -> detect -> calibrate -> undistort) and the detection overlay;
//! - (feature `display`) a minimal window showing the result until a key press;
//! - the `boardcal` binary (feature `cli`).
//!
//! ## Quickstart
//!
//! ```no_run
//! use boardcal::pipeline::Pipeline;
//! use boardcal::BoardcalConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(BoardcalConfig::default())?;
//! let outcome = pipeline.run(&["board.png"])?;
//! match &outcome.calibration {
//!     Some(cal) => println!("{}", boardcal::report::format_calibration(&cal.result)),
//!     None => println!("not found"),
//! }
//! # Ok(())
//! # }
//! ```

pub use boardcal_camera as camera;
pub use boardcal_chessboard as chessboard;
pub use boardcal_core as core;

pub use boardcal_camera::{CalibrationOptions, CalibrationResult};
pub use boardcal_chessboard::{ChessboardDetection, ChessboardParams};
pub use boardcal_core::{Corner, GridCoords, LabeledCorner, PatternSize};

mod config;
mod error;
pub mod report;

pub use config::{BoardcalConfig, ChessCornerParams};
pub use error::PipelineError;

#[cfg(feature = "image")]
pub mod detect;
#[cfg(feature = "image")]
pub mod draw;
#[cfg(feature = "image")]
pub mod pipeline;

#[cfg(feature = "display")]
pub mod display;
