//! Camera model and planar calibration.
//!
//! - [`CameraIntrinsics`] / [`BrownConrady5`]: pinhole + 5-coefficient lens model.
//! - [`build_correspondences`]: row-major board corners -> object/image pairs.
//! - [`calibrate_camera`]: closed-form initialization followed by
//!   Levenberg-Marquardt refinement of the reprojection error.
//! - [`undistort_image`]: remap an image through the estimated lens model.

mod calibrate;
mod correspondence;
mod error;
mod init;
pub mod lm;
mod model;
mod undistort;

pub use calibrate::{calibrate_camera, CalibrationOptions, CalibrationResult, MIN_VIEWS_FULL_MODEL};
pub use correspondence::{build_correspondences, object_point, ViewCorrespondences};
pub use error::{CalibrationError, CorrespondenceError};
pub use init::{board_homographies, init_intrinsics, pose_from_homography, InitMethod};
pub use model::{project_point, BrownConrady5, CameraIntrinsics, Pose};
pub use undistort::{undistort_image, UndistortMap};
