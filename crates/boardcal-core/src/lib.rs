//! Core types and geometry for checkerboard camera calibration.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete corner detector or image decoding crate; callers
//! adapt their detector output into [`Corner`] and their pixels into
//! [`GrayImageView`].

mod corner;
mod grid_alignment;
mod homography;
mod image;
mod logger;
mod pattern;
pub mod synthetic;

pub use corner::{Corner, GridCoords, LabeledCorner};
pub use grid_alignment::{GridAlignment, GridTransform, GRID_TRANSFORMS_D4};
pub use homography::{estimate_homography, Homography};
pub use image::{sample_bilinear, GrayImage, GrayImageView};
pub use pattern::PatternSize;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
