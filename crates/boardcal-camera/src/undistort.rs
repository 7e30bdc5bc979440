//! Lens undistortion by inverse mapping.
//!
//! Every output pixel is taken through `K^-1`, distorted, projected with `K`
//! and the source is sampled bilinearly there. The output camera matrix equals
//! the input one, so the output has the same size and focal lengths. Samples
//! outside the source are black.

use image::{ImageBuffer, Pixel};
use nalgebra::{Point2, Vector2};
use rayon::prelude::*;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::model::{BrownConrady5, CameraIntrinsics};
use crate::CalibrationError;

/// Per-pixel source coordinates for an undistorted output image.
#[derive(Clone, Debug)]
pub struct UndistortMap {
    pub width: u32,
    pub height: u32,
    pub map_x: Vec<f32>,
    pub map_y: Vec<f32>,
}

impl UndistortMap {
    pub fn new(
        intrinsics: &CameraIntrinsics,
        distortion: &BrownConrady5,
        width: u32,
        height: u32,
    ) -> Result<Self, CalibrationError> {
        if width == 0 || height == 0 {
            return Err(CalibrationError::InvalidImageSize { width, height });
        }
        let len = width as usize * height as usize;
        let mut map_x = vec![0.0f32; len];
        let mut map_y = vec![0.0f32; len];

        map_x
            .par_chunks_mut(width as usize)
            .zip(map_y.par_chunks_mut(width as usize))
            .enumerate()
            .for_each(|(y, (row_x, row_y))| {
                for (x, (mx, my)) in row_x.iter_mut().zip(row_y.iter_mut()).enumerate() {
                    let n = intrinsics.pixel_to_normalized(Point2::new(x as f64, y as f64));
                    let src = intrinsics.normalized_to_pixel(distortion.distort(n));
                    *mx = src.x as f32;
                    *my = src.y as f32;
                }
            });

        Ok(Self {
            width,
            height,
            map_x,
            map_y,
        })
    }

    /// Source position for output pixel `(x, y)`.
    pub fn source(&self, x: u32, y: u32) -> Vector2<f32> {
        let i = y as usize * self.width as usize + x as usize;
        Vector2::new(self.map_x[i], self.map_y[i])
    }

    /// Resample `src` through the map. `src` must have the map's dimensions.
    pub fn remap<P>(&self, src: &ImageBuffer<P, Vec<u8>>) -> Result<ImageBuffer<P, Vec<u8>>, CalibrationError>
    where
        P: Pixel<Subpixel = u8> + Send + Sync,
    {
        let (w, h) = src.dimensions();
        if (w, h) != (self.width, self.height) {
            return Err(CalibrationError::InvalidImageSize { width: w, height: h });
        }
        let channels = P::CHANNEL_COUNT as usize;
        let row_len = w as usize * channels;
        let raw = src.as_raw();

        let mut out = ImageBuffer::<P, Vec<u8>>::new(w, h);
        out.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
            for x in 0..w as usize {
                let i = y * w as usize + x;
                let (sx, sy) = (self.map_x[i], self.map_y[i]);
                let px = &mut row[x * channels..(x + 1) * channels];
                sample_bilinear_zero(raw, w as usize, h as usize, channels, sx, sy, px);
            }
        });
        Ok(out)
    }
}

/// Bilinear sample with a constant black border; out-of-image taps read as 0.
fn sample_bilinear_zero(
    raw: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    x: f32,
    y: f32,
    out: &mut [u8],
) {
    if !(x > -1.0 && y > -1.0 && x < width as f32 && y < height as f32) {
        return;
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];
    for (c, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for &(tx, ty, w) in &taps {
            if tx >= 0 && ty >= 0 && (tx as usize) < width && (ty as usize) < height {
                acc += w * raw[(ty as usize * width + tx as usize) * channels + c] as f32;
            }
        }
        *o = acc.round().clamp(0.0, 255.0) as u8;
    }
}

/// Undistort an 8-bit image with its own camera matrix as the output camera.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(src, intrinsics, distortion), fields(width = src.width(), height = src.height()))
)]
pub fn undistort_image<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    intrinsics: &CameraIntrinsics,
    distortion: &BrownConrady5,
) -> Result<ImageBuffer<P, Vec<u8>>, CalibrationError>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let (w, h) = src.dimensions();
    UndistortMap::new(intrinsics, distortion, w, h)?.remap(src)
}
