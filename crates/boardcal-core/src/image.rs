/// Borrowed 8-bit grayscale image, row-major, `data.len() == width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned 8-bit grayscale image, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image filled with a constant value.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

impl GrayImageView<'_> {
    /// Pixel value with coordinates clamped to the image border.
    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> u8 {
        let x = x.clamp(0, self.width as i32 - 1) as usize;
        let y = y.clamp(0, self.height as i32 - 1) as usize;
        self.data[y * self.width + x]
    }
}

/// Bilinear sample at pixel coordinates (pixel centers at integers).
///
/// Coordinates outside the image replicate the border. The view must be
/// non-empty.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = src.get_clamped(x0, y0) as f32;
    let p10 = src.get_clamped(x0 + 1, y0) as f32;
    let p01 = src.get_clamped(x0, y0 + 1) as f32;
    let p11 = src.get_clamped(x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = GrayImage {
            width: 2,
            height: 2,
            data: vec![0, 100, 100, 200],
        };
        let v = img.view();
        assert_eq!(sample_bilinear(&v, 0.0, 0.0), 0.0);
        assert_eq!(sample_bilinear(&v, 0.5, 0.0), 50.0);
        assert_eq!(sample_bilinear(&v, 0.5, 0.5), 100.0);
        assert_eq!(sample_bilinear(&v, 1.0, 1.0), 200.0);
    }

    #[test]
    fn samples_outside_replicate_border() {
        let img = GrayImage {
            width: 2,
            height: 1,
            data: vec![10, 30],
        };
        let v = img.view();
        assert_eq!(sample_bilinear(&v, -3.0, 0.0), 10.0);
        assert_eq!(sample_bilinear(&v, 5.0, 2.0), 30.0);
    }
}
