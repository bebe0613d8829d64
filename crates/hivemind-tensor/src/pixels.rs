//! Validated RGBA pixel buffer.

use image::{DynamicImage, Rgba, RgbaImage};

use crate::errors::{Result, TensorError};

/// Bytes per pixel in a [`PixelBuffer`].
pub const RGBA_CHANNELS: usize = 4;

/// A dense row-major RGBA buffer, 8 bits per channel.
///
/// Invariant: `data.len() == width * height * 4`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking the length against the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = rgba_len(width, height)?;
        if data.len() != expected {
            return Err(TensorError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let pixels = rgba_len(width, height)? / RGBA_CHANNELS;
        Self::new(width, height, rgba.repeat(pixels))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.data.len() / RGBA_CHANNELS
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The RGBA value at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS;
        let px = self.data.get(offset..offset + RGBA_CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Iterate pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(RGBA_CHANNELS)
    }
}

fn rgba_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(RGBA_CHANNELS))
        .ok_or_else(|| TensorError::Shape(format!("{width}x{height} image is too large")))
}

impl From<RgbaImage> for PixelBuffer {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

impl From<&DynamicImage> for PixelBuffer {
    fn from(img: &DynamicImage) -> Self {
        Self::from(img.to_rgba8())
    }
}

impl From<&PixelBuffer> for RgbaImage {
    fn from(buf: &PixelBuffer) -> Self {
        RgbaImage::from_fn(buf.width, buf.height, |x, y| {
            Rgba(buf.pixel(x, y).unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn new_accepts_exact_length() {
        let buf = PixelBuffer::new(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(buf.width(), 2);
        assert_eq!(buf.height(), 1);
        assert_eq!(buf.pixel_count(), 2);
    }

    #[test]
    fn new_rejects_rgb_length() {
        let err = PixelBuffer::new(2, 2, vec![0; 12]).unwrap_err();
        assert_matches!(
            err,
            TensorError::BufferSize {
                expected: 16,
                actual: 12
            }
        );
    }

    #[test]
    fn empty_image_is_valid() {
        let buf = PixelBuffer::new(0, 5, Vec::new()).unwrap();
        assert_eq!(buf.pixel_count(), 0);
    }

    #[test]
    fn pixel_lookup_is_row_major() {
        let buf = PixelBuffer::new(
            2,
            2,
            vec![
                1, 1, 1, 1, 2, 2, 2, 2, //
                3, 3, 3, 3, 4, 4, 4, 4,
            ],
        )
        .unwrap();
        assert_eq!(buf.pixel(1, 0), Some([2, 2, 2, 2]));
        assert_eq!(buf.pixel(0, 1), Some([3, 3, 3, 3]));
        assert_eq!(buf.pixel(2, 0), None);
        assert_eq!(buf.pixel(0, 2), None);
    }

    #[test]
    fn filled_repeats_pixel() {
        let buf = PixelBuffer::filled(3, 2, [9, 8, 7, 6]).unwrap();
        assert_eq!(buf.as_bytes().len(), 24);
        assert!(buf.pixels().all(|px| px == [9, 8, 7, 6]));
    }

    #[test]
    fn image_conversion_preserves_pixels() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(2, 1, Rgba([10, 20, 30, 40]));
        let buf = PixelBuffer::from(img.clone());
        assert_eq!(buf.pixel(2, 1), Some([10, 20, 30, 40]));

        let back = RgbaImage::from(&buf);
        assert_eq!(back, img);
    }

    #[test]
    fn dynamic_rgb_image_gets_opaque_alpha() {
        let rgb = image::RgbImage::from_pixel(1, 1, image::Rgb([1, 2, 3]));
        let buf = PixelBuffer::from(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(buf.pixel(0, 0), Some([1, 2, 3, 255]));
    }
}
