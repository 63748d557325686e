#![forbid(unsafe_code)]

//! RGBA pixel buffers.
//!
//! A [`PixelBuffer`] is a row-major, channel-interleaved grid of 8-bit RGBA
//! pixels. It is what the host surface hands back from a pixel read and what
//! the noise engine mutates before it is written back.

use std::fmt;

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Byte offset of the alpha channel within a pixel.
pub const ALPHA: usize = 3;

/// Rejected buffer construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelBufferError {
    /// Byte length does not equal `width * height * 4`.
    LengthMismatch { expected: usize, actual: usize },
    /// `width * height * 4` does not fit in `usize`.
    TooLarge { width: u32, height: u32 },
}

impl fmt::Display for PixelBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, actual } => {
                write!(f, "pixel data has {actual} bytes, expected {expected}")
            }
            Self::TooLarge { width, height } => {
                write!(f, "pixel buffer {width}x{height} is too large")
            }
        }
    }
}

impl std::error::Error for PixelBufferError {}

/// Row-major RGBA byte grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

fn byte_len(width: u32, height: u32) -> Result<usize, PixelBufferError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or(PixelBufferError::TooLarge { width, height })
}

impl PixelBuffer {
    /// Fully transparent buffer.
    ///
    /// # Panics
    ///
    /// Panics if the byte length overflows `usize`.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Buffer with every pixel set to `rgba`.
    ///
    /// # Panics
    ///
    /// Panics if the byte length overflows `usize`.
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        match Self::try_filled(width, height, rgba) {
            Ok(buf) => buf,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible [`PixelBuffer::filled`].
    pub fn try_filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, PixelBufferError> {
        let len = byte_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..len / CHANNELS {
            data.extend_from_slice(&rgba);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap raw bytes read back from a host surface.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PixelBufferError> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(PixelBufferError::LengthMismatch {
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

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.offset(x, y)?;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[idx..idx + CHANNELS]);
        Some(px)
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(idx) = self.offset(x, y) {
            self.data[idx..idx + CHANNELS].copy_from_slice(&rgba);
        }
    }

    /// Iterate pixels mutably as 4-byte chunks in row-major order.
    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.data.chunks_exact_mut(CHANNELS)
    }

    /// Iterate pixels as 4-byte chunks in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(CHANNELS)
    }

    /// Nearest-neighbor resample to `width` × `height`.
    #[must_use]
    pub fn scaled(&self, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        if self.is_empty() {
            return out;
        }
        let (sw, sh) = (u64::from(self.width), u64::from(self.height));
        for y in 0..height {
            let sy = (u64::from(y) * sh / u64::from(height.max(1))) as u32;
            for x in 0..width {
                let sx = (u64::from(x) * sw / u64::from(width.max(1))) as u32;
                if let Some(px) = self.pixel(sx, sy) {
                    out.set_pixel(x, y, px);
                }
            }
        }
        out
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_buffer_has_expected_length() {
        let buf = PixelBuffer::filled(3, 2, [1, 2, 3, 4]);
        assert_eq!(buf.as_bytes().len(), 3 * 2 * CHANNELS);
        assert_eq!(buf.pixel_count(), 6);
        assert!(buf.pixels().all(|px| px == [1, 2, 3, 4]));
    }

    #[test]
    fn try_filled_rejects_overflowing_size() {
        assert_eq!(
            PixelBuffer::try_filled(u32::MAX, u32::MAX, [0; 4]),
            Err(PixelBufferError::TooLarge {
                width: u32::MAX,
                height: u32::MAX
            })
        );
    }

    #[test]
    fn from_raw_rejects_length_mismatch() {
        let err = PixelBuffer::from_raw(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            PixelBufferError::LengthMismatch {
                expected: 16,
                actual: 15
            }
        );
        assert_eq!(err.to_string(), "pixel data has 15 bytes, expected 16");
    }

    #[test]
    fn pixel_addressing_is_row_major() {
        let mut buf = PixelBuffer::new(4, 3);
        buf.set_pixel(1, 2, [9, 8, 7, 6]);
        let idx = (2 * 4 + 1) * CHANNELS;
        assert_eq!(&buf.as_bytes()[idx..idx + 4], &[9, 8, 7, 6]);
        assert_eq!(buf.pixel(1, 2), Some([9, 8, 7, 6]));
        assert_eq!(buf.pixel(4, 0), None);
    }

    #[test]
    fn out_of_bounds_write_is_ignored() {
        let mut buf = PixelBuffer::new(1, 1);
        buf.set_pixel(5, 5, [255; 4]);
        assert_eq!(buf.pixel(0, 0), Some([0; 4]));
    }

    #[test]
    fn scaled_upsamples_with_nearest_neighbor() {
        let mut src = PixelBuffer::new(2, 1);
        src.set_pixel(0, 0, [255, 0, 0, 255]);
        src.set_pixel(1, 0, [0, 0, 255, 255]);
        let out = src.scaled(4, 2);
        assert_eq!(out.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(out.pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(out.pixel(2, 0), Some([0, 0, 255, 255]));
        assert_eq!(out.pixel(3, 1), Some([0, 0, 255, 255]));
    }

    #[test]
    fn zero_sized_buffer_is_empty() {
        let buf = PixelBuffer::new(0, 10);
        assert!(buf.is_empty());
        assert_eq!(buf.scaled(0, 0).pixel_count(), 0);
    }
}
