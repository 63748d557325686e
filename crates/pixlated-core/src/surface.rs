#![forbid(unsafe_code)]

//! Host rasterization surface.
//!
//! [`RasterSurface`] is the seam between the renderers and whatever owns the
//! actual pixels: a browser `<canvas>` in `pixlated-web`, or the in-memory
//! [`SoftwareSurface`] used for native tests and offline rendering.
//!
//! All coordinates and sizes are device pixels. The surface is never scaled
//! by a transform; callers size it to `css * dpr` up front.

use std::fmt;

use tracing::warn;

use crate::color::Rgba;
use crate::pixel::{PixelBuffer, PixelBufferError};

/// Largest backing store area, in device pixels, a surface will allocate.
/// Matches the canvas area limit of current browsers.
pub const MAX_SURFACE_AREA: u64 = 1 << 28;

/// Surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    /// Backing store width in device pixels.
    pub width: u32,
    /// Backing store height in device pixels.
    pub height: u32,
    /// Displayed width in CSS pixels, when pinned explicitly.
    pub css_width: Option<u32>,
    /// Displayed height in CSS pixels, when pinned explicitly.
    pub css_height: Option<u32>,
}

impl SurfaceSize {
    /// Backing store size with no CSS override.
    #[must_use]
    pub const fn device(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            css_width: None,
            css_height: None,
        }
    }
}

/// One line of centered text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Center x in device pixels.
    pub x: f64,
    /// Vertical middle in device pixels.
    pub y: f64,
    /// CSS font shorthand, e.g. `16px Arial`.
    pub font: String,
    /// CSS color.
    pub color: String,
}

/// Surface operation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The host could not provide a 2D context.
    Unavailable,
    /// A pixel buffer does not match the surface dimensions.
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// Host-reported failure (e.g. a cross-origin tainted canvas).
    Host(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "2D rendering context not available"),
            Self::SizeMismatch { expected, actual } => write!(
                f,
                "pixel buffer is {}x{}, surface is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            Self::Host(msg) => write!(f, "surface error: {msg}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// Host 2D rasterization surface.
pub trait RasterSurface {
    /// Decoded image handle the host can blit.
    type Image;

    /// Backing store size in device pixels.
    fn size(&self) -> (u32, u32);

    /// Resize the backing store. Contents are reset to transparent.
    fn resize(&mut self, size: SurfaceSize);

    /// Clear every pixel to transparent.
    fn clear(&mut self);

    /// Fill the whole surface with a CSS color.
    fn fill(&mut self, color: &str);

    /// Draw `image` stretched over the whole surface.
    fn draw_image(&mut self, image: &Self::Image);

    /// Draw one line of centered text.
    fn fill_text(&mut self, run: &TextRun);

    /// Snapshot the surface into a fresh pixel buffer.
    fn read_pixels(&mut self) -> Result<PixelBuffer, SurfaceError>;

    /// Write a full-surface pixel buffer back.
    fn write_pixels(&mut self, buffer: &PixelBuffer) -> Result<(), SurfaceError>;

    /// Expose the surface as an image with `label`, or clear the role.
    fn set_accessible_label(&mut self, label: Option<&str>);
}

/// Operation recorded by [`SoftwareSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Resize(SurfaceSize),
    Clear,
    Fill(String),
    DrawImage,
    Text(TextRun),
    Read,
    Write,
}

/// In-memory [`RasterSurface`] for tests and offline rendering.
///
/// Fills and image blits composite source-over like a canvas. Text is not
/// rasterized; runs are recorded in the operation log instead.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    pixels: PixelBuffer,
    size: SurfaceSize,
    fill_style: Rgba,
    label: Option<String>,
    readback_blocked: bool,
    ops: Vec<DrawOp>,
}

impl Default for SoftwareSurface {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl SoftwareSurface {
    /// Transparent surface of `width` × `height` device pixels.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: PixelBuffer::new(width, height),
            size: SurfaceSize::device(width, height),
            fill_style: Rgba::BLACK,
            label: None,
            readback_blocked: false,
            ops: Vec::new(),
        }
    }

    /// Current surface contents.
    #[must_use]
    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Last size applied, including CSS overrides.
    #[must_use]
    pub fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    /// Accessible label, if the surface is exposed as an image.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Make pixel reads fail, as a cross-origin tainted canvas would.
    pub fn block_readback(&mut self, blocked: bool) {
        self.readback_blocked = blocked;
    }

    /// Operations since the last call.
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Text runs drawn since the last clear.
    #[must_use]
    pub fn text_runs(&self) -> Vec<&TextRun> {
        let start = self
            .ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Clear | DrawOp::Resize(_)))
            .map_or(0, |idx| idx + 1);
        self.ops[start..]
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text(run) => Some(run),
                _ => None,
            })
            .collect()
    }
}

#[inline]
fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    let sa = u32::from(src[3]);
    if sa == 255 {
        dst.copy_from_slice(&src);
        return;
    }
    if sa == 0 {
        return;
    }
    let da = u32::from(dst[3]);
    let inv = 255 - sa;
    let out_a = sa + da * inv / 255;
    if out_a == 0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let s = u32::from(src[c]) * sa;
        let d = u32::from(dst[c]) * da * inv / 255;
        dst[c] = ((s + d) / out_a).min(255) as u8;
    }
    dst[3] = out_a.min(255) as u8;
}

impl RasterSurface for SoftwareSurface {
    type Image = PixelBuffer;

    fn size(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }

    fn resize(&mut self, size: SurfaceSize) {
        let area = u64::from(size.width) * u64::from(size.height);
        let pixels = if area > MAX_SURFACE_AREA {
            Err(PixelBufferError::TooLarge {
                width: size.width,
                height: size.height,
            })
        } else {
            PixelBuffer::try_filled(size.width, size.height, [0; 4])
        };
        let size = match pixels {
            Ok(pixels) => {
                self.pixels = pixels;
                size
            }
            Err(err) => {
                warn!(%err, "surface left empty");
                self.pixels = PixelBuffer::new(0, 0);
                SurfaceSize {
                    width: 0,
                    height: 0,
                    ..size
                }
            }
        };
        self.size = size;
        self.ops.push(DrawOp::Resize(size));
    }

    fn clear(&mut self) {
        self.pixels.as_bytes_mut().fill(0);
        self.ops.push(DrawOp::Clear);
    }

    fn fill(&mut self, color: &str) {
        // Unparseable colors keep the previous fill style, as on a canvas.
        if let Some(rgba) = Rgba::parse_css(color) {
            self.fill_style = rgba;
        }
        let src = self.fill_style.to_array();
        for px in self.pixels.pixels_mut() {
            blend_over(px, src);
        }
        self.ops.push(DrawOp::Fill(color.to_owned()));
    }

    fn draw_image(&mut self, image: &PixelBuffer) {
        let (w, h) = self.size();
        let scaled = image.scaled(w, h);
        for (dst, src) in self.pixels.pixels_mut().zip(scaled.pixels()) {
            blend_over(dst, [src[0], src[1], src[2], src[3]]);
        }
        self.ops.push(DrawOp::DrawImage);
    }

    fn fill_text(&mut self, run: &TextRun) {
        self.ops.push(DrawOp::Text(run.clone()));
    }

    fn read_pixels(&mut self) -> Result<PixelBuffer, SurfaceError> {
        if self.readback_blocked {
            return Err(SurfaceError::Host(
                "The canvas has been tainted by cross-origin data".to_owned(),
            ));
        }
        self.ops.push(DrawOp::Read);
        Ok(self.pixels.clone())
    }

    fn write_pixels(&mut self, buffer: &PixelBuffer) -> Result<(), SurfaceError> {
        let expected = self.size();
        let actual = (buffer.width(), buffer.height());
        if expected != actual {
            return Err(SurfaceError::SizeMismatch { expected, actual });
        }
        self.pixels.as_bytes_mut().copy_from_slice(buffer.as_bytes());
        self.ops.push(DrawOp::Write);
        Ok(())
    }

    fn set_accessible_label(&mut self, label: Option<&str>) {
        self.label = label.filter(|l| !l.is_empty()).map(str::to_owned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_resize_leaves_surface_empty() {
        let mut s = SoftwareSurface::new(2, 2);
        s.resize(SurfaceSize {
            width: 32_767,
            height: 32_767,
            css_width: Some(99_999),
            css_height: None,
        });
        assert_eq!(s.size(), (0, 0));
        assert_eq!(s.surface_size().css_width, Some(99_999));
        s.fill("#ffffff");
        assert!(s.pixels().as_bytes().is_empty());
    }

    #[test]
    fn fill_with_opaque_color_replaces_pixels() {
        let mut s = SoftwareSurface::new(2, 2);
        s.fill("#09090b");
        assert!(s.pixels().pixels().all(|px| px == [9, 9, 11, 255]));
    }

    #[test]
    fn invalid_color_keeps_previous_fill_style() {
        let mut s = SoftwareSurface::new(1, 1);
        s.fill("not a color");
        assert_eq!(s.pixels().pixel(0, 0), Some([0, 0, 0, 255]));
        s.fill("#ff0000");
        s.clear();
        s.fill("nope");
        assert_eq!(s.pixels().pixel(0, 0), Some([255, 0, 0, 255]));
    }

    #[test]
    fn translucent_fill_blends_over_transparent() {
        let mut s = SoftwareSurface::new(1, 1);
        s.fill("rgba(200, 100, 50, 0.5)");
        assert_eq!(s.pixels().pixel(0, 0), Some([200, 100, 50, 128]));
    }

    #[test]
    fn draw_image_stretches_to_surface() {
        let mut s = SoftwareSurface::new(4, 4);
        let img = PixelBuffer::filled(1, 1, [10, 20, 30, 255]);
        s.draw_image(&img);
        assert!(s.pixels().pixels().all(|px| px == [10, 20, 30, 255]));
    }

    #[test]
    fn write_rejects_mismatched_buffer() {
        let mut s = SoftwareSurface::new(2, 2);
        let err = s.write_pixels(&PixelBuffer::new(3, 2)).unwrap_err();
        assert_eq!(
            err,
            SurfaceError::SizeMismatch {
                expected: (2, 2),
                actual: (3, 2)
            }
        );
    }

    #[test]
    fn blocked_readback_reports_host_error() {
        let mut s = SoftwareSurface::new(1, 1);
        s.block_readback(true);
        assert!(matches!(s.read_pixels(), Err(SurfaceError::Host(_))));
    }

    #[test]
    fn text_runs_reset_on_clear() {
        let mut s = SoftwareSurface::new(10, 10);
        let run = TextRun {
            text: "hello".to_owned(),
            x: 5.0,
            y: 5.0,
            font: "16px Arial".to_owned(),
            color: "#666".to_owned(),
        };
        s.fill_text(&run);
        assert_eq!(s.text_runs().len(), 1);
        s.clear();
        assert!(s.text_runs().is_empty());
    }

    #[test]
    fn empty_label_clears_role() {
        let mut s = SoftwareSurface::new(1, 1);
        s.set_accessible_label(Some("a cat"));
        assert_eq!(s.label(), Some("a cat"));
        s.set_accessible_label(Some(""));
        assert_eq!(s.label(), None);
    }
}
