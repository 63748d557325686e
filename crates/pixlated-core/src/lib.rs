#![forbid(unsafe_code)]

//! Core: grain compositing for canvas-backed surfaces.
//!
//! # Role in pixlated
//! `pixlated-core` owns everything that does not need a browser: the noise
//! engine, RGBA pixel buffers, attribute validation, and the two surface
//! renderers (flat-color background and loaded image). The renderers talk to
//! the host through two seams:
//!
//! - [`surface::RasterSurface`]: the host's 2D rasterization surface (fill,
//!   clear, scaled blit, pixel read/write).
//! - [`lifecycle::HostAction`]: side effects the host must run on the
//!   renderer's behalf (observe resizes, load an image, dispatch an event).
//!
//! # How it fits in the system
//! `pixlated-web` implements [`surface::RasterSurface`] over
//! `CanvasRenderingContext2d` and drives the renderers from custom-element
//! callbacks. Native tests drive the same renderers through
//! [`surface::SoftwareSurface`].

pub mod background;
pub mod color;
pub mod composite;
pub mod event;
pub mod image;
pub mod lifecycle;
pub mod noise;
pub mod pixel;
pub mod placeholder;
pub mod surface;
pub mod validate;

pub use background::{BackgroundRenderer, BackgroundSnapshot};
pub use event::SurfaceEvent;
pub use image::{ImageRenderer, ImageSnapshot, ImageState};
pub use lifecycle::{ConfigKey, HostAction, HostEnv, MAX_DEVICE_DIMENSION, SurfaceLifecycle};
pub use noise::{FixedSource, RngSource, UniformSource, apply_noise, clamp_intensity};
pub use pixel::{PixelBuffer, PixelBufferError};
pub use surface::{RasterSurface, SoftwareSurface, SurfaceError, SurfaceSize, TextRun};

/// Fill color used by the background renderer when `color` is unset.
pub const DEFAULT_COLOR: &str = "#09090b";
/// Intensity used when the `intensity` attribute is absent or non-numeric.
pub const DEFAULT_INTENSITY: f64 = 0.1;
/// Image surface edge length (CSS pixels) when `width`/`height` is invalid.
pub const DEFAULT_DIMENSION: u32 = 400;

/// Defaults and diagnostics policy shared by both renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Fill color for the background renderer.
    pub default_color: String,
    /// Fallback noise intensity.
    pub default_intensity: f64,
    /// Fallback image surface dimension in CSS pixels.
    pub default_dimension: u32,
    /// Emit `debug`-level validation diagnostics.
    pub debug: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            default_color: DEFAULT_COLOR.to_owned(),
            default_intensity: DEFAULT_INTENSITY,
            default_dimension: DEFAULT_DIMENSION,
            debug: false,
        }
    }
}
