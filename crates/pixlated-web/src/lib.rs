#![forbid(unsafe_code)]

//! Browser adapter for pixlated.
//!
//! This crate provides [`PixlatedBg`] and [`PixlatedImage`],
//! `wasm-bindgen`-exported controllers that a custom element
//! (`js/pixlated-elements.js`) owns and forwards its lifecycle callbacks to.
//! Rendering happens in `pixlated-core`; this crate supplies the
//! `<canvas>`-backed surface and runs the host actions the renderers request
//! (resize observation, image loads, event dispatch).
//!
//! Option parsing and console logging are host-agnostic and tested natively.

#[cfg(target_arch = "wasm32")]
mod canvas;
#[cfg(target_arch = "wasm32")]
mod wasm;

pub mod logging;
pub mod options;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;
#[cfg(target_arch = "wasm32")]
pub use wasm::{PixlatedBg, PixlatedImage};

pub use options::ElementOptions;
