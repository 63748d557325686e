#![forbid(unsafe_code)]

//! Grain pass shared by both renderers: read back, perturb, write back.

use crate::noise::{UniformSource, apply_noise};
use crate::surface::{RasterSurface, SurfaceError};

/// Apply grain to whatever `surface` currently shows.
///
/// Returns `Ok(false)` without touching the surface when `intensity` is not
/// positive or the surface has no pixels.
pub fn composite_grain<S, R>(surface: &mut S, intensity: f64, rng: &mut R) -> Result<bool, SurfaceError>
where
    S: RasterSurface + ?Sized,
    R: UniformSource + ?Sized,
{
    if intensity.is_nan() || intensity <= 0.0 {
        return Ok(false);
    }
    let (w, h) = surface.size();
    if w == 0 || h == 0 {
        return Ok(false);
    }
    let mut buffer = surface.read_pixels()?;
    apply_noise(&mut buffer, intensity, rng);
    surface.write_pixels(&buffer)?;
    Ok(true)
}
