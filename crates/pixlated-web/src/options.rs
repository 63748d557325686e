#![forbid(unsafe_code)]

//! Construction options for the element controllers.

use pixlated_core::noise::RngSource;
use pixlated_core::{ConfigKey, RendererConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Options accepted by the `PixlatedBg` / `PixlatedImage` constructors.
///
/// JS shape: `{ debug?: boolean, seed?: number }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementOptions {
    /// Log validation diagnostics at debug level.
    pub debug: bool,
    /// Fixed RNG seed for reproducible grain.
    pub seed: Option<u64>,
}

impl ElementOptions {
    /// Renderer defaults with this debug flag.
    #[must_use]
    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            debug: self.debug,
            ..RendererConfig::default()
        }
    }

    /// Grain generator: the configured seed, else `fallback()`.
    pub fn rng(&self, fallback: impl FnOnce() -> u64) -> RngSource<StdRng> {
        let seed = self.seed.unwrap_or_else(fallback);
        RngSource(StdRng::seed_from_u64(seed))
    }
}

/// Seed from a JS number option. Non-finite or negative values are rejected;
/// fractions are truncated.
#[must_use]
pub fn seed_from_number(n: f64) -> Option<u64> {
    if n.is_finite() && n >= 0.0 {
        Some(n.min(u64::MAX as f64) as u64)
    } else {
        None
    }
}

/// Seed from a uniform draw in `[0, 1)` (e.g. `Math.random()`).
#[must_use]
pub fn seed_from_unit(u: f64) -> u64 {
    let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
    (u * (1u64 << 53) as f64) as u64
}

/// Attribute names a host element must observe.
#[must_use]
pub fn observed_attributes(keys: &[ConfigKey]) -> Vec<&'static str> {
    keys.iter().map(|k| k.as_str()).collect()
}
