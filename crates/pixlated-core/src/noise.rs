#![forbid(unsafe_code)]

//! Noise engine.
//!
//! [`apply_noise`] perturbs every pixel of a [`PixelBuffer`] by one uniform
//! sample scaled by an intensity factor. The sample is shared across the red,
//! green and blue channels so the grain stays neutral (no color cast); alpha
//! is never touched.
//!
//! Randomness is injected through [`UniformSource`] so callers can seed or
//! pin the generator. No global state is used.

use rand::RngCore;

use crate::pixel::{ALPHA, PixelBuffer};

/// Amplitude of the noise offset at intensity 1.0 (full byte range).
const NOISE_SPAN: f64 = 255.0;

/// Source of uniform draws in `[0, 1)`.
pub trait UniformSource {
    /// Next uniform draw.
    fn next_unit(&mut self) -> f64;
}

impl<T: UniformSource + ?Sized> UniformSource for &mut T {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

impl<T: UniformSource + ?Sized> UniformSource for Box<T> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Adapts any `rand` generator into a [`UniformSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: RngCore> UniformSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        // 53 random mantissa bits, uniform in [0, 1).
        (self.0.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Returns the same value on every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSource(pub f64);

impl UniformSource for FixedSource {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

/// Normalize an intensity to `[0, 1]`.
///
/// `None` and NaN yield `default`; values below 0 or above 1 saturate.
#[must_use]
pub fn clamp_intensity(value: Option<f64>, default: f64) -> f64 {
    match value {
        None => default,
        Some(v) if v.is_nan() => default,
        Some(v) if v < 0.0 => 0.0,
        Some(v) if v > 1.0 => 1.0,
        Some(v) => v,
    }
}

/// Add per-pixel grain to `buffer` in place and return it.
///
/// `intensity` is re-clamped to `[0, 1]` (NaN counts as 0). At intensity 0
/// the buffer is left untouched and no draws are taken from `rng`.
pub fn apply_noise<'a, R>(
    buffer: &'a mut PixelBuffer,
    intensity: f64,
    rng: &mut R,
) -> &'a mut PixelBuffer
where
    R: UniformSource + ?Sized,
{
    let intensity = clamp_intensity(Some(intensity), 0.0);
    if intensity == 0.0 {
        return buffer;
    }

    let amplitude = NOISE_SPAN * intensity;
    for px in buffer.pixels_mut() {
        let offset = (rng.next_unit() - 0.5) * amplitude;
        for channel in &mut px[..ALPHA] {
            *channel = perturb(*channel, offset);
        }
    }
    buffer
}

#[inline]
fn perturb(channel: u8, offset: f64) -> u8 {
    // Clamp, then truncate toward zero.
    (f64::from(channel) + offset).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Sequence {
        values: Vec<f64>,
        idx: usize,
    }

    impl UniformSource for Sequence {
        fn next_unit(&mut self) -> f64 {
            let v = self.values[self.idx % self.values.len()];
            self.idx += 1;
            v
        }
    }

    #[test]
    fn clamp_intensity_contract() {
        assert_eq!(clamp_intensity(Some(f64::NAN), 0.3), 0.3);
        assert_eq!(clamp_intensity(None, 0.3), 0.3);
        assert_eq!(clamp_intensity(Some(-5.0), 0.3), 0.0);
        assert_eq!(clamp_intensity(Some(5.0), 0.3), 1.0);
        assert_eq!(clamp_intensity(Some(0.5), 0.3), 0.5);
        assert_eq!(clamp_intensity(Some(f64::INFINITY), 0.3), 1.0);
        assert_eq!(clamp_intensity(Some(f64::NEG_INFINITY), 0.3), 0.0);
    }

    #[test]
    fn fixed_source_of_one_brightens_by_half_span() {
        let mut buf = PixelBuffer::filled(1, 1, [100, 100, 100, 255]);
        apply_noise(&mut buf, 1.0, &mut FixedSource(1.0));
        assert_eq!(buf.pixel(0, 0), Some([227, 227, 227, 255]));
    }

    #[test]
    fn fixed_source_of_zero_darkens_and_saturates() {
        let mut buf = PixelBuffer::filled(1, 1, [100, 200, 10, 7]);
        apply_noise(&mut buf, 1.0, &mut FixedSource(0.0));
        // offset = -127.5
        assert_eq!(buf.pixel(0, 0), Some([0, 72, 0, 7]));
    }

    #[test]
    fn zero_intensity_takes_no_draws() {
        let mut seq = Sequence {
            values: vec![0.9],
            idx: 0,
        };
        let mut buf = PixelBuffer::filled(4, 4, [10, 20, 30, 40]);
        let before = buf.clone();
        apply_noise(&mut buf, 0.0, &mut seq);
        assert_eq!(buf, before);
        assert_eq!(seq.idx, 0);
    }

    #[test]
    fn nan_intensity_is_identity() {
        let mut buf = PixelBuffer::filled(2, 2, [50, 60, 70, 80]);
        let before = buf.clone();
        apply_noise(&mut buf, f64::NAN, &mut FixedSource(0.99));
        assert_eq!(buf, before);
    }

    #[test]
    fn one_draw_per_pixel() {
        let mut seq = Sequence {
            values: vec![0.25, 0.75],
            idx: 0,
        };
        let mut buf = PixelBuffer::filled(3, 1, [128, 128, 128, 255]);
        apply_noise(&mut buf, 1.0, &mut seq);
        assert_eq!(seq.idx, 3);
        // 0.25 -> -63.75, 0.75 -> +63.75
        assert_eq!(buf.pixel(0, 0), Some([64, 64, 64, 255]));
        assert_eq!(buf.pixel(1, 0), Some([191, 191, 191, 255]));
        assert_eq!(buf.pixel(2, 0), Some([64, 64, 64, 255]));
    }

    #[test]
    fn intensity_above_one_is_clamped() {
        let mut a = PixelBuffer::filled(1, 1, [100, 100, 100, 255]);
        let mut b = a.clone();
        apply_noise(&mut a, 7.0, &mut FixedSource(0.8));
        apply_noise(&mut b, 1.0, &mut FixedSource(0.8));
        assert_eq!(a, b);
    }

    #[test]
    fn rng_source_draws_stay_in_unit_interval() {
        let mut src = RngSource(StdRng::seed_from_u64(7));
        for _ in 0..10_000 {
            let u = src.next_unit();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let mut a = PixelBuffer::filled(8, 8, [90, 120, 150, 255]);
        let mut b = a.clone();
        apply_noise(&mut a, 0.4, &mut RngSource(StdRng::seed_from_u64(42)));
        apply_noise(&mut b, 0.4, &mut RngSource(StdRng::seed_from_u64(42)));
        assert_eq!(a, b);
    }

    #[test]
    fn boxed_dyn_source_is_accepted() {
        let mut src: Box<dyn UniformSource> = Box::new(FixedSource(1.0));
        let mut buf = PixelBuffer::filled(1, 1, [0, 0, 0, 0]);
        apply_noise(&mut buf, 1.0, &mut src);
        assert_eq!(buf.pixel(0, 0), Some([127, 127, 127, 0]));
    }
}
