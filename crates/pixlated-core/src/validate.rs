#![forbid(unsafe_code)]

//! Attribute validation.
//!
//! Attribute values arrive as optional strings. Each validator returns the
//! effective value together with an optional [`Diagnostic`] describing any
//! substitution, so the caller decides whether and how to report it.

use std::fmt;

use crate::noise::clamp_intensity;

/// Surface axis, used to label dimension diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

impl Axis {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
        }
    }
}

/// Why an attribute value was replaced.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Dimension was non-numeric or not positive.
    InvalidDimension {
        axis: Axis,
        raw: String,
        fallback: u32,
    },
    /// Intensity was not a number.
    InvalidIntensity { raw: String, fallback: f64 },
    /// Intensity was numeric but outside `[0, 1]`.
    IntensityClamped { raw: String, clamped: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension {
                axis,
                raw,
                fallback,
            } => write!(f, "Invalid {} \"{raw}\", using {fallback}", axis.as_str()),
            Self::InvalidIntensity { raw, fallback } => {
                write!(f, "Invalid intensity \"{raw}\", using {fallback}")
            }
            Self::IntensityClamped { raw, clamped } => {
                write!(f, "Intensity \"{raw}\" out of range, clamped to {clamped}")
            }
        }
    }
}

/// Effective value plus an optional substitution diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    pub diagnostic: Option<Diagnostic>,
}

impl<T> Validated<T> {
    const fn clean(value: T) -> Self {
        Self {
            value,
            diagnostic: None,
        }
    }
}

/// Lenient integer prefix parse: optional whitespace and sign, then digits.
///
/// Trailing garbage is ignored (`"150px"` parses as 150, `"12.7"` as 12).
#[must_use]
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = split_sign(s);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Lenient float prefix parse: the longest leading decimal literal.
///
/// Accepts an optional sign, digits with at most one `.`, and an optional
/// exponent. `"Infinity"` is recognized. Trailing garbage is ignored.
#[must_use]
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let (negative, body) = split_sign(s);
    if body.starts_with("Infinity") {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let bytes = body.as_bytes();
    let mut end = 0;
    let mut mantissa_digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        mantissa_digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    let value = body[..end].parse::<f64>().ok()?;
    Some(if negative { -value } else { value })
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

/// Positive integer dimension, or `default`.
///
/// A diagnostic is produced only when a non-empty value was supplied.
#[must_use]
pub fn validate_dimension(raw: Option<&str>, default: u32, axis: Axis) -> Validated<u32> {
    let parsed = raw
        .and_then(parse_leading_int)
        .filter(|v| *v > 0)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX));
    match (parsed, raw) {
        (Some(value), _) => Validated::clean(value),
        (None, Some(raw)) if !raw.is_empty() => Validated {
            value: default,
            diagnostic: Some(Diagnostic::InvalidDimension {
                axis,
                raw: raw.to_owned(),
                fallback: default,
            }),
        },
        (None, _) => Validated::clean(default),
    }
}

/// Intensity in `[0, 1]`, or `default` when absent or non-numeric.
#[must_use]
pub fn validate_intensity(raw: Option<&str>, default: f64) -> Validated<f64> {
    let Some(raw) = raw else {
        return Validated::clean(default);
    };
    let parsed = parse_leading_float(raw);
    let value = clamp_intensity(parsed, default);
    let diagnostic = match parsed {
        None if !raw.is_empty() => Some(Diagnostic::InvalidIntensity {
            raw: raw.to_owned(),
            fallback: default,
        }),
        Some(v) if v != value => Some(Diagnostic::IntensityClamped {
            raw: raw.to_owned(),
            clamped: value,
        }),
        _ => None,
    };
    Validated { value, diagnostic }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_examples() {
        assert_eq!(validate_dimension(Some("abc"), 400, Axis::Width).value, 400);
        assert_eq!(validate_dimension(Some("-10"), 400, Axis::Width).value, 400);
        assert_eq!(validate_dimension(Some("150"), 400, Axis::Width).value, 150);
        assert_eq!(validate_dimension(Some("0"), 400, Axis::Height).value, 400);
        assert_eq!(validate_dimension(Some("150px"), 400, Axis::Width).value, 150);
        assert_eq!(validate_dimension(Some(" 12.9"), 400, Axis::Width).value, 12);
    }

    #[test]
    fn dimension_diagnostic_only_for_supplied_values() {
        assert_eq!(validate_dimension(None, 400, Axis::Width).diagnostic, None);
        assert_eq!(validate_dimension(Some(""), 400, Axis::Width).diagnostic, None);
        let bad = validate_dimension(Some("abc"), 400, Axis::Width);
        let diag = bad.diagnostic.expect("diagnostic for bad width");
        assert_eq!(diag.to_string(), "Invalid width \"abc\", using 400");
    }

    #[test]
    fn huge_dimension_saturates() {
        let v = validate_dimension(Some("99999999999"), 400, Axis::Height);
        assert_eq!(v.value, u32::MAX);
    }

    #[test]
    fn leading_float_parsing() {
        assert_eq!(parse_leading_float("0.5"), Some(0.5));
        assert_eq!(parse_leading_float("  .25x"), Some(0.25));
        assert_eq!(parse_leading_float("-3"), Some(-3.0));
        assert_eq!(parse_leading_float("1e-1"), Some(0.1));
        assert_eq!(parse_leading_float("2e"), Some(2.0));
        assert_eq!(parse_leading_float("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float(""), None);
    }

    #[test]
    fn leading_int_parsing() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int("+7em"), Some(7));
        assert_eq!(parse_leading_int("-10"), Some(-10));
        assert_eq!(parse_leading_int("x1"), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn intensity_validation() {
        let v = validate_intensity(None, 0.1);
        assert_eq!((v.value, v.diagnostic), (0.1, None));

        let v = validate_intensity(Some("0.3"), 0.1);
        assert_eq!((v.value, v.diagnostic), (0.3, None));

        let v = validate_intensity(Some("grainy"), 0.1);
        assert_eq!(v.value, 0.1);
        assert!(matches!(v.diagnostic, Some(Diagnostic::InvalidIntensity { .. })));

        let v = validate_intensity(Some("4"), 0.1);
        assert_eq!(v.value, 1.0);
        assert!(matches!(
            v.diagnostic,
            Some(Diagnostic::IntensityClamped { clamped, .. }) if clamped == 1.0
        ));
    }

    #[test]
    fn empty_intensity_uses_default_silently() {
        let v = validate_intensity(Some(""), 0.1);
        assert_eq!((v.value, v.diagnostic), (0.1, None));
    }
}
