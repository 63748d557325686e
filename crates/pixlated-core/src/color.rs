#![forbid(unsafe_code)]

//! CSS color resolution for the headless surface.
//!
//! Browser surfaces accept any CSS color string directly. The software
//! surface resolves the subset that components actually use: hex forms,
//! `rgb()`/`rgba()`, and a handful of named colors.

/// RGBA color, 8 bits per channel. Alpha 255 is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Resolve a CSS color string, or `None` if unsupported.
    #[must_use]
    pub fn parse_css(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
        {
            return parse_rgb_args(args.strip_suffix(')')?);
        }
        named(&lower)
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let b = hex.as_bytes();
    let nibbles: Vec<u8> = b.iter().map(|&c| hex_nibble(c)).collect::<Option<_>>()?;
    let expand = |n: u8| n << 4 | n;
    match nibbles.as_slice() {
        [r, g, bl] => Some(Rgba::rgb(expand(*r), expand(*g), expand(*bl))),
        [r, g, bl, a] => Some(Rgba {
            r: expand(*r),
            g: expand(*g),
            b: expand(*bl),
            a: expand(*a),
        }),
        [r1, r2, g1, g2, b1, b2] => Some(Rgba::rgb(*r1 << 4 | *r2, *g1 << 4 | *g2, *b1 << 4 | *b2)),
        [r1, r2, g1, g2, b1, b2, a1, a2] => Some(Rgba {
            r: *r1 << 4 | *r2,
            g: *g1 << 4 | *g2,
            b: *b1 << 4 | *b2,
            a: *a1 << 4 | *a2,
        }),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    let channel = |p: &str| -> Option<u8> {
        if let Some(pct) = p.strip_suffix('%') {
            let v: f64 = pct.parse().ok()?;
            return Some((v.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8);
        }
        let v: f64 = p.parse().ok()?;
        Some(v.clamp(0.0, 255.0).round() as u8)
    };
    let alpha = |p: &str| -> Option<u8> {
        if let Some(pct) = p.strip_suffix('%') {
            let v: f64 = pct.parse().ok()?;
            return Some((v.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8);
        }
        let v: f64 = p.parse().ok()?;
        Some((v.clamp(0.0, 1.0) * 255.0).round() as u8)
    };
    match parts.as_slice() {
        [r, g, b] => Some(Rgba::rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => Some(Rgba {
            r: channel(r)?,
            g: channel(g)?,
            b: channel(b)?,
            a: alpha(a)?,
        }),
        _ => None,
    }
}

fn named(name: &str) -> Option<Rgba> {
    let c = match name {
        "black" => Rgba::BLACK,
        "white" => Rgba::rgb(255, 255, 255),
        "red" => Rgba::rgb(255, 0, 0),
        "green" => Rgba::rgb(0, 128, 0),
        "blue" => Rgba::rgb(0, 0, 255),
        "gray" | "grey" => Rgba::rgb(128, 128, 128),
        "transparent" => Rgba::TRANSPARENT,
        _ => return None,
    };
    Some(c)
}
