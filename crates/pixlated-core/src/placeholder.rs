#![forbid(unsafe_code)]

//! Diagnostic placeholder drawn in place of unavailable image content.

use crate::surface::{RasterSurface, TextRun};

const BACKGROUND: &str = "#f0f0f0";
const TEXT: &str = "#666";
const HINT: &str = "#999";
const ALERT: &str = "#d32f2f";

/// Placeholder variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// No source configured.
    NoImage,
    /// A configuration or load error with its message.
    Error(&'a str),
}

impl Placeholder<'_> {
    /// Text lines for a surface of `width` × `height` device pixels.
    #[must_use]
    pub fn text_runs(&self, width: u32, height: u32) -> Vec<TextRun> {
        let cx = f64::from(width) / 2.0;
        let cy = f64::from(height) / 2.0;
        let run = |text: &str, dy: f64, font: &str, color: &str| TextRun {
            text: text.to_owned(),
            x: cx,
            y: cy + dy,
            font: font.to_owned(),
            color: color.to_owned(),
        };
        match self {
            Self::NoImage => vec![
                run("No Image", -10.0, "16px Arial", TEXT),
                run("src attribute required", 15.0, "12px Arial", HINT),
            ],
            Self::Error(message) => vec![
                run("\u{26a0} Error", -20.0, "16px Arial", ALERT),
                run(message, 10.0, "14px Arial", TEXT),
            ],
        }
    }

    /// Clear `surface`, paint the backdrop, and draw the text.
    pub fn draw<S: RasterSurface + ?Sized>(&self, surface: &mut S) {
        let (w, h) = surface.size();
        surface.clear();
        surface.fill(BACKGROUND);
        for run in self.text_runs(w, h) {
            surface.fill_text(&run);
        }
    }
}
