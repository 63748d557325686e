#![forbid(unsafe_code)]

//! `<canvas>`-backed [`RasterSurface`].

use js_sys::{Object, Reflect};
use pixlated_core::pixel::PixelBuffer;
use pixlated_core::surface::{RasterSurface, SurfaceError, SurfaceSize, TextRun};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, ImageData};

/// Human-readable text for a thrown JS value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

/// 2D canvas surface. Pixels are read back often, so the context is created
/// with `willReadFrequently`.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Acquire a 2D context on `canvas`.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SurfaceError> {
        let attrs = Object::new();
        Reflect::set(&attrs, &"willReadFrequently".into(), &JsValue::TRUE)
            .map_err(|e| SurfaceError::Host(js_message(&e)))?;
        let ctx = canvas
            .get_context_with_context_options("2d", &attrs)
            .map_err(|e| SurfaceError::Host(js_message(&e)))?
            .ok_or(SurfaceError::Unavailable)?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SurfaceError::Unavailable)?;
        Ok(Self { canvas, ctx })
    }

    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn set_css_extent(&self, property: &str, css: Option<u32>) {
        let style = self.canvas.style();
        let result = match css {
            Some(px) => style.set_property(property, &format!("{px}px")),
            None => style.remove_property(property).map(|_| ()),
        };
        if let Err(err) = result {
            warn!(property, err = %js_message(&err), "canvas style update failed");
        }
    }

    fn extent(&self) -> (f64, f64) {
        (
            f64::from(self.canvas.width()),
            f64::from(self.canvas.height()),
        )
    }
}

impl RasterSurface for CanvasSurface {
    type Image = HtmlImageElement;

    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.canvas.set_width(size.width);
        self.canvas.set_height(size.height);
        self.set_css_extent("width", size.css_width);
        self.set_css_extent("height", size.css_height);
    }

    fn clear(&mut self) {
        let (w, h) = self.extent();
        self.ctx.clear_rect(0.0, 0.0, w, h);
    }

    fn fill(&mut self, color: &str) {
        let (w, h) = self.extent();
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(0.0, 0.0, w, h);
    }

    fn draw_image(&mut self, image: &HtmlImageElement) {
        let (w, h) = self.extent();
        if let Err(err) = self
            .ctx
            .draw_image_with_html_image_element_and_dw_and_dh(image, 0.0, 0.0, w, h)
        {
            warn!(err = %js_message(&err), "drawImage failed");
        }
    }

    fn fill_text(&mut self, run: &TextRun) {
        self.ctx.set_font(&run.font);
        self.ctx.set_fill_style_str(&run.color);
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        if let Err(err) = self.ctx.fill_text(&run.text, run.x, run.y) {
            warn!(err = %js_message(&err), "fillText failed");
        }
    }

    fn read_pixels(&mut self) -> Result<PixelBuffer, SurfaceError> {
        let (w, h) = self.size();
        let data = self
            .ctx
            .get_image_data(0.0, 0.0, f64::from(w), f64::from(h))
            .map_err(|e| SurfaceError::Host(js_message(&e)))?;
        PixelBuffer::from_raw(data.width(), data.height(), data.data().0)
            .map_err(|e| SurfaceError::Host(e.to_string()))
    }

    fn write_pixels(&mut self, buffer: &PixelBuffer) -> Result<(), SurfaceError> {
        let expected = self.size();
        let actual = (buffer.width(), buffer.height());
        if expected != actual {
            return Err(SurfaceError::SizeMismatch { expected, actual });
        }
        let data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(buffer.as_bytes()),
            buffer.width(),
            buffer.height(),
        )
        .map_err(|e| SurfaceError::Host(js_message(&e)))?;
        self.ctx
            .put_image_data(&data, 0.0, 0.0)
            .map_err(|e| SurfaceError::Host(js_message(&e)))
    }

    fn set_accessible_label(&mut self, label: Option<&str>) {
        let result = match label.filter(|l| !l.is_empty()) {
            Some(label) => self
                .canvas
                .set_attribute("role", "img")
                .and_then(|()| self.canvas.set_attribute("aria-label", label)),
            None => self
                .canvas
                .remove_attribute("role")
                .and_then(|()| self.canvas.remove_attribute("aria-label")),
        };
        if let Err(err) = result {
            warn!(err = %js_message(&err), "accessible label update failed");
        }
    }
}
