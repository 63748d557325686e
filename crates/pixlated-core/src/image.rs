#![forbid(unsafe_code)]

//! Grainy image renderer.
//!
//! The base layer is an externally loaded image stretched over the surface.
//! Loading is host work: the renderer asks for it with
//! [`HostAction::LoadImage`] and learns the outcome through
//! [`ImageRenderer::on_image_loaded`] / [`ImageRenderer::on_image_error`].
//! Each request carries a ticket so callbacks from superseded loads are
//! dropped.
//!
//! ```text
//! Unloaded ──src──▶ Loading ──loaded──▶ Loaded
//!    ▲                 │  ▲                │
//!    │               error└──reload/src────┤
//!    │                 ▼                   │
//!    └──src removed── Failed ◀─────────────┘ (new src that fails)
//! ```

use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::RendererConfig;
use crate::composite::composite_grain;
use crate::event::SurfaceEvent;
use crate::lifecycle::{Attributes, ConfigKey, HostAction, HostEnv, SurfaceLifecycle};
use crate::noise::{RngSource, UniformSource};
use crate::placeholder::Placeholder;
use crate::surface::{RasterSurface, SurfaceSize};
use crate::validate::{Axis, Diagnostic, validate_dimension, validate_intensity};

const COMPONENT: &str = "pixlated-image";

/// Message shown when the element has no `src`.
pub const MISSING_SRC_MESSAGE: &str = "Missing src attribute";
/// Message shown when the host reports a load failure.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load image";

/// Attributes the image renderer reacts to.
pub const IMAGE_KEYS: &[ConfigKey] = &[
    ConfigKey::Src,
    ConfigKey::Intensity,
    ConfigKey::Width,
    ConfigKey::Height,
    ConfigKey::Alt,
];

/// Image loading state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    /// No source configured (or it was removed).
    Unloaded,
    /// Waiting for the host to report on `ticket`.
    Loading { src: String, ticket: u64 },
    /// Image decoded with its natural dimensions.
    Loaded { src: String, width: u32, height: u32 },
    /// Host reported a load failure of `kind`.
    Failed { src: String, kind: String },
}

impl ImageState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading { .. } => "loading",
            Self::Loaded { .. } => "loaded",
            Self::Failed { .. } => "failed",
        }
    }

    /// Source associated with the current state.
    #[must_use]
    pub fn src(&self) -> Option<&str> {
        match self {
            Self::Unloaded => None,
            Self::Loading { src, .. } | Self::Loaded { src, .. } | Self::Failed { src, .. } => {
                Some(src)
            }
        }
    }
}

/// Effective configuration, as reported by `getConfig()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSnapshot {
    pub src: Option<String>,
    pub intensity: f64,
    /// Surface width in device pixels.
    pub width: u32,
    /// Surface height in device pixels.
    pub height: u32,
    pub alt: String,
}

/// Loaded-image grain renderer.
pub struct ImageRenderer<S: RasterSurface, R = RngSource<StdRng>> {
    surface: Option<S>,
    rng: R,
    config: RendererConfig,
    attrs: Attributes,
    env: HostEnv,
    mounted: bool,
    css_width: u32,
    css_height: u32,
    state: ImageState,
    image: Option<S::Image>,
    error_message: Option<String>,
    next_ticket: u64,
}

impl<S: RasterSurface, R: UniformSource> ImageRenderer<S, R> {
    /// Create a renderer. A `None` surface yields an inert renderer.
    pub fn new(surface: Option<S>, rng: R, config: RendererConfig) -> Self {
        if surface.is_none() {
            error!(component = COMPONENT, "Canvas 2D context not supported");
        }
        let edge = config.default_dimension;
        Self {
            surface,
            rng,
            config,
            attrs: Attributes::default(),
            env: HostEnv::default(),
            mounted: false,
            css_width: edge,
            css_height: edge,
            state: ImageState::Unloaded,
            image: None,
            error_message: None,
            next_ticket: 0,
        }
    }

    /// Seed attribute values without triggering a draw or a load.
    #[must_use]
    pub fn with_attributes(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.surface.is_none()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub fn state(&self) -> &ImageState {
        &self.state
    }

    /// Placeholder message, if the last load or configuration failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    #[must_use]
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// Surface size in CSS pixels.
    #[must_use]
    pub fn css_size(&self) -> (u32, u32) {
        (self.css_width, self.css_height)
    }

    fn alt(&self) -> &str {
        self.attrs.get(ConfigKey::Alt).unwrap_or_default()
    }

    fn src_attr(&self) -> Option<&str> {
        self.attrs.get(ConfigKey::Src).filter(|s| !s.is_empty())
    }

    fn report(&self, diagnostic: &Diagnostic) {
        if self.config.debug {
            debug!(component = COMPONENT, "{diagnostic}");
        }
    }

    /// Current clamped intensity.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        let validated = validate_intensity(
            self.attrs.get(ConfigKey::Intensity),
            self.config.default_intensity,
        );
        if let Some(diagnostic) = &validated.diagnostic {
            self.report(diagnostic);
        }
        validated.value
    }

    /// Effective configuration snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ImageSnapshot {
        let (width, height) = self.surface.as_ref().map_or((0, 0), |s| s.size());
        ImageSnapshot {
            src: self.attrs.get(ConfigKey::Src).map(str::to_owned),
            intensity: self.intensity(),
            width,
            height,
            alt: self.alt().to_owned(),
        }
    }

    fn validate_axis(&mut self, axis: Axis) {
        let key = match axis {
            Axis::Width => ConfigKey::Width,
            Axis::Height => ConfigKey::Height,
        };
        let validated =
            validate_dimension(self.attrs.get(key), self.config.default_dimension, axis);
        if let Some(diagnostic) = &validated.diagnostic {
            self.report(diagnostic);
        }
        match axis {
            Axis::Width => self.css_width = validated.value,
            Axis::Height => self.css_height = validated.value,
        }
    }

    fn apply_size(&mut self) {
        let size = SurfaceSize {
            width: self.env.to_device(f64::from(self.css_width)),
            height: self.env.to_device(f64::from(self.css_height)),
            css_width: Some(self.css_width),
            css_height: Some(self.css_height),
        };
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(size);
        }
    }

    fn sync_label(&mut self) {
        let alt = self.alt().to_owned();
        if let Some(surface) = self.surface.as_mut() {
            surface.set_accessible_label(Some(alt.as_str()).filter(|a| !a.is_empty()));
        }
    }

    fn request_load(&mut self, src: &str) -> HostAction {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let ticket = self.next_ticket;
        self.state = ImageState::Loading {
            src: src.to_owned(),
            ticket,
        };
        if self.config.debug {
            debug!(component = COMPONENT, src, ticket, "requesting image load");
        }
        HostAction::LoadImage {
            src: src.to_owned(),
            ticket,
        }
    }

    /// Draw the current state: image plus grain, placeholder, or nothing
    /// while a load is in flight.
    pub fn draw(&mut self) {
        if self.surface.is_none() {
            return;
        }
        match self.state {
            ImageState::Loading { .. } => {}
            ImageState::Loaded { .. } => self.draw_image(),
            ImageState::Unloaded | ImageState::Failed { .. } => self.draw_placeholder(),
        }
    }

    fn draw_image(&mut self) {
        let intensity = self.intensity();
        let (Some(surface), Some(image)) = (self.surface.as_mut(), self.image.as_ref()) else {
            return;
        };
        surface.clear();
        surface.draw_image(image);
        if let Err(err) = composite_grain(surface, intensity, &mut self.rng) {
            warn!(component = COMPONENT, %err, "grain pass skipped");
        }
    }

    fn draw_placeholder(&mut self) {
        let placeholder = match self.error_message.as_deref() {
            Some(message) => Placeholder::Error(message),
            None => Placeholder::NoImage,
        };
        if let Some(surface) = self.surface.as_mut() {
            placeholder.draw(surface);
        }
    }

    /// Host finished decoding the image requested with `ticket`.
    ///
    /// `width`/`height` are the image's natural dimensions.
    pub fn on_image_loaded(
        &mut self,
        ticket: u64,
        image: S::Image,
        width: u32,
        height: u32,
    ) -> Vec<HostAction> {
        let src = match &self.state {
            ImageState::Loading { src, ticket: t } if *t == ticket => src.clone(),
            _ => {
                if self.config.debug {
                    debug!(component = COMPONENT, ticket, "ignoring stale image load");
                }
                return Vec::new();
            }
        };
        self.state = ImageState::Loaded {
            src: src.clone(),
            width,
            height,
        };
        self.image = Some(image);
        self.error_message = None;
        self.draw();
        vec![HostAction::Emit(SurfaceEvent::Loaded { src, width, height })]
    }

    /// Host failed to load the image requested with `ticket`.
    pub fn on_image_error(&mut self, ticket: u64, kind: &str) -> Vec<HostAction> {
        let src = match &self.state {
            ImageState::Loading { src, ticket: t } if *t == ticket => src.clone(),
            _ => {
                if self.config.debug {
                    debug!(component = COMPONENT, ticket, "ignoring stale image error");
                }
                return Vec::new();
            }
        };
        let kind = if kind.is_empty() {
            "Unknown error"
        } else {
            kind
        };
        self.state = ImageState::Failed {
            src: src.clone(),
            kind: kind.to_owned(),
        };
        self.image = None;
        self.error_message = Some(LOAD_FAILED_MESSAGE.to_owned());
        self.draw();
        error!(component = COMPONENT, "Failed to load image from \"{src}\"");
        vec![HostAction::Emit(SurfaceEvent::Error {
            src,
            error: kind.to_owned(),
            message: LOAD_FAILED_MESSAGE.to_owned(),
        })]
    }
}

impl<S: RasterSurface, R: UniformSource> SurfaceLifecycle for ImageRenderer<S, R> {
    fn observed_keys(&self) -> &'static [ConfigKey] {
        IMAGE_KEYS
    }

    fn on_mount(&mut self, env: HostEnv) -> Vec<HostAction> {
        self.env = env;
        self.mounted = true;
        self.validate_axis(Axis::Width);
        self.validate_axis(Axis::Height);
        self.apply_size();
        self.sync_label();
        if self.is_inert() {
            return Vec::new();
        }

        match self.src_attr().map(str::to_owned) {
            Some(src) => vec![self.request_load(&src)],
            None => {
                self.state = ImageState::Unloaded;
                self.image = None;
                self.error_message = Some(MISSING_SRC_MESSAGE.to_owned());
                error!(component = COMPONENT, "\"src\" attribute is required.");
                self.draw();
                Vec::new()
            }
        }
    }

    fn on_unmount(&mut self) -> Vec<HostAction> {
        self.mounted = false;
        Vec::new()
    }

    fn on_config_changed(
        &mut self,
        key: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> Vec<HostAction> {
        if old == new {
            return Vec::new();
        }
        let Some(key) = ConfigKey::parse(key).filter(|k| IMAGE_KEYS.contains(k)) else {
            return Vec::new();
        };
        self.attrs.set(key, new);

        match key {
            ConfigKey::Src => {
                self.error_message = None;
                if !self.mounted || self.is_inert() {
                    // Picked up by the next mount.
                    self.state = ImageState::Unloaded;
                    self.image = None;
                    return Vec::new();
                }
                match self.src_attr().map(str::to_owned) {
                    Some(src) => vec![self.request_load(&src)],
                    None => {
                        self.state = ImageState::Unloaded;
                        self.image = None;
                        self.draw();
                        Vec::new()
                    }
                }
            }
            ConfigKey::Width | ConfigKey::Height => {
                let axis = if key == ConfigKey::Width {
                    Axis::Width
                } else {
                    Axis::Height
                };
                self.validate_axis(axis);
                self.apply_size();
                if self.mounted {
                    self.draw();
                }
                Vec::new()
            }
            ConfigKey::Alt => {
                self.sync_label();
                Vec::new()
            }
            _ => {
                if self.mounted {
                    self.draw();
                }
                Vec::new()
            }
        }
    }

    fn on_resize(&mut self, env: HostEnv) -> Vec<HostAction> {
        // The image surface has a fixed size; only the ratio matters.
        if env.effective_dpr() != self.env.effective_dpr() {
            self.env = env;
            self.apply_size();
            self.draw();
        }
        Vec::new()
    }

    fn reload(&mut self) -> Vec<HostAction> {
        if self.is_inert() {
            return Vec::new();
        }
        if let ImageState::Loaded { .. } = self.state {
            self.draw();
            return Vec::new();
        }
        match self.src_attr().map(str::to_owned) {
            Some(src) => vec![self.request_load(&src)],
            None if self.state == ImageState::Unloaded => Vec::new(),
            None => {
                self.state = ImageState::Unloaded;
                self.image = None;
                self.error_message = None;
                self.draw();
                Vec::new()
            }
        }
    }
}
