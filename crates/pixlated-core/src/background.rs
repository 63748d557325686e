#![forbid(unsafe_code)]

//! Grainy flat-color background.
//!
//! The surface is sized from explicit `width`/`height` attributes when both
//! are valid, and from the host's measured layout box otherwise. Every
//! relevant change fills the surface with `color` and runs the grain pass.

use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::RendererConfig;
use crate::composite::composite_grain;
use crate::lifecycle::{Attributes, ConfigKey, HostAction, HostEnv, SurfaceLifecycle};
use crate::noise::{RngSource, UniformSource};
use crate::surface::{RasterSurface, SurfaceSize};
use crate::validate::{parse_leading_int, validate_intensity};

const COMPONENT: &str = "pixlated-bg";

/// Attributes the background renderer reacts to.
pub const BACKGROUND_KEYS: &[ConfigKey] = &[
    ConfigKey::Color,
    ConfigKey::Intensity,
    ConfigKey::Width,
    ConfigKey::Height,
];

/// Effective configuration, as reported by `getConfig()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundSnapshot {
    pub color: String,
    pub intensity: f64,
    /// Surface width in device pixels.
    pub width: u32,
    /// Surface height in device pixels.
    pub height: u32,
}

/// Flat-color grain renderer.
pub struct BackgroundRenderer<S, R = RngSource<StdRng>> {
    surface: Option<S>,
    rng: R,
    config: RendererConfig,
    attrs: Attributes,
    env: HostEnv,
    mounted: bool,
}

impl<S: RasterSurface, R: UniformSource> BackgroundRenderer<S, R> {
    /// Create a renderer. A `None` surface yields an inert renderer.
    pub fn new(surface: Option<S>, rng: R, config: RendererConfig) -> Self {
        if surface.is_none() {
            error!(component = COMPONENT, "Canvas 2D context not supported");
        }
        Self {
            surface,
            rng,
            config,
            attrs: Attributes::default(),
            env: HostEnv::default(),
            mounted: false,
        }
    }

    /// Seed attribute values without triggering a draw.
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

    /// Current fill color, falling back to the configured default.
    #[must_use]
    pub fn color(&self) -> &str {
        match self.attrs.get(ConfigKey::Color) {
            Some(c) if !c.is_empty() => c,
            _ => &self.config.default_color,
        }
    }

    /// Current clamped intensity.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        let validated = validate_intensity(
            self.attrs.get(ConfigKey::Intensity),
            self.config.default_intensity,
        );
        if let Some(diagnostic) = validated.diagnostic {
            if self.config.debug {
                debug!(component = COMPONENT, "{diagnostic}");
            }
        }
        validated.value
    }

    /// Effective configuration snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BackgroundSnapshot {
        let (width, height) = self.surface.as_ref().map_or((0, 0), |s| s.size());
        BackgroundSnapshot {
            color: self.color().to_owned(),
            intensity: self.intensity(),
            width,
            height,
        }
    }

    /// Surface size for the current attributes and environment.
    #[must_use]
    pub fn target_size(&self) -> SurfaceSize {
        let explicit = |key: ConfigKey| {
            let raw = self.attrs.get(key)?;
            let parsed = parse_leading_int(raw).filter(|v| *v > 0);
            if parsed.is_none() && self.config.debug {
                debug!(
                    component = COMPONENT,
                    "Invalid {} \"{raw}\", using measured size",
                    key.as_str()
                );
            }
            parsed.map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        };

        match (explicit(ConfigKey::Width), explicit(ConfigKey::Height)) {
            (Some(w), Some(h)) => SurfaceSize {
                width: self.env.to_device(f64::from(w)),
                height: self.env.to_device(f64::from(h)),
                css_width: Some(w),
                css_height: Some(h),
            },
            _ => SurfaceSize::device(
                self.env.to_device(self.env.box_width),
                self.env.to_device(self.env.box_height),
            ),
        }
    }

    /// Resize the surface to [`target_size`](Self::target_size).
    pub fn update_size(&mut self) {
        let size = self.target_size();
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(size);
        }
    }

    /// Fill and grain the surface.
    pub fn draw(&mut self) {
        let color = self.color().to_owned();
        let intensity = self.intensity();
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.fill(&color);
        if let Err(err) = composite_grain(surface, intensity, &mut self.rng) {
            warn!(component = COMPONENT, %err, "grain pass skipped");
        }
    }
}

impl<S: RasterSurface, R: UniformSource> SurfaceLifecycle for BackgroundRenderer<S, R> {
    fn observed_keys(&self) -> &'static [ConfigKey] {
        BACKGROUND_KEYS
    }

    fn on_mount(&mut self, env: HostEnv) -> Vec<HostAction> {
        self.env = env;
        self.mounted = true;
        self.update_size();
        self.draw();
        vec![HostAction::ObserveResize]
    }

    fn on_unmount(&mut self) -> Vec<HostAction> {
        self.mounted = false;
        vec![HostAction::DisconnectResizeObserver]
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
        let Some(key) = ConfigKey::parse(key).filter(|k| BACKGROUND_KEYS.contains(k)) else {
            return Vec::new();
        };
        self.attrs.set(key, new);

        match key {
            ConfigKey::Width | ConfigKey::Height => {
                self.update_size();
                if self.mounted {
                    self.draw();
                }
            }
            _ => {
                if self.mounted {
                    self.draw();
                }
            }
        }
        Vec::new()
    }

    fn on_resize(&mut self, env: HostEnv) -> Vec<HostAction> {
        self.env = env;
        self.update_size();
        self.draw();
        Vec::new()
    }

    fn reload(&mut self) -> Vec<HostAction> {
        self.draw();
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::FixedSource;
    use crate::surface::{DrawOp, SoftwareSurface};
    use pretty_assertions::assert_eq;

    fn renderer(attrs: Attributes) -> BackgroundRenderer<SoftwareSurface, FixedSource> {
        BackgroundRenderer::new(
            Some(SoftwareSurface::default()),
            FixedSource(1.0),
            RendererConfig::default(),
        )
        .with_attributes(attrs)
    }

    #[test]
    fn mount_sizes_from_measured_box_and_observes_resize() {
        let mut r = renderer(Attributes::default().with(ConfigKey::Intensity, "0"));
        let actions = r.on_mount(HostEnv::new(2.0, 50.0, 20.5));
        assert_eq!(actions, vec![HostAction::ObserveResize]);
        let s = r.surface().unwrap();
        assert_eq!(s.surface_size(), SurfaceSize::device(100, 41));
        assert!(s.pixels().pixels().all(|px| px == [9, 9, 11, 255]));
    }

    #[test]
    fn explicit_dimensions_win_over_measured_box() {
        let attrs = Attributes::default()
            .with(ConfigKey::Width, "30")
            .with(ConfigKey::Height, "10");
        let mut r = renderer(attrs);
        r.on_mount(HostEnv::new(2.0, 500.0, 500.0));
        assert_eq!(
            r.surface().unwrap().surface_size(),
            SurfaceSize {
                width: 60,
                height: 20,
                css_width: Some(30),
                css_height: Some(10),
            }
        );
    }

    #[test]
    fn one_explicit_dimension_falls_back_to_box() {
        let attrs = Attributes::default().with(ConfigKey::Width, "30");
        let mut r = renderer(attrs);
        r.on_mount(HostEnv::new(1.0, 8.0, 4.0));
        assert_eq!(r.surface().unwrap().size(), (8, 4));
    }

    #[test]
    fn invalid_explicit_dimension_falls_back_to_box() {
        let attrs = Attributes::default()
            .with(ConfigKey::Width, "wide")
            .with(ConfigKey::Height, "10");
        let mut r = renderer(attrs);
        r.on_mount(HostEnv::new(1.0, 8.0, 4.0));
        assert_eq!(r.surface().unwrap().size(), (8, 4));
    }

    #[test]
    fn grain_applies_after_fill() {
        let attrs = Attributes::default()
            .with(ConfigKey::Color, "#646464")
            .with(ConfigKey::Intensity, "1");
        let mut r = renderer(attrs);
        r.on_mount(HostEnv::new(1.0, 2.0, 2.0));
        let s = r.surface().unwrap();
        assert!(s.pixels().pixels().all(|px| px == [227, 227, 227, 255]));
    }

    #[test]
    fn color_change_before_mount_does_not_draw() {
        let mut r = renderer(Attributes::default());
        r.on_config_changed("color", None, Some("#fff"));
        assert!(r.surface().unwrap().ops().is_empty());
    }

    #[test]
    fn size_change_before_mount_resizes_without_drawing() {
        let mut r = renderer(Attributes::default().with(ConfigKey::Width, "4"));
        r.on_config_changed("height", None, Some("3"));
        let ops = r.surface().unwrap().ops();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], DrawOp::Resize(_)));
    }

    #[test]
    fn unchanged_or_unknown_attributes_are_ignored() {
        let mut r = renderer(Attributes::default());
        r.on_mount(HostEnv::new(1.0, 2.0, 2.0));
        r.surface_mut().unwrap().take_ops();
        r.on_config_changed("color", Some("red"), Some("red"));
        r.on_config_changed("src", None, Some("x.png"));
        r.on_config_changed("data-foo", None, Some("1"));
        assert!(r.surface().unwrap().ops().is_empty());
        assert_eq!(r.attributes().get(ConfigKey::Src), None);
    }

    #[test]
    fn unmount_disconnects_observer() {
        let mut r = renderer(Attributes::default());
        r.on_mount(HostEnv::default());
        assert_eq!(r.on_unmount(), vec![HostAction::DisconnectResizeObserver]);
        assert!(!r.is_mounted());
    }

    #[test]
    fn resize_recomputes_from_new_box() {
        let mut r = renderer(Attributes::default().with(ConfigKey::Intensity, "0"));
        r.on_mount(HostEnv::new(1.0, 2.0, 2.0));
        r.on_resize(HostEnv::new(1.0, 6.0, 3.0));
        assert_eq!(r.surface().unwrap().size(), (6, 3));
        assert_eq!(r.snapshot().width, 6);
    }

    #[test]
    fn snapshot_reports_effective_values() {
        let attrs = Attributes::default()
            .with(ConfigKey::Color, "")
            .with(ConfigKey::Intensity, "9");
        let mut r = renderer(attrs);
        r.on_mount(HostEnv::new(2.0, 3.0, 4.0));
        assert_eq!(
            r.snapshot(),
            BackgroundSnapshot {
                color: "#09090b".to_owned(),
                intensity: 1.0,
                width: 6,
                height: 8,
            }
        );
    }

    #[test]
    fn inert_renderer_never_draws() {
        let mut r: BackgroundRenderer<SoftwareSurface, FixedSource> =
            BackgroundRenderer::new(None, FixedSource(0.5), RendererConfig::default());
        assert!(r.is_inert());
        assert_eq!(r.on_mount(HostEnv::default()), vec![HostAction::ObserveResize]);
        r.reload();
        assert_eq!(r.snapshot().width, 0);
    }

    #[test]
    fn tainted_readback_keeps_base_fill() {
        let mut r = renderer(Attributes::default().with(ConfigKey::Color, "#102030"));
        r.surface_mut().unwrap().block_readback(true);
        r.on_mount(HostEnv::new(1.0, 2.0, 1.0));
        let s = r.surface().unwrap();
        assert!(s.pixels().pixels().all(|px| px == [16, 32, 48, 255]));
    }
}
