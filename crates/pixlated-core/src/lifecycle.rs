#![forbid(unsafe_code)]

//! Host lifecycle seam.
//!
//! The host (a custom element, a test, a native window) reports lifecycle
//! and attribute events through [`SurfaceLifecycle`]. Renderers answer with a
//! list of [`HostAction`]s: side effects that only the host can perform.

use std::collections::BTreeMap;

use crate::event::SurfaceEvent;

/// Largest backing store edge, in device pixels, that browsers accept for a
/// 2D canvas.
pub const MAX_DEVICE_DIMENSION: u32 = 32_767;

/// Host-measured environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostEnv {
    /// Device pixel ratio.
    pub dpr: f64,
    /// Measured layout box width in CSS pixels.
    pub box_width: f64,
    /// Measured layout box height in CSS pixels.
    pub box_height: f64,
}

impl Default for HostEnv {
    fn default() -> Self {
        Self {
            dpr: 1.0,
            box_width: 0.0,
            box_height: 0.0,
        }
    }
}

impl HostEnv {
    #[must_use]
    pub const fn new(dpr: f64, box_width: f64, box_height: f64) -> Self {
        Self {
            dpr,
            box_width,
            box_height,
        }
    }

    /// Device pixel ratio, with non-finite or non-positive values as 1.0.
    #[must_use]
    pub fn effective_dpr(&self) -> f64 {
        if self.dpr.is_finite() && self.dpr > 0.0 {
            self.dpr
        } else {
            1.0
        }
    }

    /// Device pixels for `css` CSS pixels, floored and capped at
    /// [`MAX_DEVICE_DIMENSION`].
    #[must_use]
    pub fn to_device(&self, css: f64) -> u32 {
        let px = (css * self.effective_dpr()).floor();
        if px.is_finite() && px > 0.0 {
            px.min(f64::from(MAX_DEVICE_DIMENSION)) as u32
        } else {
            0
        }
    }
}

/// Side effect the host must run on the renderer's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    /// Start delivering `on_resize` for the host element.
    ObserveResize,
    /// Stop delivering `on_resize`.
    DisconnectResizeObserver,
    /// Begin loading `src`; report back with the same `ticket`.
    LoadImage { src: String, ticket: u64 },
    /// Dispatch a bubbling notification from the host element.
    Emit(SurfaceEvent),
}

/// Recognized configuration attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    Color,
    Intensity,
    Width,
    Height,
    Src,
    Alt,
}

impl ConfigKey {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "color" => Self::Color,
            "intensity" => Self::Intensity,
            "width" => Self::Width,
            "height" => Self::Height,
            "src" => Self::Src,
            "alt" => Self::Alt,
            _ => return None,
        };
        Some(key)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Intensity => "intensity",
            Self::Width => "width",
            Self::Height => "height",
            Self::Src => "src",
            Self::Alt => "alt",
        }
    }
}

/// Current attribute values of the host element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: BTreeMap<ConfigKey, String>,
}

impl Attributes {
    #[must_use]
    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Set (`Some`) or remove (`None`) an attribute.
    pub fn set(&mut self, key: ConfigKey, value: Option<&str>) {
        match value {
            Some(v) => {
                self.values.insert(key, v.to_owned());
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: ConfigKey, value: &str) -> Self {
        self.set(key, Some(value));
        self
    }
}

/// Lifecycle callbacks a host adapter forwards to a renderer.
pub trait SurfaceLifecycle {
    /// Recognized attribute names, for host attribute observation.
    fn observed_keys(&self) -> &'static [ConfigKey];

    /// The host element was attached.
    fn on_mount(&mut self, env: HostEnv) -> Vec<HostAction>;

    /// The host element was detached.
    fn on_unmount(&mut self) -> Vec<HostAction>;

    /// An attribute changed. `None` means absent.
    fn on_config_changed(
        &mut self,
        key: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> Vec<HostAction>;

    /// The host element's layout box changed.
    fn on_resize(&mut self, env: HostEnv) -> Vec<HostAction>;

    /// Re-run the draw step.
    fn reload(&mut self) -> Vec<HostAction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_keys_roundtrip_through_names() {
        for key in [
            ConfigKey::Color,
            ConfigKey::Intensity,
            ConfigKey::Width,
            ConfigKey::Height,
            ConfigKey::Src,
            ConfigKey::Alt,
        ] {
            assert_eq!(ConfigKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(ConfigKey::parse("class"), None);
    }

    #[test]
    fn env_scales_css_to_device_pixels() {
        let env = HostEnv::new(2.0, 100.5, 40.0);
        assert_eq!(env.to_device(env.box_width), 201);
        assert_eq!(env.to_device(-3.0), 0);

        let broken = HostEnv::new(f64::NAN, 10.0, 10.0);
        assert_eq!(broken.effective_dpr(), 1.0);
        assert_eq!(broken.to_device(10.0), 10);
    }

    #[test]
    fn device_size_is_capped() {
        let env = HostEnv::new(3.0, 0.0, 0.0);
        assert_eq!(env.to_device(20_000.0), MAX_DEVICE_DIMENSION);
        assert_eq!(env.to_device(f64::from(u32::MAX)), MAX_DEVICE_DIMENSION);
        assert_eq!(env.to_device(f64::INFINITY), 0);
    }

    #[test]
    fn attributes_set_and_remove() {
        let mut attrs = Attributes::default().with(ConfigKey::Src, "a.png");
        assert_eq!(attrs.get(ConfigKey::Src), Some("a.png"));
        attrs.set(ConfigKey::Src, None);
        assert_eq!(attrs.get(ConfigKey::Src), None);
    }
}
