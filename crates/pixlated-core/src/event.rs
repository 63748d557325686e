#![forbid(unsafe_code)]

//! Notifications emitted by the image renderer.

use serde::Serialize;

/// Event name for a successful image load.
pub const LOADED_EVENT: &str = "pixlated:loaded";
/// Event name for a failed image load.
pub const ERROR_EVENT: &str = "pixlated:error";

/// Observable surface notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SurfaceEvent {
    /// Image decoded; dimensions are the image's natural size.
    Loaded { src: String, width: u32, height: u32 },
    /// Image failed to load; `error` is the host's error kind.
    Error {
        src: String,
        error: String,
        message: String,
    },
}

impl SurfaceEvent {
    /// DOM event type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Loaded { .. } => LOADED_EVENT,
            Self::Error { .. } => ERROR_EVENT,
        }
    }

    /// Event `detail` payload as JSON.
    #[must_use]
    pub fn detail_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned())
    }
}
