use serde::{Deserialize, Serialize};

/// Viewport configuration for controlling page dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Device scale factor (DPR). Higher values (e.g., 2.0) produce sharper images.
    /// Default is 1.0.
    #[serde(default = "default_scale")]
    pub device_scale_factor: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for Viewport {
    /// Large enough that wide or tall snippets are never clipped by the window.
    fn default() -> Self {
        Self {
            width: 8192,
            height: 2048,
            device_scale_factor: 1.0,
        }
    }
}

impl Viewport {
    /// Creates a new viewport with specified dimensions and a scale factor of 1.0.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_device_scale_factor(mut self, factor: f64) -> Self {
        self.device_scale_factor = factor;
        self
    }
}

/// Options for an element screenshot. Images are always PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    pub(crate) omit_background: bool,
}

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the page background transparent while capturing.
    pub fn with_omit_background(mut self, omit: bool) -> Self {
        self.omit_background = omit;
        self
    }

    pub fn omit_background(&self) -> bool {
        self.omit_background
    }
}

/// Screenshot clip computed from a CSS border box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ClipRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ClipRegion {
    /// Builds the clip from the eight-number `border` quad returned by `DOM.getBoxModel`.
    pub(crate) fn from_quad(quad: &[f64]) -> Option<Self> {
        let [x0, y0, x1, _, _, y2, ..] = quad else {
            return None;
        };
        Some(Self {
            x: *x0,
            y: *y0,
            width: x1 - x0,
            height: y2 - y0,
        })
    }
}
