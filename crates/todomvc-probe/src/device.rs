//! Viewports and device descriptors for emulation.

use serde::{Deserialize, Serialize};

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a new viewport
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Create a landscape version of this viewport
    #[must_use]
    pub const fn landscape(self) -> Self {
        if self.width > self.height {
            self
        } else {
            Self {
                width: self.height,
                height: self.width,
            }
        }
    }

    /// Create a portrait version of this viewport
    #[must_use]
    pub const fn portrait(self) -> Self {
        if self.height > self.width {
            self
        } else {
            Self {
                width: self.height,
                height: self.width,
            }
        }
    }

    /// Check if viewport is in landscape orientation
    #[must_use]
    pub const fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        DeviceDescriptor::DESKTOP_CHROME.viewport
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Device descriptor for emulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceDescriptor {
    /// Device name
    pub name: &'static str,
    /// Viewport in the default orientation
    pub viewport: Viewport,
    /// Device scale factor
    pub device_scale_factor: f64,
    /// Is mobile device
    pub is_mobile: bool,
    /// Has touch support
    pub has_touch: bool,
    /// Default user agent
    pub user_agent: &'static str,
}

impl DeviceDescriptor {
    /// iPhone 12
    pub const IPHONE_12: Self = Self {
        name: "iPhone 12",
        viewport: Viewport::new(390, 844),
        device_scale_factor: 3.0,
        is_mobile: true,
        has_touch: true,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 14_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Mobile/15E148 Safari/604.1",
    };

    /// Desktop Chrome
    pub const DESKTOP_CHROME: Self = Self {
        name: "Desktop Chrome",
        viewport: Viewport::new(1280, 720),
        device_scale_factor: 1.0,
        is_mobile: false,
        has_touch: false,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    };

    /// All known presets
    pub const ALL: [Self; 2] = [Self::IPHONE_12, Self::DESKTOP_CHROME];

    /// Look up a preset by name, ignoring case, spaces and dashes
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        let key = |s: &str| {
            s.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        };
        let wanted = key(name);
        Self::ALL.into_iter().find(|d| key(d.name) == wanted)
    }
}
