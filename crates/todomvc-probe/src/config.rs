//! Suite configuration.
//!
//! Values come from defaults, then an optional YAML file, then environment
//! variables:
//!
//! | variable | field |
//! |---|---|
//! | `TODOMVC_PROBE_BASE_URL` | `base_url` |
//! | `TODOMVC_PROBE_HEADLESS` | `headless` (`true`/`false`/`1`/`0`) |
//! | `TODOMVC_PROBE_ARTIFACTS_DIR` | `artifacts_dir` |
//! | `TODOMVC_PROBE_DEVICE` | `device` (preset name) |
//! | `CHROMIUM_PATH` | `chromium_path` |

use crate::device::{DeviceDescriptor, Viewport};
use crate::result::{ProbeError, ProbeResult};
use crate::retry::{RetryConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public React TodoMVC build
pub const DEFAULT_BASE_URL: &str = "https://todomvc.com/examples/react/dist/";

/// Environment variable names
pub mod env {
    /// Application URL
    pub const BASE_URL: &str = "TODOMVC_PROBE_BASE_URL";
    /// Headless toggle
    pub const HEADLESS: &str = "TODOMVC_PROBE_HEADLESS";
    /// Directory for failure artifacts
    pub const ARTIFACTS_DIR: &str = "TODOMVC_PROBE_ARTIFACTS_DIR";
    /// Device preset
    pub const DEVICE: &str = "TODOMVC_PROBE_DEVICE";
    /// Chromium binary
    pub const CHROMIUM_PATH: &str = "CHROMIUM_PATH";
}

/// Time budgets used by element handles and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// How long an action or strict read waits for its element
    pub action: Duration,
    /// Interval between resolution attempts while waiting
    pub poll_interval: Duration,
    /// Retry budget for assertions
    pub expect: RetryConfig,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            expect: RetryConfig::default(),
        }
    }
}

impl Timeouts {
    /// Short budgets for in-process tests
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            action: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
            expect: RetryConfig::fast(),
        }
    }
}

/// Settings for launching Chromium
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Initial viewport
    pub viewport: Viewport,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent override
    pub user_agent: Option<String>,
    /// Device pixel ratio
    pub device_scale_factor: f64,
    /// Emulate a mobile device
    pub mobile: bool,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            chromium_path: None,
            user_agent: None,
            device_scale_factor: 1.0,
            mobile: false,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Disable sandbox
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Configuration for a scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Application URL
    pub base_url: String,
    /// Run the browser headless
    pub headless: bool,
    /// Where `DirectorySink` writes attachments
    pub artifacts_dir: Option<PathBuf>,
    /// Device preset name (e.g. "iPhone 12")
    pub device: Option<String>,
    /// Chromium binary
    pub chromium_path: Option<String>,
    /// Action timeout in milliseconds
    pub action_timeout_ms: u64,
    /// Assertion timeout in milliseconds
    pub expect_timeout_ms: u64,
    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            artifacts_dir: None,
            device: None,
            chromium_path: None,
            action_timeout_ms: DEFAULT_TIMEOUT_MS,
            expect_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SuiteConfig {
    /// Parse from YAML. Missing fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| ProbeError::ConfigError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ProbeError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Defaults, optionally a file, then the process environment
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> ProbeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(env::BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(env::HEADLESS) {
            self.headless = parse_bool(&raw).ok_or_else(|| ProbeError::ConfigError {
                message: format!("{} must be a boolean, got '{raw}'", env::HEADLESS),
            })?;
        }
        if let Some(dir) = lookup(env::ARTIFACTS_DIR) {
            self.artifacts_dir = Some(PathBuf::from(dir));
        }
        if let Some(device) = lookup(env::DEVICE) {
            self.device = Some(device);
        }
        if let Some(path) = lookup(env::CHROMIUM_PATH) {
            self.chromium_path = Some(path);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> ProbeResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ProbeError::ConfigError {
                message: "base_url must not be empty".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::ConfigError {
                message: "poll_interval_ms must be positive".to_string(),
            });
        }
        self.device_descriptor().map(|_| ())
    }

    /// Resolve the configured device preset
    pub fn device_descriptor(&self) -> ProbeResult<Option<DeviceDescriptor>> {
        match &self.device {
            None => Ok(None),
            Some(name) => DeviceDescriptor::by_name(name)
                .map(Some)
                .ok_or_else(|| ProbeError::ConfigError {
                    message: format!("unknown device '{name}'"),
                }),
        }
    }

    /// Time budgets for pages
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        let poll_interval = Duration::from_millis(self.poll_interval_ms);
        Timeouts {
            action: Duration::from_millis(self.action_timeout_ms),
            poll_interval,
            expect: RetryConfig::new(Duration::from_millis(self.expect_timeout_ms))
                .with_poll_interval(poll_interval),
        }
    }

    /// Launch settings for Chromium
    pub fn browser_config(&self) -> ProbeResult<BrowserConfig> {
        let mut config = BrowserConfig::default().with_headless(self.headless);
        config.chromium_path.clone_from(&self.chromium_path);
        if let Some(device) = self.device_descriptor()? {
            config.viewport = device.viewport;
            config.user_agent = Some(device.user_agent.to_string());
            config.device_scale_factor = device.device_scale_factor;
            config.mobile = device.is_mobile;
        }
        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
