//! BrowserDriver - the browser automation boundary.
//!
//! Everything above this trait (element handles, page objects, assertions)
//! talks to a live page only through these primitives, so the same page
//! objects run against real Chromium ([`crate::browser::ChromiumDriver`],
//! `browser` feature) or the in-process simulation ([`crate::sim::SimDriver`]).

use crate::device::Viewport;
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Keyboard keys used by the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Enter / Return
    Enter,
    /// Escape
    Escape,
    /// Tab (moves focus away)
    Tab,
    /// Backspace
    Backspace,
}

impl Key {
    /// DOM `KeyboardEvent.key` name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Escape => "Escape",
            Self::Tab => "Tab",
            Self::Backspace => "Backspace",
        }
    }
}

impl FromStr for Key {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Enter" => Ok(Self::Enter),
            "Escape" => Ok(Self::Escape),
            "Tab" => Ok(Self::Tab),
            "Backspace" => Ok(Self::Backspace),
            other => Err(ProbeError::InputError {
                message: format!("unsupported key '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulated input on a single element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Single click
    Click,
    /// Double click
    DoubleClick,
    /// Move the pointer over the element
    Hover,
    /// Replace the content of an input
    Fill(String),
    /// Press a key while the element has focus
    Press(Key),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => f.write_str("click"),
            Self::DoubleClick => f.write_str("dblclick"),
            Self::Hover => f.write_str("hover"),
            Self::Fill(text) => write!(f, "fill({text:?})"),
            Self::Press(key) => write!(f, "press({key})"),
        }
    }
}

/// Point-in-time view of one matched element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Lowercase tag name
    pub tag: String,
    /// `textContent`
    pub text: String,
    /// Attributes as rendered
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Current value for form controls
    #[serde(default)]
    pub value: Option<String>,
    /// Checked state for checkboxes
    #[serde(default)]
    pub checked: bool,
    /// Rendered with a non-empty box and not hidden
    pub visible: bool,
}

impl ElementSnapshot {
    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the `class` attribute contains `class` as a whole token
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Console message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    /// console.log / console.info / console.debug
    Log,
    /// console.warn
    Warn,
    /// console.error
    Error,
    /// Uncaught exception or unhandled promise rejection
    #[serde(rename = "pageerror")]
    PageError,
}

/// One recorded console line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Severity
    pub level: ConsoleLevel,
    /// Message text
    pub text: String,
}

impl ConsoleMessage {
    /// Create a console message
    #[must_use]
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    /// Whether this is a `console.error` line
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.level, ConsoleLevel::Error)
    }

    /// Whether this is an uncaught page error
    #[must_use]
    pub const fn is_page_error(&self) -> bool {
        matches!(self.level, ConsoleLevel::PageError)
    }
}

impl fmt::Display for ConsoleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::PageError => "pageerror",
        };
        write!(f, "[{level}] {}", self.text)
    }
}

/// Abstract driver trait for browser automation
///
/// # Implementations
///
/// - `ChromiumDriver` - real Chromium over CDP (`browser` feature)
/// - `SimDriver` - in-process TodoMVC simulation
#[async_trait]
pub trait BrowserDriver: Send + Sync + fmt::Debug {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> ProbeResult<()>;

    /// Current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Resolve a locator against the live DOM. Zero matches is not an error.
    async fn inspect(&self, locator: &Locator) -> ProbeResult<Vec<ElementSnapshot>>;

    /// Perform an action on the single element the locator resolves to
    async fn perform(&self, locator: &Locator, action: &Action) -> ProbeResult<()>;

    /// Capture a PNG screenshot
    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>>;

    /// Serialized HTML of the page
    async fn content(&self) -> ProbeResult<String>;

    /// Console output recorded since the last navigation
    async fn console_messages(&self) -> ProbeResult<Vec<ConsoleMessage>>;

    /// Resize the viewport
    async fn set_viewport(&self, viewport: Viewport) -> ProbeResult<()>;

    /// Release the session
    async fn close(&self) -> ProbeResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_round_trip() {
        for key in [Key::Enter, Key::Escape, Key::Tab, Key::Backspace] {
            assert_eq!(key.as_str().parse::<Key>().unwrap(), key);
        }
        assert!("F13".parse::<Key>().is_err());
    }

    #[test]
    fn test_snapshot_class_tokens() {
        let mut snapshot = ElementSnapshot::default();
        assert!(!snapshot.has_class("completed"));
        snapshot
            .attributes
            .insert("class".to_string(), "editing completed".to_string());
        assert!(snapshot.has_class("completed"));
        assert!(!snapshot.has_class("complete"));
    }

    #[test]
    fn test_snapshot_deserializes_browser_shape() {
        let json = r#"{"tag":"li","text":"a","attributes":{"class":"completed"},"value":null,"checked":false,"visible":true}"#;
        let snapshot: ElementSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.attribute("class"), Some("completed"));
        assert!(snapshot.visible);
    }

    #[test]
    fn test_console_message_display() {
        let msg = ConsoleMessage::new(ConsoleLevel::Error, "boom");
        assert!(msg.is_error());
        assert_eq!(msg.to_string(), "[error] boom");

        let uncaught = ConsoleMessage::new(ConsoleLevel::PageError, "x is undefined");
        assert!(uncaught.is_page_error());
        assert!(!uncaught.is_error());
        assert_eq!(uncaught.to_string(), "[pageerror] x is undefined");
    }

    #[test]
    fn test_console_level_from_hook_json() {
        let json = r#"[{"level":"pageerror","text":"boom"},{"level":"warn","text":"slow"}]"#;
        let messages: Vec<ConsoleMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(messages[0].level, ConsoleLevel::PageError);
        assert_eq!(messages[1].level, ConsoleLevel::Warn);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Fill("x".into()).to_string(), "fill(\"x\")");
        assert_eq!(Action::Press(Key::Tab).to_string(), "press(Tab)");
    }
}
