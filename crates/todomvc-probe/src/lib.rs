//! todomvc-probe: page objects and retrying assertions for TodoMVC
//!
//! Scenarios drive the React TodoMVC build through a [`BrowserDriver`]:
//! [`ChromiumDriver`] over CDP (feature `browser`) or the in-process
//! [`sim::SimDriver`].
//!
//! ```text
//! scenario ──► WebAppFixture ──► WebApp ──► TodoPage ──► TodoItems
//!                   │                          │
//!                   ▼                          ▼
//!             ArtifactSink ◄──── Page ──► ElementSet ──► BrowserDriver
//!                                           │
//!                                           ▼
//!                                   ElementExpect (retry)
//! ```
//!
//! Elements are never cached. Each read or action resolves its [`Locator`]
//! against the live page, single-element operations are strict, and every
//! `expect_*` assertion polls until it holds or its budget runs out.

#![warn(missing_docs)]

mod app;
#[cfg(feature = "browser")]
mod browser;
mod capture;
mod config;
mod device;
mod driver;
mod element;
mod expect;
mod fixture;
mod locator;
mod page;
pub mod pages;
mod result;
mod retry;
pub mod sim;
mod ui;

pub use app::{PageFactory, WebApp};
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use capture::{
    ArtifactSink, Attachment, DirectorySink, MemorySink, NullSink, MIME_HTML, MIME_PNG, MIME_TEXT,
};
pub use config::{env, BrowserConfig, SuiteConfig, Timeouts, DEFAULT_BASE_URL};
pub use device::{DeviceDescriptor, Viewport};
pub use driver::{Action, BrowserDriver, ConsoleLevel, ConsoleMessage, ElementSnapshot, Key};
pub use element::{ElementSet, ElementState};
pub use expect::{ElementExpect, Expectation};
pub use fixture::{sink_for, WebAppFixture, AFTER_PAGE_LOAD};
pub use locator::{normalize_whitespace, AriaRole, Locator, Selector, Step, TextMatch, TextPattern};
pub use page::Page;
pub use pages::{EditCommit, PageObject, TodoFilter, TodoItems, TodoPage, ToggleOutcome};
pub use result::{ProbeError, ProbeResult};
pub use retry::{retry, Attempt, RetryConfig, RetryError};
pub use ui::{rotate_device, screenshot_to_scenario, LANDSCAPE, PORTRAIT};

/// Everything a scenario usually needs
pub mod prelude {
    pub use crate::{
        init_tracing, rotate_device, screenshot_to_scenario, AriaRole, ArtifactSink, Attachment,
        BrowserDriver, EditCommit, ElementSet, ElementState, Key, MemorySink, Page, PageFactory,
        PageObject, ProbeError, ProbeResult, SuiteConfig, TextMatch, Timeouts, TodoFilter,
        TodoPage, ToggleOutcome, Viewport, WebApp, WebAppFixture,
    };
}

use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "todomvc_probe=info";

static TRACING_INIT: Once = Once::new();

/// Install a compact stderr subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything, and
/// an already-installed global subscriber is left alone.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_test_writer()
                    .compact(),
            )
            .try_init();
    });
}

/// Emit one JSON object per event instead of compact text. Same rules as
/// [`init_tracing`]; whichever runs first wins.
pub fn init_json_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init();
    });
}
