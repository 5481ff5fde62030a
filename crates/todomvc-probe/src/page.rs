//! Page handle: one browser session plus the budgets and sink used with it.
//!
//! `Page` is cheap to clone. Every clone shares the same driver, so element
//! sets built from any clone see the same live DOM.

use crate::capture::ArtifactSink;
use crate::config::Timeouts;
use crate::device::Viewport;
use crate::driver::{BrowserDriver, ConsoleMessage};
use crate::element::ElementSet;
use crate::locator::{AriaRole, Locator, TextMatch};
use crate::result::ProbeResult;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

struct PageInner {
    driver: Arc<dyn BrowserDriver>,
    sink: Arc<dyn ArtifactSink>,
    timeouts: Timeouts,
}

/// A browser page under test
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("driver", &self.inner.driver)
            .field("sink", &self.inner.sink)
            .field("timeouts", &self.inner.timeouts)
            .finish()
    }
}

impl Page {
    /// Bind a page to a driver and an artifact sink
    #[must_use]
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        sink: Arc<dyn ArtifactSink>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            inner: Arc::new(PageInner {
                driver,
                sink,
                timeouts,
            }),
        }
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn BrowserDriver> {
        &self.inner.driver
    }

    /// Attachment sink
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn ArtifactSink> {
        &self.inner.sink
    }

    /// Time budgets
    #[must_use]
    pub fn timeouts(&self) -> &Timeouts {
        &self.inner.timeouts
    }

    /// Navigate to a URL
    pub async fn goto(&self, url: &str) -> ProbeResult<()> {
        debug!(url, "navigate");
        self.inner.driver.navigate(url).await
    }

    /// Current URL
    pub async fn url(&self) -> ProbeResult<String> {
        self.inner.driver.current_url().await
    }

    /// Element set for an arbitrary locator
    #[must_use]
    pub fn element(&self, locator: Locator) -> ElementSet {
        ElementSet::new(self.clone(), locator)
    }

    /// Elements carrying `data-testid="id"`
    #[must_use]
    pub fn get_by_test_id(&self, id: impl Into<String>) -> ElementSet {
        self.element(Locator::test_id(id))
    }

    /// Elements with a role and, optionally, an accessible name
    #[must_use]
    pub fn get_by_role(&self, role: AriaRole, name: Option<TextMatch>) -> ElementSet {
        self.element(Locator::role(role, name))
    }

    /// Deepest elements whose rendered text matches
    #[must_use]
    pub fn get_by_text(&self, text: impl Into<TextMatch>) -> ElementSet {
        self.element(Locator::text(text))
    }

    /// Elements matching a CSS selector
    #[must_use]
    pub fn locator(&self, css: impl Into<String>) -> ElementSet {
        self.element(Locator::css(css))
    }

    /// Resize the viewport
    pub async fn set_viewport(&self, viewport: Viewport) -> ProbeResult<()> {
        debug!(%viewport, "set viewport");
        self.inner.driver.set_viewport(viewport).await
    }

    /// PNG screenshot
    pub async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
        self.inner.driver.screenshot(full_page).await
    }

    /// Serialized HTML
    pub async fn content(&self) -> ProbeResult<String> {
        self.inner.driver.content().await
    }

    /// Console output since the last navigation
    pub async fn console_messages(&self) -> ProbeResult<Vec<ConsoleMessage>> {
        self.inner.driver.console_messages().await
    }

    /// Sleep for a fixed time
    pub async fn wait_for_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Release the browser session
    pub async fn close(&self) -> ProbeResult<()> {
        self.inner.driver.close().await
    }
}
