//! Scenario fixture.
//!
//! [`WebAppFixture::setup`] opens the application and hands out a
//! [`WebApp`]. [`WebAppFixture::run`] executes one scenario body and collects
//! diagnostics afterwards:
//!
//! - console errors: "console-error-screenshot" and "console-error"
//! - uncaught page errors: "page-error-screenshot" and "page-error"
//! - failure: "failure-screenshot", "failure-page-html", "console-logs"
//!
//! Collection is best-effort and never changes the scenario outcome.

use crate::app::WebApp;
use crate::capture::{ArtifactSink, DirectorySink, NullSink};
use crate::config::SuiteConfig;
use crate::driver::{BrowserDriver, ConsoleMessage};
use crate::page::Page;
use crate::pages::{PageObject, TodoPage};
use crate::result::ProbeResult;
use crate::ui::screenshot_to_scenario;
use futures::future::LocalBoxFuture;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Attachment taken right after the application loaded
pub const AFTER_PAGE_LOAD: &str = "After page load";

/// Sink for `config`: a [`DirectorySink`] when an artifacts directory is set
#[must_use]
pub fn sink_for(config: &SuiteConfig) -> Arc<dyn ArtifactSink> {
    match &config.artifacts_dir {
        Some(dir) => Arc::new(DirectorySink::new(dir)),
        None => Arc::new(NullSink),
    }
}

/// Loaded application plus per-scenario diagnostics
#[derive(Debug)]
pub struct WebAppFixture {
    app: WebApp,
}

impl WebAppFixture {
    /// Open `config.base_url` on `driver` and wait for the app to render
    pub async fn setup(
        driver: Arc<dyn BrowserDriver>,
        sink: Arc<dyn ArtifactSink>,
        config: &SuiteConfig,
    ) -> ProbeResult<Self> {
        let page = Page::new(driver, sink, config.timeouts());
        if let Some(device) = config.device_descriptor()? {
            page.set_viewport(device.viewport).await?;
        }
        page.goto(&config.base_url).await?;

        let app = WebApp::init(page);
        app.todo_page().wait_until_loaded().await?;
        info!(url = %config.base_url, page = app.todo_page().page_name(), "application loaded");
        screenshot_to_scenario(app.page(), AFTER_PAGE_LOAD).await;
        Ok(Self { app })
    }

    /// Launch Chromium from `config` and set up on it
    #[cfg(feature = "browser")]
    pub async fn launch(config: &SuiteConfig) -> ProbeResult<Self> {
        let driver = crate::browser::ChromiumDriver::launch(config.browser_config()?).await?;
        Self::setup(Arc::new(driver), sink_for(config), config).await
    }

    /// The application
    #[must_use]
    pub const fn app(&self) -> &WebApp {
        &self.app
    }

    /// Shortcut for `app().page()`
    #[must_use]
    pub const fn page(&self) -> &Page {
        self.app.page()
    }

    /// Shortcut for `app().todo_page()`
    #[must_use]
    pub const fn todo_page(&self) -> &TodoPage {
        self.app.todo_page()
    }

    /// Run a scenario body inside a `scenario` span, then collect diagnostics.
    /// The body's result is returned unchanged.
    pub async fn run<F>(&self, name: &str, body: F) -> ProbeResult<()>
    where
        F: for<'a> FnOnce(&'a WebApp) -> LocalBoxFuture<'a, ProbeResult<()>>,
    {
        let span = info_span!("scenario", name);
        let outcome = body(&self.app).instrument(span.clone()).await;
        self.collect_diagnostics(&outcome).instrument(span).await;
        outcome
    }

    async fn collect_diagnostics(&self, outcome: &ProbeResult<()>) {
        let page = self.app.page();
        match page.console_messages().await {
            Ok(messages) => {
                let errors = texts(&messages, ConsoleMessage::is_error);
                if !errors.is_empty() {
                    warn!(count = errors.len(), "console errors during scenario");
                    page.attach_screenshot("console-error-screenshot").await;
                    page.attach_text("console-error", errors.join("\n"));
                }
                let uncaught = texts(&messages, ConsoleMessage::is_page_error);
                if !uncaught.is_empty() {
                    warn!(count = uncaught.len(), "uncaught page errors during scenario");
                    page.attach_screenshot("page-error-screenshot").await;
                    page.attach_text("page-error", uncaught.join("\n"));
                }
            }
            Err(e) => warn!(error = %e, "failed to read console messages"),
        }

        match outcome {
            Ok(()) => info!("scenario passed"),
            Err(e) => {
                warn!(error = %e, "scenario failed");
                page.attach_screenshot("failure-screenshot").await;
                page.attach_html("failure-page-html").await;
                page.attach_console_logs("console-logs").await;
            }
        }
    }

    /// Close the page
    pub async fn teardown(self) -> ProbeResult<()> {
        self.app.page().close().await
    }
}

fn texts(messages: &[ConsoleMessage], keep: fn(&ConsoleMessage) -> bool) -> Vec<String> {
    messages
        .iter()
        .filter(|m| keep(m))
        .map(|m| m.text.clone())
        .collect()
}
