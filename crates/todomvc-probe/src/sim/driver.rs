//! [`BrowserDriver`] over the in-process TodoMVC model.

use super::dom::Document;
use super::todomvc::{Route, TodoApp, Todo};
use crate::config::DEFAULT_BASE_URL;
use crate::device::Viewport;
use crate::driver::{Action, BrowserDriver, ConsoleMessage, ElementSnapshot};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// PNG file signature, prefixed to every fake screenshot
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug)]
struct SimState {
    url: String,
    app: TodoApp,
    /// What reads currently observe; lags `app` while `stale_reads > 0`
    shown: Document,
    stale_reads: usize,
    settle_frames: usize,
    viewport: Viewport,
    console: Vec<ConsoleMessage>,
    fail_screenshots: bool,
    closed: bool,
}

impl SimState {
    fn fresh(url: &str) -> Self {
        let app = TodoApp::new(route_of(url));
        Self {
            url: url.to_string(),
            shown: app.render(),
            app,
            stale_reads: 0,
            settle_frames: 0,
            viewport: Viewport::default(),
            console: Vec::new(),
            fail_screenshots: false,
            closed: false,
        }
    }

    /// Document for the next read, advancing the settle counter
    fn observe(&mut self) -> &Document {
        if self.stale_reads > 0 {
            self.stale_reads -= 1;
        } else {
            self.shown = self.app.render();
        }
        &self.shown
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.closed {
            return Err(ProbeError::PageError {
                message: "page has been closed".to_string(),
            });
        }
        Ok(())
    }
}

fn route_of(url: &str) -> Route {
    url.split_once('#')
        .map_or(Route::All, |(_, fragment)| Route::from_fragment(fragment))
}

/// Simulated browser session running TodoMVC in process
///
/// Reads see the DOM as rendered; input acts on the live state. With
/// [`SimDriver::set_settle_frames`] reads keep returning the pre-action DOM for
/// that many calls after each action, like a slow render pipeline.
#[derive(Debug)]
pub struct SimDriver {
    state: Mutex<SimState>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Session with the app already loaded at the default URL
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::fresh(DEFAULT_BASE_URL)),
        }
    }

    fn lock(&self) -> ProbeResult<MutexGuard<'_, SimState>> {
        self.state.lock().map_err(|e| ProbeError::PageError {
            message: e.to_string(),
        })
    }

    /// Number of stale reads after every action
    pub fn set_settle_frames(&self, frames: usize) {
        if let Ok(mut state) = self.lock() {
            state.settle_frames = frames;
        }
    }

    /// Make screenshots fail
    pub fn fail_screenshots(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_screenshots = fail;
        }
    }

    /// Record a console message as if the page had logged it
    pub fn push_console(&self, message: ConsoleMessage) {
        if let Ok(mut state) = self.lock() {
            state.console.push(message);
        }
    }

    /// Current viewport
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.lock().map(|s| s.viewport).unwrap_or_default()
    }

    /// Model state, bypassing the rendered DOM
    #[must_use]
    pub fn todos(&self) -> Vec<Todo> {
        self.lock().map(|s| s.app.todos().to_vec()).unwrap_or_default()
    }
}

#[async_trait]
impl BrowserDriver for SimDriver {
    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        if url.trim().is_empty() {
            return Err(ProbeError::NavigationError {
                url: url.to_string(),
                message: "empty URL".to_string(),
            });
        }
        let mut state = self.lock()?;
        state.ensure_open()?;
        let settle_frames = state.settle_frames;
        let viewport = state.viewport;
        let fail_screenshots = state.fail_screenshots;
        *state = SimState {
            settle_frames,
            viewport,
            fail_screenshots,
            ..SimState::fresh(url)
        };
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let state = self.lock()?;
        state.ensure_open()?;
        Ok(state.url.clone())
    }

    async fn inspect(&self, locator: &Locator) -> ProbeResult<Vec<ElementSnapshot>> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        let stale = state.stale_reads > 0;
        let snapshots = state.observe().inspect(locator)?;
        trace!(%locator, matches = snapshots.len(), stale, "inspect");
        Ok(snapshots)
    }

    async fn perform(&self, locator: &Locator, action: &Action) -> ProbeResult<()> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        let live = state.app.render();
        let paths = live.resolve(locator)?;
        let path = match paths.as_slice() {
            [] => {
                return Err(ProbeError::ElementNotFound {
                    locator: locator.to_string(),
                })
            }
            [path] => path,
            _ => {
                return Err(ProbeError::StrictModeViolation {
                    locator: locator.to_string(),
                    count: paths.len(),
                })
            }
        };
        if !live.is_visible(path) {
            return Err(ProbeError::NotActionable {
                locator: locator.to_string(),
                reason: "element is not visible".to_string(),
            });
        }
        if let Some(route) = state.app.dispatch(&live, path, action)? {
            let base = state
                .url
                .split_once('#')
                .map_or(state.url.as_str(), |(base, _)| base)
                .to_string();
            state.url = format!("{base}{}", route.href());
        }
        state.stale_reads = state.settle_frames;
        Ok(())
    }

    async fn screenshot(&self, _full_page: bool) -> ProbeResult<Vec<u8>> {
        let state = self.lock()?;
        state.ensure_open()?;
        if state.fail_screenshots {
            return Err(ProbeError::ScreenshotError {
                message: "screenshot capture disabled".to_string(),
            });
        }
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(format!("sim {}", state.viewport).as_bytes());
        Ok(png)
    }

    async fn content(&self) -> ProbeResult<String> {
        let state = self.lock()?;
        state.ensure_open()?;
        Ok(state.app.render().to_html())
    }

    async fn console_messages(&self) -> ProbeResult<Vec<ConsoleMessage>> {
        let state = self.lock()?;
        state.ensure_open()?;
        Ok(state.console.clone())
    }

    async fn set_viewport(&self, viewport: Viewport) -> ProbeResult<()> {
        if viewport.width == 0 || viewport.height == 0 {
            return Err(ProbeError::PageError {
                message: format!("invalid viewport {viewport}"),
            });
        }
        let mut state = self.lock()?;
        state.ensure_open()?;
        state.viewport = viewport;
        Ok(())
    }

    async fn close(&self) -> ProbeResult<()> {
        self.lock()?.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ConsoleLevel, Key};

    async fn add(driver: &SimDriver, title: &str) {
        let input = Locator::test_id("text-input");
        driver
            .perform(&input, &Action::Fill(title.to_string()))
            .await
            .unwrap();
        driver.perform(&input, &Action::Press(Key::Enter)).await.unwrap();
    }

    #[tokio::test]
    async fn test_reads_lag_by_settle_frames() {
        let driver = SimDriver::new();
        driver.set_settle_frames(2);
        add(&driver, "Buy milk").await;
        let labels = Locator::test_id("todo-item-label");
        assert_eq!(driver.inspect(&labels).await.unwrap().len(), 0);
        assert_eq!(driver.inspect(&labels).await.unwrap().len(), 0);
        assert_eq!(driver.inspect(&labels).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_perform_checks_target() {
        let driver = SimDriver::new();
        let missing = driver
            .perform(&Locator::test_id("todo-item"), &Action::Click)
            .await
            .unwrap_err();
        assert!(matches!(missing, ProbeError::ElementNotFound { .. }));

        add(&driver, "a1").await;
        let hidden = driver
            .perform(&Locator::test_id("todo-item-button"), &Action::Click)
            .await
            .unwrap_err();
        assert!(matches!(hidden, ProbeError::NotActionable { .. }));
    }

    #[tokio::test]
    async fn test_filter_click_updates_url() {
        let driver = SimDriver::new();
        add(&driver, "a1").await;
        driver
            .perform(&Locator::css("a[href='#/completed']"), &Action::Click)
            .await
            .unwrap();
        assert_eq!(
            driver.current_url().await.unwrap(),
            format!("{DEFAULT_BASE_URL}#/completed")
        );
    }

    #[tokio::test]
    async fn test_navigate_resets_app_and_console() {
        let driver = SimDriver::new();
        add(&driver, "a1").await;
        driver.push_console(ConsoleMessage::new(ConsoleLevel::Error, "boom"));
        driver
            .navigate("http://localhost/#/active")
            .await
            .unwrap();
        assert!(driver.todos().is_empty());
        assert!(driver.console_messages().await.unwrap().is_empty());
        assert!(driver.navigate("  ").await.is_err());
    }

    #[tokio::test]
    async fn test_screenshot_and_viewport() {
        let driver = SimDriver::new();
        driver.set_viewport(Viewport::new(390, 844)).await.unwrap();
        let png = driver.screenshot(true).await.unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        assert_eq!(driver.viewport(), Viewport::new(390, 844));
        assert!(driver.set_viewport(Viewport::new(0, 10)).await.is_err());

        driver.fail_screenshots(true);
        assert!(driver.screenshot(true).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_calls() {
        let driver = SimDriver::new();
        driver.close().await.unwrap();
        assert!(matches!(
            driver.content().await.unwrap_err(),
            ProbeError::PageError { .. }
        ));
    }
}
