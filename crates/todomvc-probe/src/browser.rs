//! Chromium over CDP.
//!
//! Locators are compiled to JavaScript with [`Locator::to_script`] and
//! evaluated in the page. For input, the single match is tagged with a
//! one-off marker attribute, re-found through CDP and driven with trusted
//! input events, so page handlers see the same events a user produces.

#![allow(
    clippy::significant_drop_tightening,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

use crate::config::BrowserConfig;
use crate::device::Viewport;
use crate::driver::{Action, BrowserDriver, ConsoleMessage, ElementSnapshot};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::element::Element as CdpElement;
use chromiumoxide::page::{Page as CdpPage, ScreenshotParams};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Attribute used to hand a resolved element over to CDP
const TARGET_ATTR: &str = "data-probe-target";

/// Records console output and uncaught errors into `window.consoleLogs`
const CONSOLE_HOOK: &str = r"
(() => {
  if (window.__probeConsoleHooked) return;
  window.__probeConsoleHooked = true;
  window.consoleLogs = [];
  const fmt = (a) => {
    if (typeof a === 'string') return a;
    try { return JSON.stringify(a); } catch (_) { return String(a); }
  };
  const record = (level, args) =>
    window.consoleLogs.push({ level, text: Array.from(args).map(fmt).join(' ') });
  for (const [method, level] of [['log', 'log'], ['info', 'log'], ['debug', 'log'],
                                 ['warn', 'warn'], ['error', 'error']]) {
    const original = console[method].bind(console);
    console[method] = (...args) => { record(level, args); original(...args); };
  }
  window.addEventListener('error', (e) => record('pageerror', [e.message]));
  window.addEventListener('unhandledrejection', (e) => record('pageerror', [String(e.reason)]));
})();
";

/// Maps each match to the shape of [`ElementSnapshot`]
const SNAPSHOT_BODY: &str = r"
return matches.map((el) => {
  const attributes = {};
  for (const a of Array.from(el.attributes)) attributes[a.name] = a.value;
  const rect = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  const isControl = ['INPUT', 'TEXTAREA', 'SELECT'].includes(el.tagName);
  return {
    tag: el.tagName.toLowerCase(),
    text: el.textContent || '',
    attributes,
    value: isControl ? el.value : null,
    checked: !!el.checked,
    visible: rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden',
  };
});
";

/// Chromium session driven through chromiumoxide
pub struct ChromiumDriver {
    config: BrowserConfig,
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    handle: tokio::task::JoinHandle<()>,
}

impl fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromiumDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn page_error(e: impl fmt::Display) -> ProbeError {
    ProbeError::PageError {
        message: e.to_string(),
    }
}

fn input_error(e: impl fmt::Display) -> ProbeError {
    ProbeError::InputError {
        message: e.to_string(),
    }
}

impl ChromiumDriver {
    /// Launch Chromium and open one page with the console hook installed
    pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
        let mut builder = CdpConfig::builder().window_size(config.viewport.width, config.viewport.height);

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        if let Some(ref ua) = config.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }

        let cdp_config = builder
            .build()
            .map_err(|e| ProbeError::BrowserLaunchError { message: e })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(page_error)?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(CONSOLE_HOOK))
            .await
            .map_err(page_error)?;

        info!(headless = config.headless, viewport = %config.viewport, "chromium launched");

        let driver = Self {
            config,
            browser: Mutex::new(browser),
            page,
            handle,
        };
        driver.set_viewport(driver.config.viewport).await?;
        Ok(driver)
    }

    /// Launch settings
    #[must_use]
    pub const fn config(&self) -> &BrowserConfig {
        &self.config
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> ProbeResult<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ProbeError::ScriptError {
                message: e.to_string(),
            })?;
        result.into_value().map_err(|e| ProbeError::ScriptError {
            message: e.to_string(),
        })
    }

    /// Mark the single match of `locator` and return it as a CDP element
    async fn target(&self, locator: &Locator) -> ProbeResult<CdpElement> {
        let mark = uuid::Uuid::new_v4().to_string();
        let body = format!(
            "document.querySelectorAll('[{TARGET_ATTR}]').forEach((el) => el.removeAttribute('{TARGET_ATTR}'));
if (matches.length !== 1) return matches.length;
matches[0].setAttribute('{TARGET_ATTR}', '{mark}');
matches[0].scrollIntoView({{ block: 'center', inline: 'center' }});
return 1;"
        );
        let count: usize = self.eval(locator.to_script(&body)?).await?;
        match count {
            0 => Err(ProbeError::ElementNotFound {
                locator: locator.to_string(),
            }),
            1 => self
                .page
                .find_element(format!("[{TARGET_ATTR}=\"{mark}\"]"))
                .await
                .map_err(|e| ProbeError::NotActionable {
                    locator: locator.to_string(),
                    reason: e.to_string(),
                }),
            count => Err(ProbeError::StrictModeViolation {
                locator: locator.to_string(),
                count,
            }),
        }
    }

    async fn double_click(&self, element: &CdpElement) -> ProbeResult<()> {
        let point = element.clickable_point().await.map_err(input_error)?;
        for clicks in 1..=2 {
            for kind in [
                DispatchMouseEventType::MousePressed,
                DispatchMouseEventType::MouseReleased,
            ] {
                let params = DispatchMouseEventParams::builder()
                    .r#type(kind)
                    .x(point.x)
                    .y(point.y)
                    .button(MouseButton::Left)
                    .click_count(clicks)
                    .build()
                    .map_err(input_error)?;
                self.page.execute(params).await.map_err(input_error)?;
            }
        }
        Ok(())
    }

    async fn fill(&self, element: &CdpElement, text: &str) -> ProbeResult<()> {
        element.focus().await.map_err(input_error)?;
        let select = format!(
            "(() => {{ const el = document.querySelector('[{TARGET_ATTR}]'); if (el && el.select) el.select(); return true; }})()"
        );
        let _: bool = self.eval(select).await?;
        if text.is_empty() {
            element.press_key("Backspace").await.map_err(input_error)?;
        } else {
            self.page
                .execute(InsertTextParams::new(text))
                .await
                .map_err(input_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ProbeError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(page_error)?
            .unwrap_or_default())
    }

    async fn inspect(&self, locator: &Locator) -> ProbeResult<Vec<ElementSnapshot>> {
        self.eval(locator.to_script(SNAPSHOT_BODY)?).await
    }

    async fn perform(&self, locator: &Locator, action: &Action) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        debug!(%locator, %action, "cdp input");
        match action {
            Action::Click => element.click().await.map(|_| ()).map_err(input_error),
            Action::Hover => element.hover().await.map(|_| ()).map_err(input_error),
            Action::DoubleClick => self.double_click(&element).await,
            Action::Fill(text) => self.fill(&element, text).await,
            Action::Press(key) => element
                .press_key(key.as_str())
                .await
                .map(|_| ())
                .map_err(input_error),
        }
    }

    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| ProbeError::ScreenshotError {
                message: e.to_string(),
            })
    }

    async fn content(&self) -> ProbeResult<String> {
        self.page.content().await.map_err(page_error)
    }

    async fn console_messages(&self) -> ProbeResult<Vec<ConsoleMessage>> {
        self.eval("window.consoleLogs || []".to_string()).await
    }

    async fn set_viewport(&self, viewport: Viewport) -> ProbeResult<()> {
        let params = SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            self.config.device_scale_factor,
            self.config.mobile,
        );
        self.page.execute(params).await.map_err(page_error)?;
        Ok(())
    }

    async fn close(&self) -> ProbeResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| ProbeError::BrowserLaunchError {
                message: e.to_string(),
            })?;
        self.handle.abort();
        Ok(())
    }
}
