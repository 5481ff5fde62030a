//! Live element handles.
//!
//! An [`ElementSet`] pairs a [`Locator`] with a [`Page`]. Chaining methods
//! return new sets without touching the page. Reads and actions resolve the
//! locator at call time.
//!
//! Single-element operations are strict. Zero or several matches are retried
//! until the action timeout, since a render that has not settled can still
//! show a removed row. If the last poll still saw several matches the
//! operation fails with [`ProbeError::StrictModeViolation`], otherwise with
//! [`ProbeError::Timeout`].

use crate::driver::{Action, ElementSnapshot, Key};
use crate::expect::ElementExpect;
use crate::locator::{AriaRole, Locator, Selector, TextMatch};
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::retry::{retry, Attempt, RetryConfig};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// States accepted by [`ElementSet::wait_for`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// At least one element matches
    Attached,
    /// No element matches
    Detached,
    /// At least one match is visible
    Visible,
    /// No match is visible (including no match at all)
    Hidden,
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        })
    }
}

/// Handle over the elements a locator resolves to
#[derive(Debug, Clone)]
pub struct ElementSet {
    page: Page,
    locator: Locator,
}

impl ElementSet {
    /// Bind a locator to a page
    #[must_use]
    pub const fn new(page: Page, locator: Locator) -> Self {
        Self { page, locator }
    }

    /// The query this set resolves
    #[must_use]
    pub const fn query(&self) -> &Locator {
        &self.locator
    }

    /// The page this set reads from
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    fn derive(&self, locator: Locator) -> Self {
        Self {
            page: self.page.clone(),
            locator,
        }
    }

    /// Descendants matching a CSS selector
    #[must_use]
    pub fn locator(&self, css: impl Into<String>) -> Self {
        self.derive(self.locator.locator(Selector::css(css)))
    }

    /// Descendants with a test identifier
    #[must_use]
    pub fn get_by_test_id(&self, id: impl Into<String>) -> Self {
        self.derive(self.locator.get_by_test_id(id))
    }

    /// Descendants with a role
    #[must_use]
    pub fn get_by_role(&self, role: AriaRole, name: Option<TextMatch>) -> Self {
        self.derive(self.locator.get_by_role(role, name))
    }

    /// Descendants with visible text
    #[must_use]
    pub fn get_by_text(&self, text: impl Into<TextMatch>) -> Self {
        self.derive(self.locator.get_by_text(text))
    }

    /// Keep elements whose text matches
    #[must_use]
    pub fn filter_has_text(&self, text: impl Into<TextMatch>) -> Self {
        self.derive(self.locator.filter_has_text(text))
    }

    /// Keep elements that contain a match for `inner`
    #[must_use]
    pub fn filter_has(&self, inner: &Self) -> Self {
        self.derive(self.locator.filter_has(&inner.locator))
    }

    /// First match
    #[must_use]
    pub fn first(&self) -> Self {
        self.derive(self.locator.first())
    }

    /// Last match
    #[must_use]
    pub fn last(&self) -> Self {
        self.derive(self.locator.last())
    }

    /// Match at `index` (negative counts from the end)
    #[must_use]
    pub fn nth(&self, index: i64) -> Self {
        self.derive(self.locator.nth(index))
    }

    /// Resolve once and snapshot every match
    pub async fn snapshots(&self) -> ProbeResult<Vec<ElementSnapshot>> {
        self.page.driver().inspect(&self.locator).await
    }

    /// Number of matches right now
    pub async fn count(&self) -> ProbeResult<usize> {
        Ok(self.snapshots().await?.len())
    }

    /// Text content of every match, in document order
    pub async fn all_text_contents(&self) -> ProbeResult<Vec<String>> {
        Ok(self.snapshots().await?.into_iter().map(|s| s.text).collect())
    }

    /// Whether the single match is visible. No match is `false`.
    pub async fn is_visible(&self) -> ProbeResult<bool> {
        let snapshots = self.snapshots().await?;
        self.ensure_strict(snapshots.len())?;
        Ok(snapshots.first().is_some_and(|s| s.visible))
    }

    /// Text content of the single match
    pub async fn text_content(&self) -> ProbeResult<String> {
        Ok(self.wait_single(false).await?.text)
    }

    /// Attribute of the single match
    pub async fn get_attribute(&self, name: &str) -> ProbeResult<Option<String>> {
        Ok(self.wait_single(false).await?.attribute(name).map(str::to_string))
    }

    /// Value of the single matching form control
    pub async fn input_value(&self) -> ProbeResult<String> {
        self.wait_single(false)
            .await?
            .value
            .ok_or_else(|| ProbeError::InputError {
                message: format!("{} is not a form control", self.locator),
            })
    }

    /// Click the single match
    pub async fn click(&self) -> ProbeResult<()> {
        self.act(Action::Click).await
    }

    /// Double-click the single match
    pub async fn dblclick(&self) -> ProbeResult<()> {
        self.act(Action::DoubleClick).await
    }

    /// Move the pointer over the single match
    pub async fn hover(&self) -> ProbeResult<()> {
        self.act(Action::Hover).await
    }

    /// Replace the value of the single matching input
    pub async fn fill(&self, text: &str) -> ProbeResult<()> {
        self.act(Action::Fill(text.to_string())).await
    }

    /// Press a key on the single match
    pub async fn press(&self, key: Key) -> ProbeResult<()> {
        self.act(Action::Press(key)).await
    }

    /// Click the single matching checkbox unless it is already checked
    pub async fn check(&self) -> ProbeResult<()> {
        let snapshot = self.wait_single(true).await?;
        if snapshot.checked {
            return Ok(());
        }
        self.perform(Action::Click).await
    }

    /// Wait until the set reaches `state`. Not strict: several matches are
    /// fine for every state.
    pub async fn wait_for(&self, state: ElementState) -> ProbeResult<()> {
        let what = format!("{} to be {state}", self.locator);
        retry(
            &self.action_budget(),
            move || async move {
                let snapshots = self.snapshots().await?;
                let visible = snapshots.iter().filter(|s| s.visible).count();
                let reached = match state {
                    ElementState::Attached => !snapshots.is_empty(),
                    ElementState::Detached => snapshots.is_empty(),
                    ElementState::Visible => visible > 0,
                    ElementState::Hidden => visible == 0,
                };
                Ok(if reached {
                    Attempt::Done(())
                } else {
                    Attempt::Retry(format!("{} match(es), {visible} visible", snapshots.len()))
                })
            },
            |err| ProbeError::Timeout {
                ms: self.page.timeouts().action.as_millis() as u64,
                what: format!("{what} (last: {})", err.message),
            },
        )
        .await
    }

    /// Retrying assertions on this set
    #[must_use]
    pub fn expect(&self) -> ElementExpect {
        ElementExpect::new(self.clone(), self.page.timeouts().expect)
    }

    pub(crate) fn ensure_strict(&self, count: usize) -> ProbeResult<()> {
        if count > 1 {
            return Err(ProbeError::StrictModeViolation {
                locator: self.locator.to_string(),
                count,
            });
        }
        Ok(())
    }

    fn action_budget(&self) -> RetryConfig {
        let timeouts = self.page.timeouts();
        RetryConfig::new(timeouts.action).with_poll_interval(timeouts.poll_interval)
    }

    /// Wait for exactly one match (visible when `visible` is set)
    async fn wait_single(&self, visible: bool) -> ProbeResult<ElementSnapshot> {
        let state = if visible { "visible" } else { "attached" };
        let crowded = AtomicUsize::new(0);
        let crowded = &crowded;
        retry(
            &self.action_budget(),
            move || async move {
                let mut snapshots = self.snapshots().await?;
                crowded.store(snapshots.len(), Ordering::Relaxed);
                if snapshots.len() > 1 {
                    return Ok(Attempt::Retry(format!("{} elements match", snapshots.len())));
                }
                match snapshots.pop() {
                    Some(s) if s.visible || !visible => Ok(Attempt::Done(s)),
                    Some(_) => Ok(Attempt::Retry("element is not visible".to_string())),
                    None => Ok(Attempt::Retry("no element matches".to_string())),
                }
            },
            |err| match self.ensure_strict(crowded.load(Ordering::Relaxed)) {
                Err(strict) => strict,
                Ok(()) => ProbeError::Timeout {
                    ms: self.page.timeouts().action.as_millis() as u64,
                    what: format!("{} to be {state} ({})", self.locator, err.message),
                },
            },
        )
        .await
    }

    async fn act(&self, action: Action) -> ProbeResult<()> {
        self.wait_single(true).await?;
        self.perform(action).await
    }

    async fn perform(&self, action: Action) -> ProbeResult<()> {
        debug!(locator = %self.locator, %action, "perform");
        self.page.driver().perform(&self.locator, &action).await
    }
}

impl fmt::Display for ElementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.locator.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NullSink;
    use crate::config::Timeouts;
    use crate::sim::SimDriver;
    use std::sync::Arc;

    fn page() -> (Arc<SimDriver>, Page) {
        let driver = Arc::new(SimDriver::new());
        let page = Page::new(driver.clone(), Arc::new(NullSink), Timeouts::fast());
        (driver, page)
    }

    async fn add(page: &Page, title: &str) {
        let input = page.get_by_test_id("text-input");
        input.fill(title).await.unwrap();
        input.press(Key::Enter).await.unwrap();
    }

    mod read_tests {
        use super::*;

        #[tokio::test]
        async fn test_count_and_texts_without_waiting() {
            let (_, page) = page();
            let labels = page.get_by_test_id("todo-item-label");
            assert_eq!(labels.count().await.unwrap(), 0);

            add(&page, "Buy milk").await;
            add(&page, "Walk dog").await;
            assert_eq!(labels.count().await.unwrap(), 2);
            assert_eq!(
                labels.all_text_contents().await.unwrap(),
                vec!["Buy milk", "Walk dog"]
            );
        }

        #[tokio::test]
        async fn test_strict_reads() {
            let (_, page) = page();
            add(&page, "Buy milk").await;
            add(&page, "Walk dog").await;
            let labels = page.get_by_test_id("todo-item-label");

            let err = labels.text_content().await.unwrap_err();
            assert!(matches!(err, ProbeError::StrictModeViolation { count: 2, .. }));
            assert_eq!(labels.last().text_content().await.unwrap(), "Walk dog");
            assert!(labels.is_visible().await.is_err());
            assert!(labels.first().is_visible().await.unwrap());
        }

        #[tokio::test]
        async fn test_missing_element_times_out() {
            let (_, page) = page();
            let err = page.get_by_test_id("nope").text_content().await.unwrap_err();
            assert!(err.is_timeout());
            assert!(!page.get_by_test_id("nope").is_visible().await.unwrap());
        }

        #[tokio::test]
        async fn test_input_value_and_attribute() {
            let (_, page) = page();
            let input = page.get_by_test_id("text-input");
            input.fill("half typed").await.unwrap();
            assert_eq!(input.input_value().await.unwrap(), "half typed");
            assert_eq!(
                input.get_attribute("placeholder").await.unwrap().as_deref(),
                Some("What needs to be done?")
            );
            assert!(page.locator("h1").input_value().await.is_err());
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_ambiguous_action_is_refused() {
            let (_, page) = page();
            add(&page, "Buy milk").await;
            add(&page, "Buy bread").await;
            let rows = page.get_by_role(AriaRole::ListItem, None).filter_has_text("buy");
            let err = rows.click().await.unwrap_err();
            assert!(matches!(err, ProbeError::StrictModeViolation { count: 2, .. }));
        }

        #[tokio::test]
        async fn test_hidden_control_is_not_clickable() {
            let (_, page) = page();
            add(&page, "Buy milk").await;
            let destroy = page.get_by_test_id("todo-item-button");
            assert!(destroy.click().await.unwrap_err().is_timeout());

            page.get_by_test_id("todo-item").hover().await.unwrap();
            destroy.click().await.unwrap();
            assert_eq!(page.get_by_test_id("todo-item").count().await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_check_is_idempotent() {
            let (_, page) = page();
            add(&page, "Buy milk").await;
            let toggle = page.get_by_test_id("todo-item-toggle");
            toggle.check().await.unwrap();
            toggle.check().await.unwrap();
            page.get_by_test_id("todo-item")
                .expect()
                .to_have_class("completed")
                .await
                .unwrap();
        }
    }

    mod wait_tests {
        use super::*;

        #[tokio::test]
        async fn test_wait_for_states() {
            let (_, page) = page();
            let rows = page.get_by_test_id("todo-item");
            rows.wait_for(ElementState::Detached).await.unwrap();
            rows.wait_for(ElementState::Hidden).await.unwrap();
            assert!(rows.wait_for(ElementState::Attached).await.unwrap_err().is_timeout());

            add(&page, "a1").await;
            add(&page, "a2").await;
            rows.wait_for(ElementState::Attached).await.unwrap();
            rows.wait_for(ElementState::Visible).await.unwrap();
        }

        #[tokio::test]
        async fn test_waits_through_settling_lag() {
            let (driver, page) = page();
            driver.set_settle_frames(3);
            add(&page, "Buy milk").await;
            let label = page.get_by_test_id("todo-item-label");
            assert_eq!(label.text_content().await.unwrap(), "Buy milk");
        }
    }
}
