//! Operations on one to-do row, addressed by its label text.
//!
//! Rows have no stable identity in the DOM, so every call re-resolves the row
//! from its text. `find`, `delete` and `is_completed` match by containment
//! and fail with a strict-mode violation when the text occurs in several
//! rows. `toggle` additionally requires the label to equal the text and
//! skips the row otherwise.

use super::test_ids;
use crate::driver::Key;
use crate::element::{ElementSet, ElementState};
use crate::locator::{AriaRole, TextMatch};
use crate::page::Page;
use crate::result::ProbeResult;
use tracing::debug;

/// How an inline edit is finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditCommit {
    /// Enter: keep the new text
    Save,
    /// Escape: discard the new text
    CancelEscape,
    /// Tab: move focus away. The React app discards the edit on blur.
    CancelBlur,
}

impl EditCommit {
    /// Key that finishes the edit
    #[must_use]
    pub const fn key(self) -> Key {
        match self {
            Self::Save => Key::Enter,
            Self::CancelEscape => Key::Escape,
            Self::CancelBlur => Key::Tab,
        }
    }
}

/// Result of [`TodoItems::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleOutcome {
    /// The row's toggle was clicked
    Toggled,
    /// No label equals the text exactly; nothing was clicked
    Skipped,
}

/// Row-level accessor
#[derive(Debug, Clone)]
pub struct TodoItems {
    page: Page,
}

impl TodoItems {
    /// Accessor bound to a page
    #[must_use]
    pub const fn new(page: Page) -> Self {
        Self { page }
    }

    /// List items whose text contains `text`
    #[must_use]
    pub fn find(&self, text: &str) -> ElementSet {
        self.page
            .get_by_role(AriaRole::ListItem, None)
            .filter_has_text(TextMatch::contains(text))
    }

    /// Inline edit input of the row being edited
    #[must_use]
    pub fn edit_input(&self) -> ElementSet {
        self.page
            .get_by_test_id(test_ids::TODO_ITEM)
            .get_by_test_id(test_ids::TEXT_INPUT)
    }

    /// Toggle the row whose label is exactly `text`.
    ///
    /// Waits for at least one row whose label contains `text`, then reads
    /// every candidate label to decide between toggling and skipping. The
    /// click goes through a locator that requires the exact label, so a row
    /// list that reflowed since the read cannot redirect it to a neighbour.
    pub async fn toggle(&self, text: &str) -> ProbeResult<ToggleOutcome> {
        let candidates = self.rows_with_label(TextMatch::contains(text));
        candidates.wait_for(ElementState::Attached).await?;

        let labels = candidates
            .get_by_test_id(test_ids::TODO_ITEM_LABEL)
            .all_text_contents()
            .await?;
        if !labels.iter().any(|l| l == text) {
            debug!(text, ?labels, "no exact label match, toggle skipped");
            return Ok(ToggleOutcome::Skipped);
        }
        self.rows_with_label(TextMatch::exact(text))
            .get_by_test_id(test_ids::TODO_ITEM_TOGGLE)
            .click()
            .await?;
        Ok(ToggleOutcome::Toggled)
    }

    fn rows_with_label(&self, label: TextMatch) -> ElementSet {
        let label = self
            .page
            .get_by_test_id(test_ids::TODO_ITEM_LABEL)
            .filter_has_text(label);
        self.page
            .get_by_role(AriaRole::ListItem, None)
            .filter_has(&label)
    }

    /// Double-click the row, replace its text and finish with `commit`
    pub async fn edit(&self, text: &str, new_text: &str, commit: EditCommit) -> ProbeResult<()> {
        self.find(text).dblclick().await?;
        let input = self.edit_input();
        input.wait_for(ElementState::Visible).await?;
        input.fill(new_text).await?;
        input.press(commit.key()).await
    }

    /// Double-click the row and leave edit mode with Escape, typing nothing
    pub async fn cancel_edit(&self, text: &str) -> ProbeResult<()> {
        self.find(text).dblclick().await?;
        self.edit_input().press(Key::Escape).await
    }

    /// Hover the row to reveal its delete control, then click it
    pub async fn delete(&self, text: &str) -> ProbeResult<()> {
        let row = self.find(text);
        row.hover().await?;
        row.get_by_test_id(test_ids::TODO_ITEM_BUTTON).click().await
    }

    /// Whether the row carries the `completed` class. No class is `false`.
    pub async fn is_completed(&self, text: &str) -> ProbeResult<bool> {
        let class = self.find(text).get_attribute("class").await?;
        Ok(class.is_some_and(|c| c.split_whitespace().any(|t| t == "completed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NullSink;
    use crate::config::Timeouts;
    use crate::result::ProbeError;
    use crate::sim::SimDriver;
    use std::sync::Arc;

    async fn setup(titles: &[&str]) -> (Arc<SimDriver>, Page, TodoItems) {
        let driver = Arc::new(SimDriver::new());
        let page = Page::new(driver.clone(), Arc::new(NullSink), Timeouts::fast());
        let input = page.get_by_test_id(test_ids::TEXT_INPUT);
        for title in titles {
            input.fill(title).await.unwrap();
            input.press(Key::Enter).await.unwrap();
        }
        (driver, page.clone(), TodoItems::new(page))
    }

    fn completed(driver: &SimDriver) -> Vec<String> {
        driver
            .todos()
            .into_iter()
            .filter(|t| t.completed)
            .map(|t| t.title)
            .collect()
    }

    mod toggle_tests {
        use super::*;

        #[tokio::test]
        async fn test_toggle_exact_label() {
            let (driver, _, items) = setup(&["Buy milk", "Walk dog"]).await;
            assert_eq!(items.toggle("Walk dog").await.unwrap(), ToggleOutcome::Toggled);
            assert_eq!(completed(&driver), vec!["Walk dog"]);
        }

        #[tokio::test]
        async fn test_substring_only_is_skipped() {
            let (driver, _, items) = setup(&["Buy milk"]).await;
            assert_eq!(items.toggle("milk").await.unwrap(), ToggleOutcome::Skipped);
            assert!(completed(&driver).is_empty());
        }

        #[tokio::test]
        async fn test_exact_row_picked_among_candidates() {
            let (driver, _, items) = setup(&["Buy milk", "milk", "milk shake"]).await;
            assert_eq!(items.toggle("milk").await.unwrap(), ToggleOutcome::Toggled);
            assert_eq!(completed(&driver), vec!["milk"]);
        }

        #[tokio::test]
        async fn test_no_candidate_times_out() {
            let (_, _, items) = setup(&["Buy milk"]).await;
            assert!(items.toggle("bread").await.unwrap_err().is_timeout());
        }

        #[tokio::test]
        async fn test_double_toggle_restores_state() {
            let (driver, _, items) = setup(&["Buy milk"]).await;
            items.toggle("Buy milk").await.unwrap();
            assert!(items.is_completed("Buy milk").await.unwrap());
            items.toggle("Buy milk").await.unwrap();
            assert!(!items.is_completed("Buy milk").await.unwrap());
            assert!(completed(&driver).is_empty());
        }
    }

    mod edit_tests {
        use super::*;

        #[tokio::test]
        async fn test_commit_variants() {
            let (driver, _, items) = setup(&["Buy milk"]).await;
            items
                .edit("Buy milk", "Buy oat milk", EditCommit::CancelEscape)
                .await
                .unwrap();
            items
                .edit("Buy milk", "Buy oat milk", EditCommit::CancelBlur)
                .await
                .unwrap();
            assert_eq!(driver.todos()[0].title, "Buy milk");

            items
                .edit("Buy milk", "Buy oat milk", EditCommit::Save)
                .await
                .unwrap();
            assert_eq!(driver.todos()[0].title, "Buy oat milk");
        }

        #[tokio::test]
        async fn test_cancel_edit_keeps_label() {
            let (driver, page, items) = setup(&["Walk dog"]).await;
            items.cancel_edit("Walk dog").await.unwrap();
            assert_eq!(driver.todos()[0].title, "Walk dog");
            page.get_by_test_id(test_ids::TODO_ITEM)
                .expect()
                .not_to_have_class("editing")
                .await
                .unwrap();
        }

        #[test]
        fn test_commit_keys() {
            assert_eq!(EditCommit::Save.key(), Key::Enter);
            assert_eq!(EditCommit::CancelEscape.key(), Key::Escape);
            assert_eq!(EditCommit::CancelBlur.key(), Key::Tab);
        }
    }

    mod delete_tests {
        use super::*;

        #[tokio::test]
        async fn test_delete_by_containment() {
            let (driver, _, items) = setup(&["Buy milk", "Walk dog"]).await;
            items.delete("milk").await.unwrap();
            let titles: Vec<String> = driver.todos().into_iter().map(|t| t.title).collect();
            assert_eq!(titles, vec!["Walk dog"]);
        }

        #[tokio::test]
        async fn test_ambiguous_delete_is_refused() {
            let (driver, _, items) = setup(&["Buy milk", "Buy bread"]).await;
            let err = items.delete("Buy").await.unwrap_err();
            assert!(matches!(err, ProbeError::StrictModeViolation { count: 2, .. }));
            assert_eq!(driver.todos().len(), 2);
        }
    }

    mod lag_tests {
        use super::*;

        #[tokio::test]
        async fn test_toggle_after_reflow_hits_exact_row() {
            let (driver, _, items) = setup(&["a milk", "milk", "b milk"]).await;
            driver.set_settle_frames(3);
            items.delete("a milk").await.unwrap();
            assert_eq!(items.toggle("milk").await.unwrap(), ToggleOutcome::Toggled);
            assert_eq!(completed(&driver), vec!["milk"]);
        }

        #[tokio::test]
        async fn test_is_completed_waits_out_removed_duplicate() {
            let (driver, _, items) = setup(&["Buy milk", "Buy milk shake"]).await;
            items.toggle("Buy milk").await.unwrap();
            driver.set_settle_frames(3);
            items.delete("shake").await.unwrap();
            assert!(items.is_completed("Buy milk").await.unwrap());
        }

        #[tokio::test]
        async fn test_lasting_ambiguity_is_still_refused() {
            let (driver, _, items) = setup(&["Buy milk", "Buy bread"]).await;
            driver.set_settle_frames(2);
            let err = items.is_completed("Buy").await.unwrap_err();
            assert!(matches!(err, ProbeError::StrictModeViolation { count: 2, .. }));
        }
    }

    #[tokio::test]
    async fn test_is_completed_without_class_is_false() {
        let (_, _, items) = setup(&["Walk dog"]).await;
        assert!(!items.is_completed("Walk dog").await.unwrap());
    }
}
