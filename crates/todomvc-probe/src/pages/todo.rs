//! Scenario-level operations and assertions for TodoMVC.

use super::test_ids;
use super::todo_item::{EditCommit, TodoItems, ToggleOutcome};
use super::{items_left_label, PageObject};
use crate::driver::Key;
use crate::element::{ElementSet, ElementState};
use crate::locator::{AriaRole, TextMatch};
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// Footer filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TodoFilter {
    /// Every row
    All,
    /// Rows not completed
    Active,
    /// Completed rows
    Completed,
}

impl TodoFilter {
    /// Visible link label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for TodoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TodoFilter {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "All" => Ok(Self::All),
            "Active" => Ok(Self::Active),
            "Completed" => Ok(Self::Completed),
            other => Err(ProbeError::InvalidLocator {
                message: format!("unknown filter '{other}'"),
            }),
        }
    }
}

/// Page object for the TodoMVC screen
#[derive(Debug, Clone)]
pub struct TodoPage {
    page: Page,
    items: TodoItems,
}

impl TodoPage {
    /// Page object bound to `page`
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self {
            items: TodoItems::new(page.clone()),
            page,
        }
    }

    /// Row-level accessor
    #[must_use]
    pub const fn items(&self) -> &TodoItems {
        &self.items
    }

    // Locators

    /// New-todo input
    #[must_use]
    pub fn text_input(&self) -> ElementSet {
        self.page.get_by_test_id(test_ids::TEXT_INPUT).first()
    }

    /// Every row label, in display order
    #[must_use]
    pub fn todo_labels(&self) -> ElementSet {
        self.page.get_by_test_id(test_ids::TODO_ITEM_LABEL)
    }

    /// Mark-all checkbox
    #[must_use]
    pub fn toggle_all(&self) -> ElementSet {
        self.page.get_by_test_id(test_ids::TOGGLE_ALL)
    }

    /// "Clear completed" button
    #[must_use]
    pub fn clear_completed(&self) -> ElementSet {
        self.page
            .get_by_role(AriaRole::Button, Some(TextMatch::exact("Clear completed")))
    }

    /// Remaining-count display
    #[must_use]
    pub fn todo_count(&self) -> ElementSet {
        self.page.locator("span.todo-count")
    }

    /// Footer link for `filter`, matched on its exact label
    #[must_use]
    pub fn filter_link(&self, filter: TodoFilter) -> ElementSet {
        self.page
            .get_by_role(AriaRole::Link, None)
            .filter_has_text(TextMatch::exact(filter.label()))
    }

    /// Rows containing `text`
    #[must_use]
    pub fn todo_item_by_text(&self, text: &str) -> ElementSet {
        self.items.find(text)
    }

    // Actions

    /// Type `text` into the new-todo input and press Enter
    #[instrument(level = "debug", skip(self))]
    pub async fn add_todo(&self, text: &str) -> ProbeResult<()> {
        let input = self.text_input();
        input.fill(text).await?;
        input.press(Key::Enter).await
    }

    /// Add each todo in order, one after the other
    pub async fn add_multiple_todos<S: AsRef<str>>(&self, todos: &[S]) -> ProbeResult<()> {
        for todo in todos {
            self.add_todo(todo.as_ref()).await?;
        }
        Ok(())
    }

    /// Toggle the row labelled exactly `text`
    #[instrument(level = "debug", skip(self))]
    pub async fn toggle_todo(&self, text: &str) -> ProbeResult<ToggleOutcome> {
        self.items.toggle(text).await
    }

    /// Toggle each row in order
    pub async fn toggle_multiple_todos<S: AsRef<str>>(
        &self,
        todos: &[S],
    ) -> ProbeResult<Vec<ToggleOutcome>> {
        let mut outcomes = Vec::with_capacity(todos.len());
        for todo in todos {
            outcomes.push(self.toggle_todo(todo.as_ref()).await?);
        }
        Ok(outcomes)
    }

    /// Follow a footer filter link
    #[instrument(level = "debug", skip(self))]
    pub async fn filter(&self, filter: TodoFilter) -> ProbeResult<()> {
        self.filter_link(filter).click().await
    }

    /// Delete the row containing `text`
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_todo(&self, text: &str) -> ProbeResult<()> {
        self.items.delete(text).await
    }

    /// Delete each row in order
    pub async fn delete_multiple_todos<S: AsRef<str>>(&self, todos: &[S]) -> ProbeResult<()> {
        for todo in todos {
            self.delete_todo(todo.as_ref()).await?;
        }
        Ok(())
    }

    /// Replace the text of a row and save with Enter
    pub async fn edit_todo(&self, old_text: &str, new_text: &str) -> ProbeResult<()> {
        self.edit_todo_with(old_text, new_text, EditCommit::Save)
            .await
    }

    /// Type new text into a row, then leave with Tab. The app drops the edit.
    pub async fn edit_todo_and_cancel(&self, old_text: &str, new_text: &str) -> ProbeResult<()> {
        self.edit_todo_with(old_text, new_text, EditCommit::CancelBlur)
            .await
    }

    /// Edit a row and finish the way `commit` says
    #[instrument(level = "debug", skip(self))]
    pub async fn edit_todo_with(
        &self,
        old_text: &str,
        new_text: &str,
        commit: EditCommit,
    ) -> ProbeResult<()> {
        self.items.edit(old_text, new_text, commit).await
    }

    /// Enter edit mode on a row and leave it with Escape
    #[instrument(level = "debug", skip(self))]
    pub async fn cancel_edit_todo(&self, text: &str) -> ProbeResult<()> {
        self.items.cancel_edit(text).await
    }

    /// Click the mark-all checkbox
    #[instrument(level = "debug", skip(self))]
    pub async fn toggle_all_todos(&self) -> ProbeResult<()> {
        self.toggle_all().click().await
    }

    /// Click "Clear completed"
    #[instrument(level = "debug", skip(self))]
    pub async fn clear_completed_todos(&self) -> ProbeResult<()> {
        self.clear_completed().click().await
    }

    /// Whether the row containing `text` is marked completed
    pub async fn is_todo_completed(&self, text: &str) -> ProbeResult<bool> {
        self.items.is_completed(text).await
    }

    // Actions followed by a screenshot

    /// [`Self::add_todo`], then a screenshot when `screenshot` is set
    pub async fn add_todo_with_screenshot(
        &self,
        text: &str,
        screenshot: Option<&str>,
    ) -> ProbeResult<()> {
        self.page
            .with_screenshot(screenshot, self.add_todo(text))
            .await
    }

    /// [`Self::toggle_todo`], then a screenshot when `screenshot` is set
    pub async fn toggle_todo_with_screenshot(
        &self,
        text: &str,
        screenshot: Option<&str>,
    ) -> ProbeResult<ToggleOutcome> {
        self.page
            .with_screenshot(screenshot, self.toggle_todo(text))
            .await
    }

    /// [`Self::filter`], then a screenshot when `screenshot` is set
    pub async fn filter_with_screenshot(
        &self,
        filter: TodoFilter,
        screenshot: Option<&str>,
    ) -> ProbeResult<()> {
        self.page
            .with_screenshot(screenshot, self.filter(filter))
            .await
    }

    /// [`Self::delete_todo`], then a screenshot when `screenshot` is set
    pub async fn delete_todo_with_screenshot(
        &self,
        text: &str,
        screenshot: Option<&str>,
    ) -> ProbeResult<()> {
        self.page
            .with_screenshot(screenshot, self.delete_todo(text))
            .await
    }

    /// [`Self::edit_todo`], then a screenshot when `screenshot` is set
    pub async fn edit_todo_with_screenshot(
        &self,
        old_text: &str,
        new_text: &str,
        screenshot: Option<&str>,
    ) -> ProbeResult<()> {
        self.page
            .with_screenshot(screenshot, self.edit_todo(old_text, new_text))
            .await
    }

    /// [`Self::toggle_all_todos`], then a screenshot when `screenshot` is set
    pub async fn toggle_all_todos_with_screenshot(&self, screenshot: Option<&str>) -> ProbeResult<()> {
        self.page
            .with_screenshot(screenshot, self.toggle_all_todos())
            .await
    }

    /// [`Self::clear_completed_todos`], then a screenshot when `screenshot` is set
    pub async fn clear_completed_todos_with_screenshot(
        &self,
        screenshot: Option<&str>,
    ) -> ProbeResult<()> {
        self.page
            .with_screenshot(screenshot, self.clear_completed_todos())
            .await
    }

    // Capture

    /// Full-page screenshot, named "screenshot" by default
    pub async fn take_screenshot(&self, name: Option<&str>) {
        self.page
            .attach_screenshot(name.unwrap_or("screenshot"))
            .await;
    }

    /// Full-page screenshot, named "failure-screenshot" by default
    pub async fn take_screenshot_on_failure(&self, name: Option<&str>) {
        self.page
            .attach_screenshot(name.unwrap_or("failure-screenshot"))
            .await;
    }

    /// Page HTML, named "page-html" by default
    pub async fn capture_page_html(&self, name: Option<&str>) {
        self.page.attach_html(name.unwrap_or("page-html")).await;
    }

    /// Console output, named "console-logs" by default
    pub async fn capture_console_logs(&self, name: Option<&str>) {
        self.page
            .attach_console_logs(name.unwrap_or("console-logs"))
            .await;
    }

    // Assertions

    /// The row containing `text` has the `completed` class
    pub async fn expect_todo_completed(&self, text: &str) -> ProbeResult<()> {
        self.todo_item_by_text(text)
            .expect()
            .to_have_class("completed")
            .await
    }

    /// The row containing `text` lacks the `completed` class
    pub async fn expect_todo_not_completed(&self, text: &str) -> ProbeResult<()> {
        self.todo_item_by_text(text)
            .expect()
            .not_to_have_class("completed")
            .await
    }

    /// Exactly `count` rows are displayed
    pub async fn expect_todo_count(&self, count: usize) -> ProbeResult<()> {
        self.todo_labels().expect().to_have_count(count).await
    }

    /// The first row is labelled `text`
    pub async fn expect_todo_text(&self, text: &str) -> ProbeResult<()> {
        self.todo_labels().first().expect().to_have_text(text).await
    }

    /// Row labels are exactly `texts`, in order
    pub async fn expect_todo_texts<S: AsRef<str>>(&self, texts: &[S]) -> ProbeResult<()> {
        self.todo_labels().expect().to_have_texts(texts).await
    }

    /// The counter reads "1 item left!" or "N items left!"
    pub async fn expect_items_left(&self, active: usize) -> ProbeResult<()> {
        self.todo_count()
            .expect()
            .to_have_text(items_left_label(active))
            .await
    }

    /// "Clear completed" is not shown
    pub async fn expect_clear_completed_hidden(&self) -> ProbeResult<()> {
        self.clear_completed().expect().to_be_hidden().await
    }
}

#[async_trait]
impl PageObject for TodoPage {
    fn page(&self) -> &Page {
        &self.page
    }

    fn page_name(&self) -> &str {
        "TodoMVC"
    }

    async fn wait_until_loaded(&self) -> ProbeResult<()> {
        self.text_input().wait_for(ElementState::Visible).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MemorySink, MIME_PNG};
    use crate::config::Timeouts;
    use crate::sim::SimDriver;
    use std::sync::Arc;

    fn todo_page() -> (Arc<SimDriver>, Arc<MemorySink>, TodoPage) {
        let driver = Arc::new(SimDriver::new());
        let sink = Arc::new(MemorySink::new());
        let page = Page::new(driver.clone(), sink.clone(), Timeouts::fast());
        (driver, sink, TodoPage::new(page))
    }

    mod filter_tests {
        use super::*;
        use crate::driver::BrowserDriver;

        #[test]
        fn test_filter_labels_round_trip() {
            for filter in [TodoFilter::All, TodoFilter::Active, TodoFilter::Completed] {
                assert_eq!(filter.label().parse::<TodoFilter>().unwrap(), filter);
            }
            assert!("all".parse::<TodoFilter>().is_err());
        }

        #[tokio::test]
        async fn test_filters_partition_rows() {
            let (_, _, todos) = todo_page();
            todos.add_multiple_todos(&["a", "b", "c"]).await.unwrap();
            todos.toggle_todo("b").await.unwrap();

            todos.filter(TodoFilter::Active).await.unwrap();
            todos.expect_todo_texts(&["a", "c"]).await.unwrap();
            todos.filter(TodoFilter::Completed).await.unwrap();
            todos.expect_todo_texts(&["b"]).await.unwrap();
            todos.filter(TodoFilter::All).await.unwrap();
            todos.expect_todo_texts(&["a", "b", "c"]).await.unwrap();
            todos.expect_items_left(2).await.unwrap();
        }

        #[tokio::test]
        async fn test_selected_link_follows_filter() {
            let (driver, _, todos) = todo_page();
            todos.add_todo("Buy milk").await.unwrap();
            todos.filter(TodoFilter::Completed).await.unwrap();
            todos
                .filter_link(TodoFilter::Completed)
                .expect()
                .to_have_class("selected")
                .await
                .unwrap();
            assert!(driver.current_url().await.unwrap().ends_with("#/completed"));
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_add_and_count() {
            let (_, _, todos) = todo_page();
            todos.expect_todo_count(0).await.unwrap();
            todos.add_todo("Buy milk").await.unwrap();
            todos.expect_todo_text("Buy milk").await.unwrap();
            todos.expect_items_left(1).await.unwrap();
            todos.expect_clear_completed_hidden().await.unwrap();
        }

        #[tokio::test]
        async fn test_toggle_all_and_clear() {
            let (driver, _, todos) = todo_page();
            todos
                .add_multiple_todos(&["Buy milk", "Walk dog"])
                .await
                .unwrap();
            todos.toggle_all_todos().await.unwrap();
            todos.expect_todo_completed("Buy milk").await.unwrap();
            todos.expect_items_left(0).await.unwrap();

            todos.clear_completed_todos().await.unwrap();
            todos.expect_todo_count(0).await.unwrap();
            assert!(driver.todos().is_empty());
        }

        #[tokio::test]
        async fn test_batch_helpers_run_in_order() {
            let (driver, _, todos) = todo_page();
            todos
                .add_multiple_todos(&["Buy milk", "Walk dog", "Read book"])
                .await
                .unwrap();
            let outcomes = todos
                .toggle_multiple_todos(&["Walk dog", "dog"])
                .await
                .unwrap();
            assert_eq!(outcomes, vec![ToggleOutcome::Toggled, ToggleOutcome::Skipped]);

            todos
                .delete_multiple_todos(&["Buy milk", "Read book"])
                .await
                .unwrap();
            let left: Vec<String> = driver.todos().into_iter().map(|t| t.title).collect();
            assert_eq!(left, vec!["Walk dog"]);
            assert!(todos.is_todo_completed("Walk dog").await.unwrap());
        }

        #[tokio::test]
        async fn test_edit_variants() {
            let (_, _, todos) = todo_page();
            todos.add_todo("Buy milk").await.unwrap();
            todos.edit_todo_and_cancel("Buy milk", "Buy bread").await.unwrap();
            todos.expect_todo_texts(&["Buy milk"]).await.unwrap();
            todos.cancel_edit_todo("Buy milk").await.unwrap();
            todos.expect_todo_texts(&["Buy milk"]).await.unwrap();
            todos.edit_todo("Buy milk", "Buy bread").await.unwrap();
            todos.expect_todo_texts(&["Buy bread"]).await.unwrap();
        }

        #[tokio::test]
        async fn test_page_object_loads() {
            let (_, _, todos) = todo_page();
            todos.wait_until_loaded().await.unwrap();
            assert_eq!(todos.page_name(), "TodoMVC");
        }
    }

    mod capture_tests {
        use super::*;

        #[tokio::test]
        async fn test_screenshot_only_after_success() {
            let (_, sink, todos) = todo_page();
            todos
                .add_todo_with_screenshot("Buy milk", Some("added"))
                .await
                .unwrap();
            todos.add_todo_with_screenshot("Walk dog", None).await.unwrap();
            assert_eq!(sink.names(), vec!["added.png"]);
            assert_eq!(sink.get("added.png").unwrap().mime_type, MIME_PNG);

            let err = todos
                .delete_todo_with_screenshot("bread", Some("deleted"))
                .await
                .unwrap_err();
            assert!(err.is_timeout());
            assert!(sink.get("deleted.png").is_none());
        }

        #[tokio::test]
        async fn test_failed_capture_keeps_action_result() {
            let (driver, sink, todos) = todo_page();
            driver.fail_screenshots(true);
            todos
                .add_todo_with_screenshot("Buy milk", Some("added"))
                .await
                .unwrap();
            todos.expect_todo_count(1).await.unwrap();
            assert!(sink.names().is_empty());
        }

        #[tokio::test]
        async fn test_default_capture_names() {
            let (_, sink, todos) = todo_page();
            todos.take_screenshot(None).await;
            todos.take_screenshot_on_failure(None).await;
            todos.capture_page_html(None).await;
            todos.capture_console_logs(Some("browser-console")).await;
            assert_eq!(
                sink.names(),
                vec![
                    "screenshot.png",
                    "failure-screenshot.png",
                    "page-html.html",
                    "browser-console.txt",
                ]
            );
        }
    }
}
