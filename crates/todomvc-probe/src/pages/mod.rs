//! Page objects for the TodoMVC application.
//!
//! Page objects hold no row state. Every operation resolves its elements from
//! the live page at call time, so a row that was re-rendered, moved or
//! removed between two calls is never acted on through a stale handle.

mod todo;
mod todo_item;

pub use todo::{TodoFilter, TodoPage};
pub use todo_item::{EditCommit, TodoItems, ToggleOutcome};

use crate::page::Page;
use crate::result::ProbeResult;
use async_trait::async_trait;

/// `data-testid` values of the React TodoMVC build
pub mod test_ids {
    /// New-todo input, and the inline edit input inside a row
    pub const TEXT_INPUT: &str = "text-input";
    /// One row
    pub const TODO_ITEM: &str = "todo-item";
    /// Row label
    pub const TODO_ITEM_LABEL: &str = "todo-item-label";
    /// Row checkbox
    pub const TODO_ITEM_TOGGLE: &str = "todo-item-toggle";
    /// Row delete control, shown on hover
    pub const TODO_ITEM_BUTTON: &str = "todo-item-button";
    /// Mark-all checkbox
    pub const TOGGLE_ALL: &str = "toggle-all";
}

/// A page or component of the application under test
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Page this object drives
    fn page(&self) -> &Page;

    /// Name used in logs and step titles
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Wait until the page is ready for interaction
    async fn wait_until_loaded(&self) -> ProbeResult<()>;
}

/// Remaining-count text: "1 item left!" or "N items left!"
#[must_use]
pub fn items_left_label(active: usize) -> String {
    let noun = if active == 1 { "item" } else { "items" };
    format!("{active} {noun} left!")
}
