//! Composition root: one page object per browser page.

use crate::page::Page;
use crate::pages::TodoPage;

/// The application under test, bound to one page
#[derive(Debug, Clone)]
pub struct WebApp {
    page: Page,
    todo_page: TodoPage,
}

impl WebApp {
    /// Build every page object for `page`
    #[must_use]
    pub fn init(page: Page) -> Self {
        Self {
            todo_page: TodoPage::new(page.clone()),
            page,
        }
    }

    /// Page the application runs in
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// TodoMVC screen
    #[must_use]
    pub const fn todo_page(&self) -> &TodoPage {
        &self.todo_page
    }
}

/// Builds standalone page objects
#[derive(Debug, Clone, Copy, Default)]
pub struct PageFactory;

impl PageFactory {
    /// A [`TodoPage`] not owned by any [`WebApp`]
    #[must_use]
    pub fn todo_page(page: &Page) -> TodoPage {
        TodoPage::new(page.clone())
    }
}
