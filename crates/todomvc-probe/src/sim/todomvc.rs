//! Model of the React TodoMVC application.
//!
//! [`TodoApp::render`] produces the same DOM contract as the hosted app
//! (test ids, classes, filter links, counter text). [`TodoApp::dispatch`]
//! applies one user action to the element it lands on.

use super::dom::{Document, Element, NodePath};
use crate::driver::{Action, Key};
use crate::pages::items_left_label;
use crate::result::{ProbeError, ProbeResult};

/// Route selected by the footer links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    /// `#/`
    #[default]
    All,
    /// `#/active`
    Active,
    /// `#/completed`
    Completed,
}

impl Route {
    /// Route for a URL fragment
    #[must_use]
    pub fn from_fragment(fragment: &str) -> Self {
        match fragment.trim_start_matches('#').trim_start_matches('/') {
            "active" => Self::Active,
            "completed" => Self::Completed,
            _ => Self::All,
        }
    }

    /// Link target
    #[must_use]
    pub const fn href(self) -> &'static str {
        match self {
            Self::All => "#/",
            Self::Active => "#/active",
            Self::Completed => "#/completed",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }

    const fn shows(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

/// One to-do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    /// Stable id
    pub id: u64,
    /// Title as stored (trimmed)
    pub title: String,
    /// Completion flag
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Editing {
    id: u64,
    draft: String,
}

/// Application state
#[derive(Debug, Clone, Default)]
pub struct TodoApp {
    todos: Vec<Todo>,
    next_id: u64,
    route: Route,
    draft: String,
    editing: Option<Editing>,
    hovered: Option<u64>,
}

/// What the user hit, derived from the target element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    NewTodo,
    EditInput(u64),
    RowToggle(u64),
    RowDestroy(u64),
    Row(u64),
    ToggleAll,
    ClearCompleted,
    FilterLink(Route),
    Other,
}

impl TodoApp {
    /// Fresh app on a route
    #[must_use]
    pub fn new(route: Route) -> Self {
        Self {
            route,
            ..Self::default()
        }
    }

    /// All todos in insertion order
    #[must_use]
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    /// Current route
    #[must_use]
    pub const fn route(&self) -> Route {
        self.route
    }

    fn active_count(&self) -> usize {
        self.todos.iter().filter(|t| !t.completed).count()
    }

    /// Render the current state
    #[must_use]
    pub fn render(&self) -> Document {
        let mut app = Element::new("section").class("todoapp").child(self.render_header());
        if !self.todos.is_empty() {
            app = app.child(self.render_main()).child(self.render_footer());
        }
        Document::new(vec![app])
    }

    fn render_header(&self) -> Element {
        Element::new("header")
            .class("header")
            .test_id("header")
            .child(Element::new("h1").text("todos"))
            .child(
                Element::new("div").class("input-container").child(
                    Element::new("input")
                        .class("new-todo")
                        .attr("id", "todo-input")
                        .attr("type", "text")
                        .attr("placeholder", "What needs to be done?")
                        .test_id("text-input")
                        .value(self.draft.clone()),
                ),
            )
    }

    fn render_main(&self) -> Element {
        let all_done = self.active_count() == 0;
        let rows = self
            .todos
            .iter()
            .filter(|t| self.route.shows(t))
            .map(|t| self.render_row(t));
        Element::new("main")
            .class("main")
            .test_id("main")
            .child(
                Element::new("div").class("toggle-all-container").child(
                    Element::new("input")
                        .class("toggle-all")
                        .attr("type", "checkbox")
                        .test_id("toggle-all")
                        .checked(all_done),
                ),
            )
            .child(
                Element::new("ul")
                    .class("todo-list")
                    .test_id("todo-list")
                    .children(rows),
            )
    }

    fn render_row(&self, todo: &Todo) -> Element {
        let editing = self.editing.as_ref().filter(|e| e.id == todo.id);
        let mut row = Element::new("li").test_id("todo-item").key(todo.id);
        if todo.completed {
            row = row.class("completed");
        }
        if editing.is_some() {
            row = row.class("editing");
        }
        let view = match editing {
            Some(edit) => Element::new("div").class("view").child(
                Element::new("div").class("input-container").child(
                    Element::new("input")
                        .class("new-todo")
                        .attr("type", "text")
                        .test_id("text-input")
                        .value(edit.draft.clone()),
                ),
            ),
            None => Element::new("div")
                .class("view")
                .child(
                    Element::new("input")
                        .class("toggle")
                        .attr("type", "checkbox")
                        .test_id("todo-item-toggle")
                        .checked(todo.completed),
                )
                .child(Element::new("label").test_id("todo-item-label").text(todo.title.clone()))
                .child(
                    Element::new("button")
                        .class("destroy")
                        .test_id("todo-item-button")
                        .hidden(self.hovered != Some(todo.id)),
                ),
        };
        row.child(view)
    }

    fn render_footer(&self) -> Element {
        let active = self.active_count();
        let completed = self.todos.len() - active;
        let links = [Route::All, Route::Active, Route::Completed].map(|route| {
            let mut link = Element::new("a").attr("href", route.href()).text(route.label());
            if route == self.route {
                link = link.class("selected");
            }
            Element::new("li").child(link)
        });
        let mut clear = Element::new("button")
            .class("clear-completed")
            .text("Clear completed")
            .hidden(completed == 0);
        if completed == 0 {
            clear = clear.attr("disabled", "");
        }
        Element::new("footer")
            .class("footer")
            .test_id("footer")
            .child(
                Element::new("span")
                    .class("todo-count")
                    .text(items_left_label(active)),
            )
            .child(
                Element::new("ul")
                    .class("filters")
                    .test_id("footer-navigation")
                    .children(links),
            )
            .child(clear)
    }

    fn classify(doc: &Document, path: &NodePath) -> Target {
        let Some(node) = doc.node(path) else {
            return Target::Other;
        };
        let row = node
            .key
            .or_else(|| doc.ancestors(path).find_map(|a| a.key));
        let test_id = node.attribute("data-testid");
        match (test_id, row) {
            (Some("text-input"), None) => Target::NewTodo,
            (Some("text-input"), Some(id)) => Target::EditInput(id),
            (Some("todo-item-toggle"), Some(id)) => Target::RowToggle(id),
            (Some("todo-item-button"), Some(id)) => Target::RowDestroy(id),
            (Some("toggle-all"), _) => Target::ToggleAll,
            (_, Some(id)) => Target::Row(id),
            _ if node.has_class("clear-completed") => Target::ClearCompleted,
            _ => match node.attribute("href") {
                Some(href) if node.tag == "a" => Target::FilterLink(Route::from_fragment(href)),
                _ => Target::Other,
            },
        }
    }

    /// Apply an action to the element at `path` of `doc` (a render of this
    /// state). Returns the new route when the action followed a filter link.
    pub fn dispatch(
        &mut self,
        doc: &Document,
        path: &NodePath,
        action: &Action,
    ) -> ProbeResult<Option<Route>> {
        let target = Self::classify(doc, path);
        let editing_target = matches!(target, Target::EditInput(_));
        if !editing_target && !matches!(action, Action::Hover) {
            self.editing = None;
        }

        match action {
            Action::Hover => {
                self.hovered = match target {
                    Target::Row(id)
                    | Target::RowToggle(id)
                    | Target::RowDestroy(id)
                    | Target::EditInput(id) => Some(id),
                    _ => None,
                };
            }
            Action::Click => return Ok(self.click(target)),
            Action::DoubleClick => match target {
                Target::Row(id) => {
                    if let Some(todo) = self.todos.iter().find(|t| t.id == id) {
                        self.editing = Some(Editing {
                            id,
                            draft: todo.title.clone(),
                        });
                    }
                }
                other => {
                    self.click(other);
                    return Ok(self.click(other));
                }
            },
            Action::Fill(text) => match target {
                Target::NewTodo => self.draft.clone_from(text),
                Target::EditInput(_) => {
                    if let Some(edit) = self.editing.as_mut() {
                        edit.draft.clone_from(text);
                    }
                }
                _ => {
                    return Err(ProbeError::NotActionable {
                        locator: doc.node(path).map(|n| n.tag.clone()).unwrap_or_default(),
                        reason: "element is not a text input".to_string(),
                    })
                }
            },
            Action::Press(key) => self.press(target, *key),
        }
        Ok(None)
    }

    fn click(&mut self, target: Target) -> Option<Route> {
        match target {
            Target::RowToggle(id) => {
                if let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) {
                    todo.completed = !todo.completed;
                }
            }
            Target::RowDestroy(id) => {
                self.todos.retain(|t| t.id != id);
                self.hovered = None;
            }
            Target::ToggleAll => {
                let complete = self.active_count() > 0;
                for todo in &mut self.todos {
                    todo.completed = complete;
                }
            }
            Target::ClearCompleted => self.todos.retain(|t| !t.completed),
            Target::FilterLink(route) => {
                self.route = route;
                return Some(route);
            }
            Target::NewTodo | Target::EditInput(_) | Target::Row(_) | Target::Other => {}
        }
        None
    }

    fn press(&mut self, target: Target, key: Key) {
        match (target, key) {
            (Target::NewTodo, Key::Enter) => {
                let title = self.draft.trim();
                if !title.is_empty() {
                    self.next_id += 1;
                    self.todos.push(Todo {
                        id: self.next_id,
                        title: title.to_string(),
                        completed: false,
                    });
                    self.draft.clear();
                }
            }
            (Target::NewTodo, Key::Backspace) => {
                self.draft.pop();
            }
            (Target::EditInput(id), Key::Enter) => {
                if let Some(edit) = self.editing.take() {
                    let title = edit.draft.trim().to_string();
                    if title.is_empty() {
                        self.todos.retain(|t| t.id != id);
                    } else if let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) {
                        todo.title = title;
                    }
                }
            }
            (Target::EditInput(_), Key::Escape | Key::Tab) => self.editing = None,
            (Target::EditInput(_), Key::Backspace) => {
                if let Some(edit) = self.editing.as_mut() {
                    edit.draft.pop();
                }
            }
            _ => {}
        }
    }
}
