//! In-process TodoMVC simulation.
//!
//! [`SimDriver`] implements [`crate::driver::BrowserDriver`] without a
//! browser: the app state is rendered into an in-memory [`dom::Document`] and
//! locators are resolved against it with the same rules as the JavaScript
//! resolver used in Chromium. The scenario suites run on it by default.

pub mod dom;
mod driver;
pub mod todomvc;

pub use driver::{SimDriver, PNG_SIGNATURE};
