//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a recipe, not a result: building one records an ordered
//! list of steps and performs no I/O. Every resolution re-reads the live page,
//! so the same locator stays valid across mutations (re-checking a row count
//! after a delete does not need a new locator).
//!
//! # Steps
//!
//! - `Find(selector)`: descendants of the current set (document at first),
//!   deduplicated, in document order
//! - `HasText(match)`: keep elements whose text content matches
//! - `Has(steps)`: keep elements that contain a match for a nested locator
//! - `Nth(index)`: keep one element by position (negative counts from the end)
//!
//! The same steps are interpreted by the in-process DOM of [`crate::sim`] and,
//! through [`Locator::to_script`], by a JavaScript runtime in a real browser.

use crate::result::{ProbeError, ProbeResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collapse runs of whitespace into single spaces and trim both ends
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// How an element's text is compared against an expected value.
///
/// Text is whitespace-normalized first. `Contains` ignores case, `Exact` does
/// not, `Pattern` is a regular expression applied to the normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TextMatch {
    /// Full, case-sensitive equality
    Exact(String),
    /// Case-insensitive substring containment
    Contains(String),
    /// Regular expression search
    Pattern(TextPattern),
}

impl TextMatch {
    /// Exact match
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Substring match
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    /// Regular expression match
    ///
    /// # Errors
    ///
    /// Returns error if the pattern does not compile
    pub fn pattern(pattern: impl Into<String>) -> ProbeResult<Self> {
        TextPattern::try_from(pattern.into()).map(Self::Pattern)
    }

    /// Check a raw text content against this matcher
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = normalize_whitespace(text);
        match self {
            Self::Exact(expected) => text == normalize_whitespace(expected),
            Self::Contains(needle) => text
                .to_lowercase()
                .contains(&normalize_whitespace(needle).to_lowercase()),
            Self::Pattern(pattern) => pattern.0.is_match(&text),
        }
    }
}

impl From<&str> for TextMatch {
    fn from(text: &str) -> Self {
        Self::Contains(text.to_string())
    }
}

impl From<String> for TextMatch {
    fn from(text: String) -> Self {
        Self::Contains(text)
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(text) => write!(f, "{text:?}"),
            Self::Contains(text) => write!(f, "~{text:?}"),
            Self::Pattern(pattern) => write!(f, "/{pattern}/"),
        }
    }
}

/// Regular expression compiled once, when the matcher is built.
///
/// Serializes as its source string; deserializing compiles it again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TextPattern(Regex);

impl TextPattern {
    /// Source of the expression
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for TextPattern {
    type Error = ProbeError;

    fn try_from(pattern: String) -> ProbeResult<Self> {
        Regex::new(&pattern)
            .map(Self)
            .map_err(|e| ProbeError::InvalidLocator {
                message: format!("invalid text pattern /{pattern}/: {e}"),
            })
    }
}

impl From<TextPattern> for String {
    fn from(pattern: TextPattern) -> Self {
        pattern.as_str().to_string()
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for TextPattern {}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessibility roles understood by role selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AriaRole {
    /// `button`, `input[type=button|submit|reset]`
    Button,
    /// `input[type=checkbox]`
    Checkbox,
    /// `h1` to `h6`
    Heading,
    /// `a[href]`
    Link,
    /// `ul`, `ol`
    List,
    /// `li`
    ListItem,
    /// text-like `input`, `textarea`
    TextBox,
}

impl AriaRole {
    /// Role name as used in the `role` attribute
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Checkbox => "checkbox",
            Self::Heading => "heading",
            Self::Link => "link",
            Self::List => "list",
            Self::ListItem => "listitem",
            Self::TextBox => "textbox",
        }
    }

    /// Compute the role of an element. An explicit `role` attribute wins over
    /// the implicit role of the tag.
    #[must_use]
    pub fn of_element(
        tag: &str,
        explicit: Option<&str>,
        input_type: Option<&str>,
        has_href: bool,
    ) -> Option<Self> {
        if let Some(explicit) = explicit {
            return explicit.split_whitespace().next().and_then(|r| r.parse().ok());
        }
        match tag.to_ascii_lowercase().as_str() {
            "button" => Some(Self::Button),
            "a" if has_href => Some(Self::Link),
            "li" => Some(Self::ListItem),
            "ul" | "ol" => Some(Self::List),
            "textarea" => Some(Self::TextBox),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(Self::Heading),
            "input" => match input_type.unwrap_or("text").to_ascii_lowercase().as_str() {
                "checkbox" => Some(Self::Checkbox),
                "button" | "submit" | "reset" => Some(Self::Button),
                "text" | "email" | "search" | "tel" | "url" => Some(Self::TextBox),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromStr for AriaRole {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "button" => Ok(Self::Button),
            "checkbox" => Ok(Self::Checkbox),
            "heading" => Ok(Self::Heading),
            "link" => Ok(Self::Link),
            "list" => Ok(Self::List),
            "listitem" => Ok(Self::ListItem),
            "textbox" => Ok(Self::TextBox),
            other => Err(ProbeError::InvalidLocator {
                message: format!("unknown role '{other}'"),
            }),
        }
    }
}

impl fmt::Display for AriaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantic query over the DOM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Selector {
    /// CSS selector (e.g. `span.todo-count`)
    Css {
        /// Selector source
        css: String,
    },
    /// Test identifier (`data-testid` attribute)
    TestId {
        /// Attribute value
        id: String,
    },
    /// Accessibility role with an optional accessible name
    Role {
        /// Role to match
        role: AriaRole,
        /// Accessible name filter
        name: Option<TextMatch>,
    },
    /// Deepest elements whose rendered text matches
    Text {
        /// Text matcher
        text: TextMatch,
    },
}

impl Selector {
    /// CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::Css { css: css.into() }
    }

    /// Test identifier selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId { id: id.into() }
    }

    /// Role selector
    #[must_use]
    pub const fn role(role: AriaRole, name: Option<TextMatch>) -> Self {
        Self::Role { role, name }
    }

    /// Visible-text selector
    #[must_use]
    pub fn text(text: impl Into<TextMatch>) -> Self {
        Self::Text { text: text.into() }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { css } => write!(f, "locator({css:?})"),
            Self::TestId { id } => write!(f, "getByTestId({id:?})"),
            Self::Role { role, name: None } => write!(f, "getByRole({role})"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "getByRole({role}, name={name})"),
            Self::Text { text } => write!(f, "getByText({text})"),
        }
    }
}

/// One step of a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    /// Select descendants of the current set
    Find {
        /// Selector to apply
        selector: Selector,
    },
    /// Keep elements whose text content matches
    HasText {
        /// Text matcher
        text: TextMatch,
    },
    /// Keep elements containing a match for the nested steps
    Has {
        /// Nested locator steps, resolved relative to each element
        inner: Vec<Step>,
    },
    /// Keep a single element by position
    Nth {
        /// Position; negative values count from the end
        index: i64,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find { selector } => write!(f, "{selector}"),
            Self::HasText { text } => write!(f, "filter(hasText={text})"),
            Self::Has { inner } => {
                f.write_str("filter(has=")?;
                write_steps(f, inner)?;
                f.write_str(")")
            }
            Self::Nth { index: 0 } => f.write_str("first()"),
            Self::Nth { index: -1 } => f.write_str("last()"),
            Self::Nth { index } => write!(f, "nth({index})"),
        }
    }
}

fn write_steps(f: &mut fmt::Formatter<'_>, steps: &[Step]) -> fmt::Result {
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        write!(f, "{step}")?;
    }
    Ok(())
}

/// Lazy element query: an ordered chain of [`Step`]s
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    steps: Vec<Step>,
}

impl Locator {
    /// Locator starting from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            steps: vec![Step::Find { selector }],
        }
    }

    /// Locator for a CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::from_selector(Selector::css(css))
    }

    /// Locator for a test identifier
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::test_id(id))
    }

    /// Locator for a role, optionally filtered by accessible name
    #[must_use]
    pub fn role(role: AriaRole, name: Option<TextMatch>) -> Self {
        Self::from_selector(Selector::role(role, name))
    }

    /// Locator for visible text
    #[must_use]
    pub fn text(text: impl Into<TextMatch>) -> Self {
        Self::from_selector(Selector::text(text))
    }

    fn with_step(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Narrow to descendants matching a selector
    #[must_use]
    pub fn locator(&self, selector: Selector) -> Self {
        self.with_step(Step::Find { selector })
    }

    /// Narrow to descendants with a test identifier
    #[must_use]
    pub fn get_by_test_id(&self, id: impl Into<String>) -> Self {
        self.locator(Selector::test_id(id))
    }

    /// Narrow to descendants with a role
    #[must_use]
    pub fn get_by_role(&self, role: AriaRole, name: Option<TextMatch>) -> Self {
        self.locator(Selector::role(role, name))
    }

    /// Narrow to descendants with visible text
    #[must_use]
    pub fn get_by_text(&self, text: impl Into<TextMatch>) -> Self {
        self.locator(Selector::text(text))
    }

    /// Keep elements whose text matches. A plain string means containment.
    #[must_use]
    pub fn filter_has_text(&self, text: impl Into<TextMatch>) -> Self {
        self.with_step(Step::HasText { text: text.into() })
    }

    /// Keep elements containing a match for `inner`
    #[must_use]
    pub fn filter_has(&self, inner: &Self) -> Self {
        self.with_step(Step::Has {
            inner: inner.steps.clone(),
        })
    }

    /// First match
    #[must_use]
    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// Last match
    #[must_use]
    pub fn last(&self) -> Self {
        self.nth(-1)
    }

    /// Match at `index` (negative counts from the end)
    #[must_use]
    pub fn nth(&self, index: i64) -> Self {
        self.with_step(Step::Nth { index })
    }

    /// Steps of this locator
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Build a self-contained JavaScript expression that resolves this locator
    /// into `matches` (an array of elements in document order) and then runs
    /// `body`, whose `return` value becomes the value of the expression.
    ///
    /// # Errors
    ///
    /// Returns error if the steps cannot be serialized
    pub fn to_script(&self, body: &str) -> ProbeResult<String> {
        let steps = serde_json::to_string(&self.steps).map_err(|e| ProbeError::InvalidLocator {
            message: e.to_string(),
        })?;
        Ok(format!(
            "(() => {{\n{RESOLVER_RUNTIME}\nconst matches = __probeRun([document], {steps});\n{body}\n}})()"
        ))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("document");
        }
        write_steps(f, &self.steps)
    }
}

/// JavaScript interpreter for serialized [`Step`]s. Mirrors the matching rules
/// of [`TextMatch::matches`] and [`AriaRole::of_element`].
pub const RESOLVER_RUNTIME: &str = r#"
const __probeNorm = (s) => (s || '').replace(/\s+/g, ' ').trim();
const __probeText = (m, raw) => {
  const t = __probeNorm(raw);
  switch (m.kind) {
    case 'exact': return t === __probeNorm(m.value);
    case 'contains': return t.toLowerCase().includes(__probeNorm(m.value).toLowerCase());
    case 'pattern': return new RegExp(m.value).test(t);
    default: return false;
  }
};
const __probeRole = (el) => {
  const explicit = el.getAttribute('role');
  if (explicit) return explicit.trim().split(/\s+/)[0];
  const tag = el.tagName.toLowerCase();
  const type = (el.getAttribute('type') || 'text').toLowerCase();
  if (tag === 'button') return 'button';
  if (tag === 'a') return el.hasAttribute('href') ? 'link' : null;
  if (tag === 'li') return 'listitem';
  if (tag === 'ul' || tag === 'ol') return 'list';
  if (tag === 'textarea') return 'textbox';
  if (/^h[1-6]$/.test(tag)) return 'heading';
  if (tag === 'input') {
    if (type === 'checkbox') return 'checkbox';
    if (['button', 'submit', 'reset'].includes(type)) return 'button';
    if (['text', 'email', 'search', 'tel', 'url'].includes(type)) return 'textbox';
  }
  return null;
};
const __probeName = (el) => {
  const label = el.getAttribute('aria-label');
  if (label) return label;
  if (el.tagName === 'INPUT' || el.tagName === 'TEXTAREA') {
    return el.getAttribute('placeholder') || el.value || '';
  }
  return el.textContent;
};
const __probeFind = (scope, sel) => {
  const all = Array.from(scope.querySelectorAll('*'));
  switch (sel.kind) {
    case 'css': return Array.from(scope.querySelectorAll(sel.css));
    case 'testId': return all.filter((el) => el.getAttribute('data-testid') === sel.id);
    case 'role': return all.filter((el) => __probeRole(el) === sel.role
      && (!sel.name || __probeText(sel.name, __probeName(el))));
    case 'text': return all.filter((el) => __probeText(sel.text, el.textContent)
      && !Array.from(el.children).some((c) => __probeText(sel.text, c.textContent)));
    default: return [];
  }
};
const __probeRun = (roots, steps) => {
  let set = roots;
  for (const st of steps) {
    if (st.step === 'find') {
      const seen = new Set();
      for (const root of set) for (const el of __probeFind(root, st.selector)) seen.add(el);
      set = Array.from(seen).sort((a, b) =>
        (a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING) ? -1 : 1);
    } else if (st.step === 'hasText') {
      set = set.filter((el) => __probeText(st.text, el.textContent));
    } else if (st.step === 'has') {
      set = set.filter((el) => __probeRun([el], st.inner).length > 0);
    } else if (st.step === 'nth') {
      const i = st.index < 0 ? set.length + st.index : st.index;
      set = i >= 0 && i < set.length ? [set[i]] : [];
    }
  }
  return set;
};
"#;

#[cfg(test)]
mod tests {
    use super::*;

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_contains_ignores_case_and_whitespace() {
            let m = TextMatch::contains("buy  MILK");
            assert!(m.matches("  Please buy milk\n today"));
            assert!(!m.matches("Buy bread"));
        }

        #[test]
        fn test_exact_is_case_sensitive() {
            let m = TextMatch::exact("Buy milk");
            assert!(m.matches(" Buy   milk "));
            assert!(!m.matches("buy milk"));
            assert!(!m.matches("Buy milk now"));
        }

        #[test]
        fn test_pattern() {
            let m = TextMatch::pattern(r"^\d+ items? left!$").unwrap();
            assert!(m.matches("1 item left!"));
            assert!(m.matches("12 items left!"));
            assert!(!m.matches("no items left"));
        }

        #[test]
        fn test_invalid_pattern_rejected() {
            assert!(TextMatch::pattern("(unclosed").is_err());
        }

        #[test]
        fn test_pattern_wire_shape_and_validation() {
            let m = TextMatch::pattern(r"^Buy \w+$").unwrap();
            let json = serde_json::to_string(&m).unwrap();
            assert_eq!(json, r#"{"kind":"pattern","value":"^Buy \\w+$"}"#);
            let back: TextMatch = serde_json::from_str(&json).unwrap();
            assert_eq!(back, m);
            assert!(back.matches("Buy milk"));

            let bad = r#"{"kind":"pattern","value":"(unclosed"}"#;
            assert!(serde_json::from_str::<TextMatch>(bad).is_err());
        }

        #[test]
        fn test_str_converts_to_contains() {
            let m: TextMatch = "milk".into();
            assert_eq!(m, TextMatch::Contains("milk".to_string()));
        }

        #[test]
        fn test_serialized_shape() {
            let json = serde_json::to_string(&TextMatch::exact("a")).unwrap();
            assert_eq!(json, r#"{"kind":"exact","value":"a"}"#);
        }
    }

    mod role_tests {
        use super::*;

        #[test]
        fn test_implicit_roles() {
            assert_eq!(
                AriaRole::of_element("li", None, None, false),
                Some(AriaRole::ListItem)
            );
            assert_eq!(
                AriaRole::of_element("a", None, None, true),
                Some(AriaRole::Link)
            );
            assert_eq!(AriaRole::of_element("a", None, None, false), None);
            assert_eq!(
                AriaRole::of_element("input", None, Some("checkbox"), false),
                Some(AriaRole::Checkbox)
            );
            assert_eq!(
                AriaRole::of_element("input", None, None, false),
                Some(AriaRole::TextBox)
            );
            assert_eq!(
                AriaRole::of_element("H1", None, None, false),
                Some(AriaRole::Heading)
            );
        }

        #[test]
        fn test_explicit_role_wins() {
            assert_eq!(
                AriaRole::of_element("div", Some("button"), None, false),
                Some(AriaRole::Button)
            );
            assert_eq!(AriaRole::of_element("li", Some("presentation"), None, false), None);
        }

        #[test]
        fn test_role_serializes_lowercase() {
            let json = serde_json::to_string(&AriaRole::ListItem).unwrap();
            assert_eq!(json, "\"listitem\"");
            assert_eq!("textbox".parse::<AriaRole>().unwrap(), AriaRole::TextBox);
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_building_is_pure() {
            let rows = Locator::role(AriaRole::ListItem, None);
            let filtered = rows.filter_has_text("milk");
            assert_eq!(rows.steps().len(), 1);
            assert_eq!(filtered.steps().len(), 2);
        }

        #[test]
        fn test_display_chain() {
            let locator = Locator::role(AriaRole::ListItem, None)
                .filter_has_text("milk")
                .get_by_test_id("todo-item-button")
                .first();
            assert_eq!(
                locator.to_string(),
                r#"getByRole(listitem).filter(hasText=~"milk").getByTestId("todo-item-button").first()"#
            );
        }

        #[test]
        fn test_display_has_filter() {
            let label = Locator::test_id("todo-item-label").filter_has_text(TextMatch::exact("a"));
            let locator = Locator::role(AriaRole::ListItem, None).filter_has(&label);
            assert_eq!(
                locator.to_string(),
                r#"getByRole(listitem).filter(has=getByTestId("todo-item-label").filter(hasText="a"))"#
            );
        }

        #[test]
        fn test_nth_display() {
            let locator = Locator::css("li");
            assert_eq!(locator.last().to_string(), r#"locator("li").last()"#);
            assert_eq!(locator.nth(2).to_string(), r#"locator("li").nth(2)"#);
        }

        #[test]
        fn test_script_embeds_steps() {
            let locator = Locator::test_id("text-input");
            let script = locator.to_script("return matches.length;").unwrap();
            assert!(script.contains("__probeRun([document]"));
            assert!(script.contains(r#""kind":"testId","id":"text-input""#));
            assert!(script.trim_end().ends_with("})()"));
        }

        #[test]
        fn test_steps_round_trip_through_json() {
            let locator = Locator::role(AriaRole::Link, Some(TextMatch::exact("Active"))).nth(-1);
            let json = serde_json::to_string(&locator).unwrap();
            let back: Locator = serde_json::from_str(&json).unwrap();
            assert_eq!(back, locator);
        }
    }
}
