//! In-memory element tree with locator resolution.
//!
//! Nodes are addressed by their child-index path from the document root.
//! Sorting paths lexicographically yields document order, which is what the
//! `Find` step needs after merging matches from several scopes.

use crate::driver::ElementSnapshot;
use crate::locator::{AriaRole, Locator, Selector, Step};
use crate::result::{ProbeError, ProbeResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::iter::Peekable;
use std::str::Chars;

/// Child-index path from the document root
pub type NodePath = Vec<usize>;

/// One element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Text rendered before the children
    pub text: String,
    /// Child elements
    pub children: Vec<Element>,
    /// Not rendered (`display: none`)
    pub hidden: bool,
    /// Current value of a form control
    pub value: Option<String>,
    /// Checked state of a checkbox
    pub checked: bool,
    /// Application key of the model object this element renders
    pub key: Option<u64>,
}

impl Element {
    /// Empty element
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Add a class token
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        let classes = self.attributes.entry("class".to_string()).or_default();
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str(class);
        self
    }

    /// Set `data-testid`
    #[must_use]
    pub fn test_id(self, id: &str) -> Self {
        self.attr("data-testid", id)
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Hide the element and its subtree
    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set the form value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the checked state
    #[must_use]
    pub const fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Tag with a model key
    #[must_use]
    pub const fn key(mut self, key: u64) -> Self {
        self.key = Some(key);
        self
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the class attribute holds `class` as a token
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|c| c.split_whitespace().any(|t| t == class))
    }

    /// `textContent`: own text followed by the children's, in order
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.text_content());
        }
        out
    }

    fn role(&self) -> Option<AriaRole> {
        AriaRole::of_element(
            &self.tag,
            self.attribute("role"),
            self.attribute("type"),
            self.attributes.contains_key("href"),
        )
    }

    fn accessible_name(&self) -> String {
        if let Some(label) = self.attribute("aria-label").filter(|l| !l.is_empty()) {
            return label.to_string();
        }
        if self.tag == "input" || self.tag == "textarea" {
            return self
                .attribute("placeholder")
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .or_else(|| self.value.clone())
                .unwrap_or_default();
        }
        self.text_content()
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if let Some(value) = &self.value {
            let _ = write!(out, " value=\"{}\"", escape(value));
        }
        if self.checked {
            out.push_str(" checked");
        }
        if self.hidden {
            out.push_str(" hidden");
        }
        out.push('>');
        if self.tag == "input" {
            return;
        }
        out.push_str(&escape(&self.text));
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Document whose body holds `children`
    #[must_use]
    pub fn new(children: Vec<Element>) -> Self {
        Self {
            root: Element::new("#document").children(children),
        }
    }

    /// The `#document` node
    #[must_use]
    pub const fn root(&self) -> &Element {
        &self.root
    }

    /// Node at a path
    #[must_use]
    pub fn node(&self, path: &[usize]) -> Option<&Element> {
        path.iter()
            .try_fold(&self.root, |node, &i| node.children.get(i))
    }

    /// Elements on the way from the node up to the root, nearest first.
    /// Neither the node itself nor the `#document` root is included.
    pub fn ancestors<'a>(&'a self, path: &'a [usize]) -> impl Iterator<Item = &'a Element> + 'a {
        (1..path.len())
            .rev()
            .filter_map(move |len| self.node(&path[..len]))
    }

    /// Rendered: neither the node nor any ancestor is hidden
    #[must_use]
    pub fn is_visible(&self, path: &[usize]) -> bool {
        self.node(path).is_some_and(|n| !n.hidden) && self.ancestors(path).all(|a| !a.hidden)
    }

    /// Snapshot of one node
    #[must_use]
    pub fn snapshot(&self, path: &[usize]) -> Option<ElementSnapshot> {
        let node = self.node(path)?;
        Some(ElementSnapshot {
            tag: node.tag.clone(),
            text: node.text_content(),
            attributes: node.attributes.clone(),
            value: node.value.clone(),
            checked: node.checked,
            visible: self.is_visible(path),
        })
    }

    /// Resolve a locator into node paths in document order
    pub fn resolve(&self, locator: &Locator) -> ProbeResult<Vec<NodePath>> {
        self.run(vec![Vec::new()], locator.steps())
    }

    /// Resolve a locator into snapshots in document order
    pub fn inspect(&self, locator: &Locator) -> ProbeResult<Vec<ElementSnapshot>> {
        Ok(self
            .resolve(locator)?
            .iter()
            .filter_map(|p| self.snapshot(p))
            .collect())
    }

    fn run(&self, roots: Vec<NodePath>, steps: &[Step]) -> ProbeResult<Vec<NodePath>> {
        let mut set = roots;
        for step in steps {
            set = match step {
                Step::Find { selector } => {
                    let css = match selector {
                        Selector::Css { css } => Some(CssSelector::parse(css)?),
                        _ => None,
                    };
                    let mut found = BTreeSet::new();
                    for root in &set {
                        for path in self.descendants(root) {
                            if self.matches(&path, selector, css.as_ref()) {
                                found.insert(path);
                            }
                        }
                    }
                    found.into_iter().collect()
                }
                Step::HasText { text } => set
                    .into_iter()
                    .filter(|p| self.node(p).is_some_and(|n| text.matches(&n.text_content())))
                    .collect(),
                Step::Has { inner } => {
                    let mut kept = Vec::new();
                    for path in set {
                        if !self.run(vec![path.clone()], inner)?.is_empty() {
                            kept.push(path);
                        }
                    }
                    kept
                }
                Step::Nth { index } => {
                    let len = set.len() as i64;
                    let i = if *index < 0 { len + index } else { *index };
                    if (0..len).contains(&i) {
                        vec![set.swap_remove(i as usize)]
                    } else {
                        Vec::new()
                    }
                }
            };
        }
        Ok(set)
    }

    fn descendants(&self, root: &[usize]) -> Vec<NodePath> {
        let mut out = Vec::new();
        if let Some(node) = self.node(root) {
            collect(node, &mut root.to_vec(), &mut out);
        }
        out
    }

    fn matches(&self, path: &[usize], selector: &Selector, css: Option<&CssSelector>) -> bool {
        let Some(node) = self.node(path) else {
            return false;
        };
        match selector {
            Selector::Css { .. } => css.is_some_and(|css| css.matches(self, path)),
            Selector::TestId { id } => node.attribute("data-testid") == Some(id.as_str()),
            Selector::Role { role, name } => {
                node.role() == Some(*role)
                    && name.as_ref().map_or(true, |n| n.matches(&node.accessible_name()))
            }
            Selector::Text { text } => {
                text.matches(&node.text_content())
                    && !node
                        .children
                        .iter()
                        .any(|c| text.matches(&c.text_content()))
            }
        }
    }

    /// Serialized HTML
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html><html><body>");
        for child in &self.root.children {
            child.write_html(&mut out);
        }
        out.push_str("</body></html>");
        out
    }
}

fn collect(node: &Element, path: &mut NodePath, out: &mut Vec<NodePath>) {
    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        out.push(path.clone());
        collect(child, path, out);
        path.pop();
    }
}

/// One compound selector: `tag#id.class[attr=value]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: &Element) -> bool {
        self.tag.as_ref().map_or(true, |t| *t == node.tag)
            && self
                .id
                .as_ref()
                .map_or(true, |id| node.attribute("id") == Some(id.as_str()))
            && self.classes.iter().all(|c| node.has_class(c))
            && self.attrs.iter().all(|(name, value)| match value {
                Some(v) => node.attribute(name) == Some(v.as_str()),
                None => node.attributes.contains_key(name),
            })
    }
}

/// The supported CSS subset: compound selectors joined by the descendant
/// combinator
#[derive(Debug, Clone, PartialEq, Eq)]
struct CssSelector {
    parts: Vec<Compound>,
}

impl CssSelector {
    fn parse(css: &str) -> ProbeResult<Self> {
        let invalid = |why: &str| ProbeError::InvalidLocator {
            message: format!("unsupported CSS selector {css:?}: {why}"),
        };
        let parts = css
            .split_whitespace()
            .map(|token| parse_compound(token).ok_or_else(|| invalid(token)))
            .collect::<ProbeResult<Vec<_>>>()?;
        if parts.is_empty() {
            return Err(invalid("empty"));
        }
        Ok(Self { parts })
    }

    fn matches(&self, doc: &Document, path: &[usize]) -> bool {
        let Some((last, rest)) = self.parts.split_last() else {
            return false;
        };
        if !doc.node(path).is_some_and(|n| last.matches(n)) {
            return false;
        }
        let mut pending = rest.iter().rev().peekable();
        for ancestor in doc.ancestors(path) {
            match pending.peek() {
                Some(part) if part.matches(ancestor) => {
                    pending.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        pending.peek().is_none()
    }
}

fn parse_compound(token: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut chars = token.chars().peekable();
    if chars.peek() == Some(&'*') {
        chars.next();
    } else if chars.peek().is_some_and(char::is_ascii_alphabetic) {
        compound.tag = Some(ident(&mut chars)?.to_ascii_lowercase());
    }
    while let Some(c) = chars.next() {
        match c {
            '.' => compound.classes.push(ident(&mut chars)?),
            '#' => compound.id = Some(ident(&mut chars)?),
            '[' => {
                let name = ident(&mut chars)?;
                let value = match chars.next()? {
                    ']' => None,
                    '=' => {
                        let mut raw = String::new();
                        for c in chars.by_ref() {
                            if c == ']' {
                                break;
                            }
                            raw.push(c);
                        }
                        Some(raw.trim_matches(|q| q == '"' || q == '\'').to_string())
                    }
                    _ => return None,
                };
                compound.attrs.push((name, value));
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn ident(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut s = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            s.push(c);
            chars.next();
        } else {
            break;
        }
    }
    (!s.is_empty()).then_some(s)
}
