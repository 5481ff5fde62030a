//! Retrying assertions (`expect(set).to_have_text(..)`).
//!
//! Each assertion re-resolves its locator on every poll and passes as soon as
//! the page agrees. It fails with [`ProbeError::AssertionFailed`] only after
//! the retry budget runs out, so render lag never shows up as a failure.

use crate::driver::ElementSnapshot;
use crate::element::ElementSet;
use crate::locator::{normalize_whitespace, TextMatch};
use crate::result::{ProbeError, ProbeResult};
use crate::retry::{retry, Attempt, RetryConfig};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One condition on the elements a locator resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Exactly this many matches
    Count(usize),
    /// Single match whose text matches
    Text(TextMatch),
    /// One match per entry, texts equal in order
    Texts(Vec<String>),
    /// Single match whose normalized text contains the substring
    ContainsText(String),
    /// Single match with this class token
    Class(String),
    /// Single match without this class token
    NotClass(String),
    /// Single match with an attribute value
    Attribute {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Single visible match
    Visible,
    /// No match, or a single invisible one
    Hidden,
    /// Single checked checkbox
    Checked,
}

impl Expectation {
    /// Whether the condition is about exactly one element
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        !matches!(self, Self::Count(_) | Self::Texts(_))
    }

    /// Evaluate against one resolution
    pub fn evaluate(&self, snapshots: &[ElementSnapshot]) -> Attempt<()> {
        let single = snapshots.first();
        let outcome = match self {
            Self::Count(expected) => {
                let actual = snapshots.len();
                (actual == *expected)
                    .then_some(())
                    .ok_or_else(|| format!("found {actual}"))
            }
            Self::Texts(expected) => {
                let actual: Vec<String> = snapshots
                    .iter()
                    .map(|s| normalize_whitespace(&s.text))
                    .collect();
                let wanted: Vec<String> = expected.iter().map(|t| normalize_whitespace(t)).collect();
                (actual == wanted)
                    .then_some(())
                    .ok_or_else(|| format!("found {actual:?}"))
            }
            Self::Hidden => match single {
                Some(s) if s.visible => Err("element is visible".to_string()),
                _ => Ok(()),
            },
            _ => match single {
                None => Err("no element matches".to_string()),
                Some(s) => self.evaluate_single(s),
            },
        };
        match outcome {
            Ok(()) => Attempt::Done(()),
            Err(reason) => Attempt::Retry(reason),
        }
    }

    fn evaluate_single(&self, s: &ElementSnapshot) -> Result<(), String> {
        let pass = match self {
            Self::Text(m) => m.matches(&s.text),
            Self::ContainsText(needle) => {
                normalize_whitespace(&s.text).contains(&normalize_whitespace(needle))
            }
            Self::Class(class) => s.has_class(class),
            Self::NotClass(class) => !s.has_class(class),
            Self::Attribute { name, value } => s.attribute(name) == Some(value.as_str()),
            Self::Visible => s.visible,
            Self::Checked => s.checked,
            Self::Count(_) | Self::Texts(_) | Self::Hidden => true,
        };
        if pass {
            return Ok(());
        }
        Err(match self {
            Self::Class(_) | Self::NotClass(_) => {
                format!("class is {:?}", s.attribute("class").unwrap_or_default())
            }
            Self::Attribute { name, .. } => format!("{name} is {:?}", s.attribute(name)),
            Self::Visible => "element is not visible".to_string(),
            Self::Checked => "element is not checked".to_string(),
            _ => format!("text is {:?}", normalize_whitespace(&s.text)),
        })
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "to have count {n}"),
            Self::Text(m) => write!(f, "to have text {m}"),
            Self::Texts(texts) => write!(f, "to have texts {texts:?}"),
            Self::ContainsText(t) => write!(f, "to contain text {t:?}"),
            Self::Class(c) => write!(f, "to have class {c:?}"),
            Self::NotClass(c) => write!(f, "not to have class {c:?}"),
            Self::Attribute { name, value } => write!(f, "to have {name}={value:?}"),
            Self::Visible => f.write_str("to be visible"),
            Self::Hidden => f.write_str("to be hidden"),
            Self::Checked => f.write_str("to be checked"),
        }
    }
}

/// Retrying assertions over an [`ElementSet`]
#[derive(Debug, Clone)]
pub struct ElementExpect {
    set: ElementSet,
    config: RetryConfig,
}

impl ElementExpect {
    /// Assertions on `set` with a retry budget
    #[must_use]
    pub const fn new(set: ElementSet, config: RetryConfig) -> Self {
        Self { set, config }
    }

    /// Override the timeout for this assertion
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Poll until `expectation` holds.
    ///
    /// Several matches for a single-element expectation are retried like any
    /// other mismatch. Only when the last poll still saw several does the
    /// assertion fail with [`ProbeError::StrictModeViolation`].
    pub async fn to_satisfy(&self, expectation: Expectation) -> ProbeResult<()> {
        let set = &self.set;
        let expectation = &expectation;
        let crowded = AtomicUsize::new(0);
        let crowded = &crowded;
        retry(
            &self.config,
            move || async move {
                let snapshots = set.snapshots().await?;
                if expectation.is_strict() && snapshots.len() > 1 {
                    crowded.store(snapshots.len(), Ordering::Relaxed);
                    return Ok(Attempt::Retry(format!(
                        "strict mode: {} matches",
                        snapshots.len()
                    )));
                }
                crowded.store(0, Ordering::Relaxed);
                Ok(expectation.evaluate(&snapshots))
            },
            |err| match set.ensure_strict(crowded.load(Ordering::Relaxed)) {
                Err(strict) => strict,
                Ok(()) => ProbeError::AssertionFailed {
                    message: format!("expected {set} {expectation}: {err}"),
                },
            },
        )
        .await
    }

    /// Exactly `count` matches
    pub async fn to_have_count(&self, count: usize) -> ProbeResult<()> {
        self.to_satisfy(Expectation::Count(count)).await
    }

    /// Single match with text. A plain string means exact text.
    pub async fn to_have_text(&self, text: impl Into<String>) -> ProbeResult<()> {
        self.to_satisfy(Expectation::Text(TextMatch::exact(text))).await
    }

    /// Single match with text satisfying a matcher
    pub async fn to_have_text_matching(&self, text: TextMatch) -> ProbeResult<()> {
        self.to_satisfy(Expectation::Text(text)).await
    }

    /// All matches, texts equal to `texts` in order
    pub async fn to_have_texts<S: AsRef<str>>(&self, texts: &[S]) -> ProbeResult<()> {
        let texts = texts.iter().map(|t| t.as_ref().to_string()).collect();
        self.to_satisfy(Expectation::Texts(texts)).await
    }

    /// Single match whose text contains `text` (case-sensitive)
    pub async fn to_contain_text(&self, text: impl Into<String>) -> ProbeResult<()> {
        self.to_satisfy(Expectation::ContainsText(text.into())).await
    }

    /// Single match with a class token
    pub async fn to_have_class(&self, class: impl Into<String>) -> ProbeResult<()> {
        self.to_satisfy(Expectation::Class(class.into())).await
    }

    /// Single match without a class token
    pub async fn not_to_have_class(&self, class: impl Into<String>) -> ProbeResult<()> {
        self.to_satisfy(Expectation::NotClass(class.into())).await
    }

    /// Single match with an attribute value
    pub async fn to_have_attribute(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> ProbeResult<()> {
        self.to_satisfy(Expectation::Attribute {
            name: name.into(),
            value: value.into(),
        })
        .await
    }

    /// Single visible match
    pub async fn to_be_visible(&self) -> ProbeResult<()> {
        self.to_satisfy(Expectation::Visible).await
    }

    /// No visible match
    pub async fn to_be_hidden(&self) -> ProbeResult<()> {
        self.to_satisfy(Expectation::Hidden).await
    }

    /// Single checked match
    pub async fn to_be_checked(&self) -> ProbeResult<()> {
        self.to_satisfy(Expectation::Checked).await
    }
}
