//! Element locators and prioritized fallback chains

use anyhow::Result;
use log::debug;
use std::fmt;

use crate::driver::traits::PageDriver;

/// How to find an element on the page.
///
/// Every variant addresses the front end through what a user perceives
/// (role, text, label) or a stable attribute, never through DOM structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// ARIA role with accessible name
    Role {
        role: String,
        name: String,
        exact: bool,
    },
    /// Visible text, full case-sensitive match
    Text(String),
    /// Visible text matching a regex
    TextRegex {
        pattern: String,
        case_insensitive: bool,
    },
    /// Element of a CSS type carrying some text, e.g. a button labelled "Continue"
    HasText { css: String, text: String },
    AriaLabel { label: String, contains: bool },
    /// Placeholder substring, case-insensitive
    Placeholder(String),
    TestId { id: String, contains: bool },
    /// Raw CSS, for stable attributes such as `data-slot`
    Css(String),
}

impl Locator {
    pub fn role(role: &str, name: &str) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: name.to_string(),
            exact: false,
        }
    }

    pub fn role_exact(role: &str, name: &str) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: name.to_string(),
            exact: true,
        }
    }

    pub fn text_exact(text: &str) -> Self {
        Locator::Text(text.to_string())
    }

    pub fn text_regex(pattern: &str) -> Self {
        Locator::TextRegex {
            pattern: pattern.to_string(),
            case_insensitive: true,
        }
    }

    pub fn has_text(css: &str, text: &str) -> Self {
        Locator::HasText {
            css: css.to_string(),
            text: text.to_string(),
        }
    }

    pub fn aria_label(label: &str) -> Self {
        Locator::AriaLabel {
            label: label.to_string(),
            contains: false,
        }
    }

    pub fn aria_label_contains(label: &str) -> Self {
        Locator::AriaLabel {
            label: label.to_string(),
            contains: true,
        }
    }

    pub fn placeholder(text: &str) -> Self {
        Locator::Placeholder(text.to_string())
    }

    pub fn test_id(id: &str) -> Self {
        Locator::TestId {
            id: id.to_string(),
            contains: false,
        }
    }

    pub fn test_id_contains(id: &str) -> Self {
        Locator::TestId {
            id: id.to_string(),
            contains: true,
        }
    }

    pub fn css(css: &str) -> Self {
        Locator::Css(css.to_string())
    }

    /// Strategy name written into check details
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Role { .. } => "role",
            Locator::Text(_) => "text",
            Locator::TextRegex { .. } => "text-regex",
            Locator::HasText { .. } => "has-text",
            Locator::AriaLabel { .. } => "aria-label",
            Locator::Placeholder(_) => "placeholder",
            Locator::TestId { .. } => "test-id",
            Locator::Css(_) => "css",
        }
    }

    /// Playwright selector engine syntax
    pub fn to_playwright(&self) -> String {
        match self {
            Locator::Role { role, name, exact } => {
                let flag = if *exact { "s" } else { "i" };
                format!("role={}[name={}{}]", role, quote(name), flag)
            }
            Locator::Text(text) => format!("text={}", quote(text)),
            Locator::TextRegex {
                pattern,
                case_insensitive,
            } => {
                let flags = if *case_insensitive { "i" } else { "" };
                format!("text=/{}/{}", pattern, flags)
            }
            Locator::HasText { css, text } => format!("{}:has-text({})", css, quote(text)),
            Locator::AriaLabel { label, contains } => {
                let op = if *contains { "*=" } else { "=" };
                format!("[aria-label{}{}]", op, quote(label))
            }
            Locator::Placeholder(text) => format!("[placeholder*={} i]", quote(text)),
            Locator::TestId { id, contains } => {
                let op = if *contains { "*=" } else { "=" };
                format!("[data-testid{}{}]", op, quote(id))
            }
            Locator::Css(css) => css.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.strategy(), self.to_playwright())
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// The candidate that matched when a chain was resolved
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Zero-based position in the chain
    pub index: usize,
    pub locator: Locator,
}

impl Resolved {
    pub fn describe(&self) -> String {
        format!("found via {} (strategy #{})", self.locator, self.index + 1)
    }
}

/// Prioritized list of locator strategies, tried in order.
///
/// Replaces ad-hoc "try A, else B, else something broad" lookups; the winning
/// strategy is reported so a pass on the broadest fallback is visible.
#[derive(Debug, Clone)]
pub struct LocatorChain {
    name: String,
    candidates: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            candidates: Vec::new(),
        }
    }

    pub fn or(mut self, locator: Locator) -> Self {
        self.candidates.push(locator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[Locator] {
        &self.candidates
    }

    /// First candidate present on the page right now
    pub async fn resolve(&self, page: &dyn PageDriver) -> Result<Option<Resolved>> {
        for (index, locator) in self.candidates.iter().enumerate() {
            if page.count(locator).await? > 0 {
                debug!("{}: resolved via {}", self.name, locator);
                return Ok(Some(Resolved {
                    index,
                    locator: locator.clone(),
                }));
            }
        }
        Ok(None)
    }

    /// Detail text for a chain that found nothing
    pub fn describe_miss(&self) -> String {
        let tried: Vec<String> = self.candidates.iter().map(|l| l.to_playwright()).collect();
        format!("{} not found; tried [{}]", self.name, tried.join(", "))
    }
}
