//! Prompt templates with `{name}` placeholders.
//!
//! Rendering fails if any placeholder has no value, so a typo in a template
//! never reaches the backend as literal braces.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use devlog_shared::{DevlogError, RepositoryRecord, Result};
use regex::{Captures, Regex};

/// README prefix kept for long-form prompts.
pub const README_LIMIT: usize = 6_000;

/// README prefix used for the introduction and title.
pub const EXCERPT_LIMIT: usize = 500;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Named values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptVars {
    values: BTreeMap<&'static str, String>,
}

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Standard variables for one repository: `name`, `description`,
    /// `readme` (bounded) and `readme_excerpt`.
    pub fn for_repository(repo: &RepositoryRecord) -> Self {
        Self::new()
            .set("name", repo.name.as_str())
            .set("description", repo.description.as_str())
            .set("readme", truncate_chars(&repo.readme_text, README_LIMIT))
            .set(
                "readme_excerpt",
                truncate_chars(&repo.readme_text, EXCERPT_LIMIT),
            )
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    name: &'static str,
    text: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Placeholder names used by this template.
    pub fn placeholders(&self) -> BTreeSet<&'static str> {
        PLACEHOLDER
            .captures_iter(self.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    /// Substitute every placeholder, or fail naming the ones without a value.
    pub fn render(&self, vars: &PromptVars) -> Result<String> {
        let missing: Vec<&str> = self
            .placeholders()
            .into_iter()
            .filter(|p| vars.get(p).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(DevlogError::validation(format!(
                "prompt `{}` is missing variables: {}",
                self.name,
                missing.join(", ")
            )));
        }

        let rendered = PLACEHOLDER.replace_all(self.text, |caps: &Captures<'_>| {
            vars.get(&caps[1]).unwrap_or_default().to_string()
        });
        Ok(rendered.trim().to_string())
    }
}
