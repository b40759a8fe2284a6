//! Tag normalization and keyword/tag extraction.

use devlog_shared::{RepositoryRecord, TagSet};
use tracing::{debug, warn};

use crate::llm::GenerationClient;
use crate::prompt::{PromptTemplate, PromptVars, truncate_chars};

/// Longest canonical tag.
pub const MAX_TAG_LEN: usize = 100;

/// Source text prefix sent to the extraction prompts.
const EXTRACTION_INPUT_LIMIT: usize = 3_000;

const EXTRACTION_MAX_TOKENS: u32 = 200;

const KEYWORDS_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "keywords",
    "Extract keywords from the following text:\n{text}\nReturn the keywords separated by commas:",
);

const TAGS_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "tags",
    "Extract tags from the following text:\n{text}\nReturn the tags separated by commas:",
);

/// Canonical form of a free-form tag: lowercase ASCII alphanumerics joined by
/// single hyphens, at most [`MAX_TAG_LEN`] chars. `None` if nothing is left.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug.truncate(MAX_TAG_LEN);
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}

/// Normalize and deduplicate.
pub fn normalize_tags<I, S>(raw: I) -> TagSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|t| normalize_tag(t.as_ref()))
        .collect()
}

/// Split a model's list reply into trimmed items.
///
/// Accepts `Label: a, b, c`, one item per line, and bulleted or numbered lists.
/// Header lines such as `Here are the tags:` carry no items and are skipped.
pub fn parse_list(response: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    for line in response.lines() {
        if line.trim_end().ends_with(':') {
            continue;
        }
        let line = match line.split_once(':') {
            Some((label, rest)) if is_label(label) => rest,
            _ => line,
        };
        for piece in line.split(',') {
            let item = strip_enumeration(piece.trim().trim_start_matches(['-', '*', '•']).trim())
                .trim_matches(['"', '\''])
                .trim();
            if !item.is_empty() && !items.iter().any(|i| i.eq_ignore_ascii_case(item)) {
                items.push(item.to_string());
            }
        }
    }
    items
}

/// Drop a leading `1.` or `2)` list marker.
fn strip_enumeration(item: &str) -> &str {
    let digits = item.len() - item.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = item[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    item
}

/// `Tags`, `Keywords`, `Suggested tags`, `Here are the keywords`, ...
fn is_label(label: &str) -> bool {
    let label = label.trim().trim_matches(['*', '#']).trim().to_ascii_lowercase();
    label
        .rsplit(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .is_some_and(|last| matches!(last, "keywords" | "tags" | "keyword" | "tag"))
}

/// Human-readable keywords plus canonical tags for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTerms {
    pub keywords: Vec<String>,
    pub tags: TagSet,
}

/// Ask the backend for keywords and tags. A failed call yields an empty list.
pub async fn extract_terms(client: &GenerationClient, repo: &RepositoryRecord) -> ExtractedTerms {
    let source = format!("{} {} {}", repo.name, repo.description, repo.readme_text);
    let vars = PromptVars::new().set("text", truncate_chars(&source, EXTRACTION_INPUT_LIMIT));

    let keywords = request_list(client, &KEYWORDS_TEMPLATE, &vars).await;
    let tags = normalize_tags(request_list(client, &TAGS_TEMPLATE, &vars).await);

    debug!(keywords = keywords.len(), tags = tags.len(), "terms extracted");
    ExtractedTerms { keywords, tags }
}

async fn request_list(
    client: &GenerationClient,
    template: &PromptTemplate,
    vars: &PromptVars,
) -> Vec<String> {
    let prompt = match template.render(vars) {
        Ok(prompt) => prompt,
        Err(e) => {
            warn!(prompt = template.name(), error = %e, "extraction prompt invalid");
            return Vec::new();
        }
    };
    match client.complete(&prompt, EXTRACTION_MAX_TOKENS).await {
        Ok(reply) => parse_list(&reply),
        Err(e) => {
            warn!(prompt = template.name(), error = %e, "extraction failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{Backoff, RetryPolicy};
    use crate::testing::{ScriptedBackend, sample_repo};
    use devlog_shared::GenerationError;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn normalize_examples() {
        assert_eq!(normalize_tag("AI Tools!").as_deref(), Some("ai-tools"));
        assert_eq!(normalize_tag("web_dev").as_deref(), Some("web-dev"));
        assert_eq!(normalize_tag("  Rust  ").as_deref(), Some("rust"));
        assert_eq!(normalize_tag("C++ / Qt").as_deref(), Some("c-qt"));
        assert_eq!(normalize_tag("---"), None);
        assert_eq!(normalize_tag(""), None);
        assert_eq!(normalize_tag("日本語"), None);
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["Machine Learning", "--a--b--", "Node.js", "x_y_z"] {
            let once = normalize_tag(raw).unwrap();
            assert_eq!(normalize_tag(&once).as_deref(), Some(once.as_str()));
        }
    }

    #[test]
    fn long_tags_are_truncated_without_trailing_hyphen() {
        let raw = format!("{} tail", "a".repeat(99));
        let tag = normalize_tag(&raw).unwrap();
        assert_eq!(tag.len(), 99);
        assert!(!tag.ends_with('-'));

        let tag = normalize_tag(&"b".repeat(250)).unwrap();
        assert_eq!(tag.len(), MAX_TAG_LEN);
    }

    #[test]
    fn normalize_tags_dedupes() {
        let set = normalize_tags(["Rust", "rust", "RUST!", "cli"]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["cli", "rust"]);
    }

    #[test]
    fn parse_list_formats() {
        assert_eq!(parse_list("Keywords: rust, cli, async"), vec!["rust", "cli", "async"]);
        assert_eq!(parse_list("- rust\n- cli\n"), vec!["rust", "cli"]);
        assert_eq!(parse_list("1. Rust\n2) CLI"), vec!["Rust", "CLI"]);
        assert_eq!(parse_list("rust, Rust, , cli"), vec!["rust", "cli"]);
        assert_eq!(parse_list("Note: this is a tag"), vec!["Note: this is a tag"]);
        assert_eq!(parse_list("3D printing"), vec!["3D printing"]);
        assert_eq!(parse_list("Here are the tags:\n- Rust\n- CLI"), vec!["Rust", "CLI"]);
        assert_eq!(parse_list("Suggested TAGS: rust, cli"), vec!["rust", "cli"]);
        assert_eq!(parse_list("**Keywords**: async"), vec!["async"]);
        assert!(parse_list("").is_empty());
    }

    #[tokio::test]
    async fn extract_terms_normalizes_tags_only() {
        let backend = Arc::new(ScriptedBackend::new(
            vec![
                Ok("Keywords: Rust, Command Line".into()),
                Ok("Tags: Rust, Command Line, web_dev".into()),
            ],
            Ok(String::new()),
        ));
        let client = GenerationClient::new(backend, RetryPolicy::new(1, Backoff::Fixed(Duration::ZERO)));
        let terms = extract_terms(&client, &sample_repo("devlog")).await;

        assert_eq!(terms.keywords, vec!["Rust", "Command Line"]);
        assert_eq!(
            terms.tags.into_iter().collect::<Vec<_>>(),
            vec!["command-line", "rust", "web-dev"]
        );
    }

    #[test]
    fn preamble_never_becomes_a_tag() {
        let tags = normalize_tags(parse_list("Here are the tags:\n- Rust\n- CLI"));
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["cli", "rust"]);
    }

    #[tokio::test]
    async fn extraction_failure_yields_empty() {
        let backend = Arc::new(ScriptedBackend::always_failing(GenerationError::Network(
            "down".into(),
        )));
        let client = GenerationClient::new(backend, RetryPolicy::new(2, Backoff::Fixed(Duration::ZERO)));
        let terms = extract_terms(&client, &sample_repo("devlog")).await;
        assert_eq!(terms, ExtractedTerms::default());
    }
}
