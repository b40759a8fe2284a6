//! Drives the article outline through the generation client.
//!
//! A failing section never aborts the repository: it is recorded as
//! [`GenerationResult::Failed`] and rendered as a placeholder, so the article
//! always carries every planned heading.

use devlog_shared::{GenerationError, RepositoryRecord};
use tracing::{debug, info, instrument, warn};

use crate::llm::GenerationClient;
use crate::prompt::PromptVars;
use crate::sections::{self, SectionKind, SectionSpec, TITLE_MAX_TOKENS, TITLE_TEMPLATE};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why a section has no generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The client gave up.
    Exhausted {
        attempts: u32,
        last_error: GenerationError,
    },
    /// The template could not be rendered; no request was made.
    InvalidPrompt(String),
}

/// Outcome of one (repository, section) generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Success(String),
    Failed(FailureReason),
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Placeholder body for a section that could not be generated.
pub fn placeholder(kind: SectionKind, reason: &FailureReason) -> String {
    match reason {
        FailureReason::Exhausted { attempts, .. } => {
            format!("[Failed to generate content for {kind} after {attempts} attempts]")
        }
        FailureReason::InvalidPrompt(message) => {
            format!("[Failed to generate content for {kind}: {message}]")
        }
    }
}

/// A section ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSection {
    pub kind: SectionKind,
    pub heading: &'static str,
    pub result: GenerationResult,
}

impl GeneratedSection {
    /// Generated content, or the placeholder.
    pub fn body(&self) -> String {
        match &self.result {
            GenerationResult::Success(content) => content.trim().to_string(),
            GenerationResult::Failed(reason) => placeholder(self.kind, reason),
        }
    }
}

/// Title used when generation fails or returns nothing usable.
pub fn fallback_title(repo_name: &str) -> String {
    format!("Building {repo_name}: A Developer's Journey")
}

/// Trim whitespace and one layer of surrounding quotes.
fn clean_title(raw: &str) -> String {
    let line = raw.trim().lines().next().unwrap_or_default().trim();
    line.trim_matches(|c| matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}'))
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// SectionGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SectionGenerator {
    client: GenerationClient,
}

impl SectionGenerator {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    /// Generate the article title, falling back to a fixed pattern.
    #[instrument(skip_all, fields(repo = %repo.name))]
    pub async fn generate_title(&self, repo: &RepositoryRecord) -> String {
        let vars = PromptVars::for_repository(repo);
        let prompt = match TITLE_TEMPLATE.render(&vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "title prompt invalid, using fallback");
                return fallback_title(&repo.name);
            }
        };

        match self.client.complete(&prompt, TITLE_MAX_TOKENS).await {
            Ok(raw) => {
                let title = clean_title(&raw);
                if title.is_empty() {
                    fallback_title(&repo.name)
                } else {
                    title
                }
            }
            Err(e) => {
                warn!(error = %e, "title generation failed, using fallback");
                fallback_title(&repo.name)
            }
        }
    }

    /// Generate every planned section plus the conclusion, strictly in order.
    #[instrument(skip_all, fields(repo = %repo.name))]
    pub async fn generate_sections(&self, repo: &RepositoryRecord) -> Vec<GeneratedSection> {
        let vars = PromptVars::for_repository(repo);
        let mut out = Vec::new();

        for spec in sections::plan() {
            let result = self.generate_section(&spec, &vars).await;
            out.push(GeneratedSection {
                kind: spec.kind,
                heading: spec.heading,
                result,
            });
        }

        let failed = out.iter().filter(|s| !s.result.is_success()).count();
        info!(sections = out.len(), failed, "sections generated");
        out
    }

    /// Render and complete a single section.
    pub async fn generate_section(&self, spec: &SectionSpec, vars: &PromptVars) -> GenerationResult {
        let prompt = match spec.template.render(vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(section = %spec.kind, error = %e, "section prompt invalid");
                return GenerationResult::Failed(FailureReason::InvalidPrompt(e.to_string()));
            }
        };

        match self.client.complete(&prompt, spec.max_tokens).await {
            Ok(content) => {
                debug!(section = %spec.kind, chars = content.len(), "section generated");
                GenerationResult::Success(content)
            }
            Err(exhausted) => {
                warn!(section = %spec.kind, error = %exhausted, "section generation failed");
                GenerationResult::Failed(FailureReason::Exhausted {
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptTemplate;
    use crate::retry::{Backoff, RetryPolicy};
    use crate::testing::{ScriptedBackend, sample_repo};
    use std::sync::Arc;
    use std::time::Duration;

    fn generator(backend: Arc<ScriptedBackend>, attempts: u32) -> SectionGenerator {
        SectionGenerator::new(GenerationClient::new(
            backend,
            RetryPolicy::new(attempts, Backoff::Fixed(Duration::ZERO)),
        ))
    }

    #[tokio::test]
    async fn all_sections_succeed_in_order() {
        let backend = Arc::new(ScriptedBackend::always("body text"));
        let sections = generator(backend.clone(), 3)
            .generate_sections(&sample_repo("devlog"))
            .await;

        assert_eq!(sections.len(), 5);
        assert!(sections.iter().all(|s| s.body() == "body text"));
        assert_eq!(sections[4].kind, SectionKind::Conclusion);
        assert_eq!(backend.calls(), 5);

        let prompts = backend.prompts();
        assert!(prompts[0].contains("opening of a blog post about devlog"));
        assert!(prompts[4].contains("forward-looking conclusion"));
    }

    #[tokio::test]
    async fn total_failure_still_yields_every_heading() {
        let backend = Arc::new(ScriptedBackend::always_failing(GenerationError::Network(
            "down".into(),
        )));
        let sections = generator(backend.clone(), 3)
            .generate_sections(&sample_repo("devlog"))
            .await;

        assert_eq!(sections.len(), 5);
        assert_eq!(backend.calls(), 15);
        assert_eq!(
            sections[0].body(),
            "[Failed to generate content for introduction after 3 attempts]"
        );
        assert_eq!(
            sections[4].body(),
            "[Failed to generate content for conclusion after 3 attempts]"
        );
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_later_sections() {
        let backend = Arc::new(ScriptedBackend::new(
            vec![
                Ok("intro".into()),
                Err(GenerationError::Rejected {
                    status: 400,
                    body: "too long".into(),
                }),
                Ok("tech".into()),
                Ok("lessons".into()),
                Ok("next".into()),
            ],
            Ok("unused".into()),
        ));
        let sections = generator(backend.clone(), 3)
            .generate_sections(&sample_repo("devlog"))
            .await;

        let bodies: Vec<_> = sections.iter().map(GeneratedSection::body).collect();
        assert_eq!(bodies[0], "intro");
        assert_eq!(
            bodies[1],
            "[Failed to generate content for research after 1 attempts]"
        );
        assert_eq!(bodies[2], "tech");
        assert_eq!(bodies[4], "next");
        assert_eq!(backend.calls(), 5);
    }

    #[tokio::test]
    async fn invalid_prompt_fails_without_calling_backend() {
        let backend = Arc::new(ScriptedBackend::always("never"));
        let spec = SectionSpec {
            kind: SectionKind::Technical,
            heading: "## Under the Hood",
            template: PromptTemplate::new("broken", "About {name} using {stack}"),
            max_tokens: 10,
        };
        let vars = PromptVars::for_repository(&sample_repo("devlog"));
        let result = generator(backend.clone(), 3).generate_section(&spec, &vars).await;

        match result {
            GenerationResult::Failed(FailureReason::InvalidPrompt(msg)) => {
                assert!(msg.contains("stack"))
            }
            other => panic!("expected InvalidPrompt, got {other:?}"),
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn title_is_unquoted() {
        let backend = Arc::new(ScriptedBackend::always("  \"Weekend Hack: How I Built devlog\"\n"));
        let title = generator(backend, 1).generate_title(&sample_repo("devlog")).await;
        assert_eq!(title, "Weekend Hack: How I Built devlog");
    }

    #[tokio::test]
    async fn title_falls_back_on_failure() {
        let backend = Arc::new(ScriptedBackend::always_failing(GenerationError::Timeout(
            "60s".into(),
        )));
        let title = generator(backend, 2).generate_title(&sample_repo("devlog")).await;
        assert_eq!(title, "Building devlog: A Developer's Journey");
    }

    #[test]
    fn clean_title_variants() {
        assert_eq!(clean_title("'Quoted'"), "Quoted");
        assert_eq!(clean_title("\u{201c}Curly\u{201d}"), "Curly");
        assert_eq!(clean_title("First line\nSecond"), "First line");
        assert_eq!(clean_title("  \"\" "), "");
    }
}
