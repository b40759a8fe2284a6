//! Test doubles shared by the orchestration tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devlog_shared::{DevlogError, GenerationError, RepositoryRecord};

use crate::llm::CompletionBackend;
use crate::source::RepositorySource;

/// Replays a fixed script of outcomes, then repeats `fallback`.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: Result<String, GenerationError>,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(
        script: Vec<Result<String, GenerationError>>,
        fallback: Result<String, GenerationError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::new(Vec::new(), Ok(text.to_string()))
    }

    pub fn always_failing(err: GenerationError) -> Self {
        Self::new(Vec::new(), Err(err))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete_once(
        &self,
        prompt: &str,
        _max_tokens: u32,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn sample_repo(name: &str) -> RepositoryRecord {
    sample_repo_pushed(name, Utc::now())
}

pub fn sample_repo_pushed(name: &str, pushed_at: DateTime<Utc>) -> RepositoryRecord {
    RepositoryRecord {
        name: name.to_string(),
        description: format!("{name} turns ideas into code"),
        readme_text: format!("# {name}\n\nA small tool written in Rust."),
        pushed_at,
        html_url: format!("https://github.com/octocat/{name}"),
        stars: 12,
        forks: 3,
    }
}

/// In-memory repository listing.
pub struct FakeSource {
    repos: Option<Vec<RepositoryRecord>>,
}

impl FakeSource {
    pub fn new(repos: Vec<RepositoryRecord>) -> Self {
        Self { repos: Some(repos) }
    }

    /// A source whose listing always fails.
    pub fn failing() -> Self {
        Self { repos: None }
    }
}

#[async_trait]
impl RepositorySource for FakeSource {
    async fn list_repositories(&self) -> devlog_shared::Result<Vec<RepositoryRecord>> {
        self.repos
            .clone()
            .ok_or_else(|| DevlogError::Network("listing unavailable".into()))
    }

    async fn fetch_readme(&self, repo: &RepositoryRecord) -> String {
        repo.readme_text.clone()
    }
}
