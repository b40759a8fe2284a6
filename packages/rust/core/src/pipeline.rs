//! Batch pipeline: list → gate → generate → tag → analytics → assemble → write.
//!
//! Repositories are processed strictly one after another. Only a failure to
//! list repositories fails the batch; anything that goes wrong for a single
//! repository is logged, recorded in the [`BatchReport`], and the loop moves on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use devlog_shared::{CommitRecord, PublishSettings, RepositoryRecord, Result};
use devlog_storage::{ArtifactStore, TagStore, canonical_key};

use crate::analytics::{AnalyticsRefs, AnalyticsRenderer, NoAnalytics, read_commit_history};
use crate::assembler::{AssemblyInput, DocumentAssembler};
use crate::gate::{PublishGate, PublishState, SkipReason};
use crate::generator::SectionGenerator;
use crate::source::RepositorySource;
use crate::tags::extract_terms;

// ---------------------------------------------------------------------------
// Report + progress
// ---------------------------------------------------------------------------

/// Outcome of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Repositories that produced an artifact, with its location.
    pub processed: Vec<(String, PathBuf)>,
    pub skipped: Vec<(String, SkipReason)>,
    /// Repositories that failed, with the error message.
    pub failed: Vec<(String, String)>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a repository is evaluated.
    fn repository(&self, name: &str, current: usize, total: usize);
    /// Called when the batch completes.
    fn done(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn repository(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &BatchReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    source: Arc<dyn RepositorySource>,
    generator: SectionGenerator,
    gate: PublishGate,
    assembler: DocumentAssembler,
    artifacts: Arc<dyn ArtifactStore>,
    tags: Arc<TagStore>,
    analytics: Arc<dyn AnalyticsRenderer>,
    checkout_root: Option<PathBuf>,
    max_repositories: usize,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn RepositorySource>,
        generator: SectionGenerator,
        artifacts: Arc<dyn ArtifactStore>,
        tags: Arc<TagStore>,
        settings: &PublishSettings,
    ) -> Self {
        Self {
            source,
            generator,
            gate: PublishGate::new(settings.days_threshold),
            assembler: DocumentAssembler::new(settings.clone()),
            artifacts,
            tags,
            analytics: Arc::new(NoAnalytics),
            checkout_root: None,
            max_repositories: settings.max_repositories,
        }
    }

    /// Read history from `<checkout_root>/<repo name>` and render it with `renderer`.
    pub fn with_analytics(
        mut self,
        renderer: Arc<dyn AnalyticsRenderer>,
        checkout_root: Option<PathBuf>,
    ) -> Self {
        self.analytics = renderer;
        self.checkout_root = checkout_root;
        self
    }

    /// Run one batch as of `now`.
    #[instrument(skip_all, fields(now = %now))]
    pub async fn run(
        &self,
        now: DateTime<Utc>,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        let start = Instant::now();
        let mut report = BatchReport::default();

        progress.phase("Listing repositories");
        let mut repos = self.source.list_repositories().await?;
        repos.truncate(self.max_repositories);
        let total = repos.len();
        info!(total, "starting batch");

        for (i, repo) in repos.iter().enumerate() {
            progress.repository(&repo.name, i + 1, total);

            match self.gate.evaluate(repo, self.artifacts.as_ref(), now) {
                Ok(PublishState::Skip(reason)) => {
                    info!(repo = %repo.name, %reason, "skipping");
                    report.skipped.push((repo.name.clone(), reason));
                }
                Ok(PublishState::Proceed) => match self.process_repository(repo, now).await {
                    Ok(path) => report.processed.push((repo.name.clone(), path)),
                    Err(e) => {
                        warn!(repo = %repo.name, error = %e, "repository failed");
                        report.failed.push((repo.name.clone(), e.to_string()));
                    }
                },
                Err(e) => {
                    warn!(repo = %repo.name, error = %e, "publish check failed");
                    report.failed.push((repo.name.clone(), e.to_string()));
                }
            }
        }

        report.elapsed = start.elapsed();
        info!(
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch complete"
        );
        progress.done(&report);
        Ok(report)
    }

    /// Generate and persist the article for one accepted repository.
    #[instrument(skip_all, fields(repo = %repo.name))]
    pub async fn process_repository(
        &self,
        repo: &RepositoryRecord,
        now: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let readme = self.source.fetch_readme(repo).await;
        let repo = repo.with_readme(readme);

        let title = self.generator.generate_title(&repo).await;
        let sections = self.generator.generate_sections(&repo).await;
        let terms = extract_terms(self.generator.client(), &repo).await;

        if !terms.tags.is_empty() {
            if let Err(e) = self.tags.merge(&terms.tags).await {
                warn!(error = %e, "tag update failed, continuing with repository tags");
            }
        }

        let commits = self.commit_history(&repo).await;
        let analytics = match self.analytics.render(&repo.name, &commits) {
            Ok(refs) => refs,
            Err(e) => {
                warn!(error = %e, "analytics unavailable");
                AnalyticsRefs::default()
            }
        };

        let document = self.assembler.assemble(AssemblyInput {
            repo: &repo,
            title,
            sections: &sections,
            keywords: &terms.keywords,
            tags: &terms.tags,
            analytics,
            now,
        });
        let markdown = document.render()?;

        let path = self.artifacts.write(&canonical_key(&repo.name), &markdown)?;
        info!(path = %path.display(), "article written");
        Ok(path)
    }

    async fn commit_history(&self, repo: &RepositoryRecord) -> Vec<CommitRecord> {
        let Some(root) = &self.checkout_root else {
            return Vec::new();
        };
        let checkout = checkout_path(root, &repo.name);
        match read_commit_history(&checkout).await {
            Ok(commits) => commits,
            Err(e) => {
                warn!(error = %e, "commit history unavailable, treating as empty");
                Vec::new()
            }
        }
    }
}

fn checkout_path(root: &Path, repo_name: &str) -> PathBuf {
    root.join(canonical_key(repo_name))
}
