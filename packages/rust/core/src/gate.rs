//! Decides whether a repository gets a new article this run.

use chrono::{DateTime, Utc};
use devlog_shared::{RepositoryRecord, Result};
use devlog_storage::{ArtifactIndex, canonical_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// An artifact with this key was already published.
    AlreadyExists,
    /// Last push is older than the freshness window.
    Stale,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyExists => f.write_str("already published"),
            Self::Stale => f.write_str("not recently updated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Skip(SkipReason),
    Proceed,
}

/// Idempotence and freshness filter.
#[derive(Debug, Clone, Copy)]
pub struct PublishGate {
    days_threshold: i64,
}

impl PublishGate {
    pub fn new(days_threshold: i64) -> Self {
        Self { days_threshold }
    }

    /// Existence is checked first; only then is the push date compared.
    /// Elapsed time is floored to whole days and the threshold is inclusive.
    pub fn evaluate<I>(
        &self,
        repo: &RepositoryRecord,
        index: &I,
        now: DateTime<Utc>,
    ) -> Result<PublishState>
    where
        I: ArtifactIndex + ?Sized,
    {
        if index.exists(&canonical_key(&repo.name))? {
            return Ok(PublishState::Skip(SkipReason::AlreadyExists));
        }
        if self.is_stale(repo.pushed_at, now) {
            return Ok(PublishState::Skip(SkipReason::Stale));
        }
        Ok(PublishState::Proceed)
    }

    pub fn is_stale(&self, pushed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - pushed_at).num_days() > self.days_threshold
    }
}
