//! Core domain types for devlog articles.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Set of canonical tags (`[a-z0-9-]+`). Ordered so persisted output is stable.
pub type TagSet = BTreeSet<String>;

// ---------------------------------------------------------------------------
// RepositoryRecord
// ---------------------------------------------------------------------------

/// A repository as seen by the generation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Repository name (also the article's canonical key).
    pub name: String,
    /// Short description; falls back to a fixed sentence when absent upstream.
    pub description: String,
    /// README text; empty until fetched for an accepted repository.
    #[serde(default)]
    pub readme_text: String,
    /// Last push time.
    pub pushed_at: DateTime<Utc>,
    /// Browser URL.
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
}

impl RepositoryRecord {
    /// Description used when the host returns none.
    pub const NO_DESCRIPTION: &'static str = "No description provided.";

    /// Return a copy carrying `readme`, falling back to the description when it is blank.
    pub fn with_readme(&self, readme: String) -> Self {
        let readme_text = if readme.trim().is_empty() {
            self.description.clone()
        } else {
            readme
        };
        Self {
            readme_text,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// CommitRecord
// ---------------------------------------------------------------------------

/// One commit from a repository's history, oldest first when listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full 40-character hash.
    pub hash: String,
    pub author: String,
    /// Author date with its original offset.
    pub date: DateTime<FixedOffset>,
    /// Subject line.
    pub message: String,
}
