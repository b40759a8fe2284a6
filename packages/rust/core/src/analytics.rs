//! Commit history and development analytics references.
//!
//! History is read from a local checkout with `git log` using ASCII unit and
//! record separators, then parsed strictly: a single malformed record rejects
//! the whole log.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use devlog_shared::{CommitRecord, DevlogError, Result};
use tracing::{debug, info, instrument};

/// `git log` format: hash, author, ISO-8601 author date, subject.
pub const COMMIT_LOG_FORMAT: &str = "%H%x1f%an%x1f%aI%x1f%s%x1e";

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

// ---------------------------------------------------------------------------
// Commit log
// ---------------------------------------------------------------------------

/// Parse output produced with [`COMMIT_LOG_FORMAT`].
pub fn parse_commit_log(raw: &str) -> Result<Vec<CommitRecord>> {
    let mut commits = Vec::new();

    for (index, record) in raw.split(RECORD_SEP).enumerate() {
        let record = record.trim_start_matches(['\n', '\r']);
        if record.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.split(FIELD_SEP).collect();
        let [hash, author, date, message] = fields.as_slice() else {
            return Err(DevlogError::parse(format!(
                "commit record {index} has {} fields, expected 4",
                fields.len()
            )));
        };

        if hash.len() != 40 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DevlogError::parse(format!(
                "commit record {index} has invalid hash {hash:?}"
            )));
        }
        let date = DateTime::parse_from_rfc3339(date).map_err(|e| {
            DevlogError::parse(format!("commit record {index} has invalid date {date:?}: {e}"))
        })?;

        commits.push(CommitRecord {
            hash: hash.to_string(),
            author: author.to_string(),
            date,
            message: message.trim_end().to_string(),
        });
    }

    Ok(commits)
}

/// Run `git log --reverse` in `repo_path` and parse the result (oldest first).
#[instrument(skip_all, fields(path = %repo_path.display()))]
pub async fn read_commit_history(repo_path: &Path) -> Result<Vec<CommitRecord>> {
    if !repo_path.is_dir() {
        return Err(DevlogError::validation(format!(
            "no checkout at {}",
            repo_path.display()
        )));
    }

    let output = tokio::process::Command::new("git")
        .arg("-C")
        .arg(repo_path)
        .arg("log")
        .arg("--reverse")
        .arg(format!("--pretty=format:{COMMIT_LOG_FORMAT}"))
        .output()
        .await
        .map_err(|e| DevlogError::io(repo_path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DevlogError::validation(format!(
            "git log failed in {}: {}",
            repo_path.display(),
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|e| DevlogError::parse(format!("git log output is not UTF-8: {e}")))?;
    let commits = parse_commit_log(&stdout)?;
    debug!(commits = commits.len(), "commit history read");
    Ok(commits)
}

// ---------------------------------------------------------------------------
// Analytics rendering
// ---------------------------------------------------------------------------

/// Image references for the analytics block. Empty means "not available".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsRefs {
    pub timeline: String,
    pub heatmap: String,
    pub contributor_network: String,
    pub activity_pattern: String,
    pub code_frequency: String,
}

/// Turns commit history into image references for one repository.
pub trait AnalyticsRenderer: Send + Sync {
    fn render(&self, repo_name: &str, commits: &[CommitRecord]) -> Result<AnalyticsRefs>;
}

/// Renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnalytics;

impl AnalyticsRenderer for NoAnalytics {
    fn render(&self, _repo_name: &str, _commits: &[CommitRecord]) -> Result<AnalyticsRefs> {
        Ok(AnalyticsRefs::default())
    }
}

/// Exports `<repo>-commits.json` for an external charting tool and references
/// the chart images that tool has placed in the same folder.
#[derive(Debug, Clone)]
pub struct AssetDirectoryRenderer {
    save_folder: PathBuf,
    read_folder: String,
}

impl AssetDirectoryRenderer {
    pub fn new(save_folder: impl Into<PathBuf>, read_folder: impl Into<String>) -> Self {
        Self {
            save_folder: save_folder.into(),
            read_folder: read_folder.into(),
        }
    }

    fn reference(&self, repo_name: &str, chart: &str) -> String {
        let file = format!("{repo_name}-{chart}.png");
        if !self.save_folder.join(&file).is_file() {
            return String::new();
        }
        let prefix = self.read_folder.trim_end_matches('/');
        if prefix.is_empty() {
            file
        } else {
            format!("{prefix}/{file}")
        }
    }
}

impl AnalyticsRenderer for AssetDirectoryRenderer {
    fn render(&self, repo_name: &str, commits: &[CommitRecord]) -> Result<AnalyticsRefs> {
        if commits.is_empty() {
            debug!(repo = repo_name, "no commit history, skipping export");
        } else {
            std::fs::create_dir_all(&self.save_folder)
                .map_err(|e| DevlogError::io(&self.save_folder, e))?;

            let export = self.save_folder.join(format!("{repo_name}-commits.json"));
            let json = serde_json::to_string_pretty(commits).map_err(|e| {
                DevlogError::persistence(format!("failed to encode commits: {e}"))
            })?;
            std::fs::write(&export, json).map_err(|e| DevlogError::io(&export, e))?;
        }

        let refs = AnalyticsRefs {
            timeline: self.reference(repo_name, "timeline_chart"),
            heatmap: self.reference(repo_name, "commit_heatmap"),
            contributor_network: self.reference(repo_name, "contribution_network"),
            activity_pattern: self.reference(repo_name, "commit_activity"),
            code_frequency: self.reference(repo_name, "code_frequency"),
        };
        info!(repo = repo_name, commits = commits.len(), "commit history exported");
        Ok(refs)
    }
}
