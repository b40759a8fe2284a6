//! Published article artifacts, addressed by canonical key.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use devlog_shared::{DevlogError, Result};
use tracing::debug;

use crate::write_atomic;

/// Derive the artifact key for a repository name: path separators become `-`.
pub fn canonical_key(repo_name: &str) -> String {
    repo_name.trim().replace(['/', '\\'], "-")
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(DevlogError::validation(format!("invalid artifact key {key:?}")));
    }
    Ok(())
}

/// Read side: has an artifact already been published under `key`?
pub trait ArtifactIndex {
    fn exists(&self, key: &str) -> Result<bool>;
}

/// Write side. A write either fully lands or leaves no artifact.
pub trait ArtifactStore: ArtifactIndex + Send + Sync {
    /// Persist `content` under `key`, returning where it was written.
    fn write(&self, key: &str, content: &str) -> Result<PathBuf>;
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

/// Stores each artifact as `<root>/<key>.md`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.md"))
    }
}

impl ArtifactIndex for FsArtifactStore {
    fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let path = self.path_for(key);
        path.try_exists().map_err(|e| DevlogError::io(&path, e))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, key: &str, content: &str) -> Result<PathBuf> {
        validate_key(key)?;
        let path = self.path_for(key);
        write_atomic(&path, content.as_bytes())?;
        debug!(path = %path.display(), size = content.len(), "artifact written");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Keeps artifacts in memory; used by dry runs and orchestration tests.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an artifact.
    pub fn insert(&self, key: &str, content: &str) {
        self.lock().insert(key.to_string(), content.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactIndex for MemoryArtifactStore {
    fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.lock().contains_key(key))
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn write(&self, key: &str, content: &str) -> Result<PathBuf> {
        validate_key(key)?;
        self.insert(key, content);
        Ok(PathBuf::from(format!("memory://{key}.md")))
    }
}
