//! Persistent tag taxonomy.

use std::path::{Path, PathBuf};
use std::time::Duration;

use devlog_shared::{DevlogError, Result, TagSet};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::lock::FileLock;
use crate::write_atomic;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(120);

/// On-disk shape of the tag file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFile {
    pub tags: Vec<String>,
}

/// Sole writer of the tag file.
///
/// Merges are serialized in-process by an async mutex and across processes
/// by a `<file>.lock` sibling. The set only ever grows.
#[derive(Debug)]
pub struct TagStore {
    path: PathBuf,
    guard: Mutex<()>,
    lock_timeout: Duration,
    stale_after: Duration,
}

impl TagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    /// Override lock acquisition timeout and stale threshold.
    pub fn with_lock_timing(mut self, timeout: Duration, stale_after: Duration) -> Self {
        self.lock_timeout = timeout;
        self.stale_after = stale_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted set. A missing file is an empty set.
    pub async fn load(&self) -> Result<TagSet> {
        let _guard = self.guard.lock().await;
        Ok(read_tag_file(&self.path)?
            .map(|file| file.tags.into_iter().collect())
            .unwrap_or_default())
    }

    /// Union `new_tags` into the persisted set and return the merged result.
    #[instrument(skip_all, fields(path = %self.path.display(), new = new_tags.len()))]
    pub async fn merge(&self, new_tags: &TagSet) -> Result<TagSet> {
        let _guard = self.guard.lock().await;
        let _lock =
            FileLock::acquire(&self.lock_path(), self.lock_timeout, self.stale_after).await?;

        let existing = read_tag_file(&self.path)?;
        let mut merged: TagSet = existing
            .as_ref()
            .map(|file| file.tags.iter().cloned().collect())
            .unwrap_or_default();
        let before = merged.len();
        merged.extend(new_tags.iter().cloned());

        let file = TagFile {
            tags: merged.iter().cloned().collect(),
        };
        if existing.as_ref() == Some(&file) {
            debug!("tag file already canonical, leaving it untouched");
            return Ok(merged);
        }

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| DevlogError::persistence(format!("failed to encode tags: {e}")))?;
        write_atomic(&self.path, json.as_bytes())
            .map_err(|e| DevlogError::persistence(format!("failed to write tag file: {e}")))?;

        info!(added = merged.len() - before, total = merged.len(), "tags merged");
        Ok(merged)
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tags".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

/// Raw file contents, `None` when the file does not exist yet.
fn read_tag_file(path: &Path) -> Result<Option<TagFile>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DevlogError::persistence(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    let file: TagFile = serde_json::from_str(&content).map_err(|e| {
        DevlogError::persistence(format!("{} is not a valid tag file: {e}", path.display()))
    })?;
    Ok(Some(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (PathBuf, TagStore) {
        let dir = std::env::temp_dir().join(format!("devlog-tags-{}", uuid::Uuid::now_v7()));
        let store = TagStore::new(dir.join("data").join("tags.json"))
            .with_lock_timing(Duration::from_millis(500), Duration::from_secs(60));
        (dir, store)
    }

    fn set(tags: &[&str]) -> TagSet {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let (dir, store) = temp_store();
        assert!(store.load().await.unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn merge_is_monotone_and_idempotent() {
        let (dir, store) = temp_store();

        let first = store.merge(&set(&["rust", "cli"])).await.unwrap();
        assert_eq!(first, set(&["cli", "rust"]));

        let second = store.merge(&set(&["rust", "web-dev"])).await.unwrap();
        assert!(second.is_superset(&first));
        assert_eq!(second, set(&["cli", "rust", "web-dev"]));

        let again = store.merge(&set(&["rust", "web-dev"])).await.unwrap();
        assert_eq!(again, second);
        assert_eq!(store.load().await.unwrap(), second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn file_is_sorted_pretty_json() {
        let (dir, store) = temp_store();
        store.merge(&set(&["zeta", "alpha"])).await.unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        let file: TagFile = serde_json::from_str(&content).unwrap();
        assert_eq!(file.tags, vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(content.contains('\n'));
        assert!(!store.lock_path().exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported_and_left_untouched() {
        let (dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.merge(&set(&["rust"])).await.unwrap_err();
        assert!(matches!(err, DevlogError::Persistence { .. }));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ not json");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn existing_tags_are_preserved() {
        let (dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{ "tags": ["legacy", "rust"] }"#).unwrap();

        let merged = store.merge(&set(&["async"])).await.unwrap();
        assert_eq!(merged, set(&["async", "legacy", "rust"]));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn duplicate_entries_are_rewritten_even_without_new_tags() {
        let (dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"tags":["rust","rust","cli"]}"#).unwrap();

        let merged = store.merge(&set(&["rust"])).await.unwrap();
        assert_eq!(merged, set(&["cli", "rust"]));

        let content = std::fs::read_to_string(store.path()).unwrap();
        let file: TagFile = serde_json::from_str(&content).unwrap();
        assert_eq!(file.tags, vec!["cli".to_string(), "rust".to_string()]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn canonical_file_is_not_rewritten() {
        let (dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        let compact = r#"{"tags":["cli","rust"]}"#;
        std::fs::write(store.path(), compact).unwrap();

        store.merge(&set(&["rust"])).await.unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), compact);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn concurrent_merges_lose_nothing() {
        let (dir, store) = temp_store();
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.merge(&set(&[&format!("tag-{i}")])).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap().len(), 8);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
