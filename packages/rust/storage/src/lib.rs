//! File-backed persistence for devlog.
//!
//! - [`TagStore`]: the shared tag taxonomy (`{ "tags": [...] }`), merged under
//!   an in-process mutex plus a cross-process [`FileLock`].
//! - [`ArtifactStore`]: one Markdown artifact per canonical key, written atomically.
//!
//! Every write goes to a temp file in the target directory and is renamed over
//! the destination, so readers never observe a partial file.

mod artifacts;
mod lock;
mod tags;

use std::path::Path;

use devlog_shared::{DevlogError, Result};

pub use artifacts::{
    ArtifactIndex, ArtifactStore, FsArtifactStore, MemoryArtifactStore, canonical_key,
};
pub use lock::FileLock;
pub use tags::{TagFile, TagStore};

/// Write `content` to `target` via a sibling temp file and a rename.
pub(crate) fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| DevlogError::io(dir, e))?;

    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DevlogError::validation(format!("invalid target path {target:?}")))?;
    let temp = dir.join(format!(".{filename}.{}.tmp", uuid::Uuid::now_v7()));

    std::fs::write(&temp, content).map_err(|e| DevlogError::io(&temp, e))?;

    if let Err(e) = std::fs::rename(&temp, target) {
        let _ = std::fs::remove_file(&temp);
        return Err(DevlogError::io(target, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parent_and_leaves_no_temp() {
        let dir = std::env::temp_dir().join(format!("devlog-atomic-{}", uuid::Uuid::now_v7()));
        let target = dir.join("nested").join("out.md");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(dir.join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
