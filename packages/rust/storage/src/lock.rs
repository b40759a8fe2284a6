//! Advisory lock file guarding cross-process read-modify-write.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use devlog_shared::{DevlogError, Result};
use tracing::{debug, warn};

/// Delay between acquisition attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An exclusively created lock file holding a per-holder token.
///
/// Dropping the lock removes the file only while it still carries that token,
/// so a lock broken as stale and re-taken elsewhere is left alone.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    token: String,
}

impl FileLock {
    /// Create `path` with create-new semantics, polling until `timeout`.
    ///
    /// A lock file older than `stale_after` is assumed abandoned by a crashed
    /// process and removed.
    pub async fn acquire(path: &Path, timeout: Duration, stale_after: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DevlogError::io(parent, e))?;
        }

        let token = format!("{}:{}", std::process::id(), uuid::Uuid::now_v7());
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    if let Err(e) = file.write_all(token.as_bytes()) {
                        let _ = std::fs::remove_file(path);
                        return Err(DevlogError::io(path, e));
                    }
                    debug!(path = %path.display(), "lock acquired");
                    return Ok(Self {
                        path: path.to_path_buf(),
                        token,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(observed) = stale_token(path, stale_after) {
                        warn!(path = %path.display(), "breaking stale lock");
                        break_stale(path, &observed)?;
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(DevlogError::persistence(format!(
                            "timed out after {timeout:?} waiting for lock {}",
                            path.display()
                        )));
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(DevlogError::io(path, e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if read_token(&self.path).as_deref() == Some(self.token.as_str()) {
            let _ = std::fs::remove_file(&self.path);
        } else {
            warn!(path = %self.path.display(), "lock was taken over, not removing");
        }
    }
}

fn read_token(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

/// Token of the lock at `path` if it is older than `stale_after`.
fn stale_token(path: &Path, stale_after: Duration) -> Option<String> {
    let age = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())?;
    if age > stale_after { read_token(path) } else { None }
}

/// Remove the lock at `path` only if it still holds `observed`.
///
/// The file is first renamed aside, which only one waiter can do. If what was
/// moved turns out to be a newer lock, it is linked back unless `path` has been
/// re-created in the meantime.
fn break_stale(path: &Path, observed: &str) -> Result<()> {
    let mut aside = path.as_os_str().to_os_string();
    aside.push(format!(".{}.stale", uuid::Uuid::now_v7()));
    let aside = PathBuf::from(aside);

    match std::fs::rename(path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(DevlogError::io(path, e)),
    }

    if read_token(&aside).as_deref() != Some(observed) {
        match std::fs::hard_link(&aside, path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                let _ = std::fs::remove_file(&aside);
                return Err(DevlogError::io(path, e));
            }
        }
    }
    let _ = std::fs::remove_file(&aside);
    Ok(())
}
