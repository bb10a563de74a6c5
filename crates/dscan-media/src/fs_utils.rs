//! Filesystem helpers for scoped temporary files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempPath;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Poll until `path` exists, at most `attempts` times with `delay` between tries.
///
/// Multipart spooling can finish before the file is observable on some
/// network filesystems, so the first failed check is not treated as final.
pub async fn wait_until_visible(path: &Path, attempts: u32, delay: Duration) -> MediaResult<()> {
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        if fs::try_exists(path).await.unwrap_or(false) {
            if attempt > 1 {
                tracing::debug!(
                    path = %path.display(),
                    attempt,
                    "File became visible after polling"
                );
            }
            return Ok(());
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(MediaError::FileNotVisible {
        path: path.to_path_buf(),
        attempts,
    })
}

/// Create `dir` (and parents) if it does not exist yet.
pub async fn ensure_dir(dir: &Path) -> MediaResult<PathBuf> {
    fs::create_dir_all(dir).await?;
    Ok(dir.to_path_buf())
}

/// Delete a temp file now, logging instead of failing.
///
/// Cleanup errors must never mask the outcome of the stage that owned the file.
pub fn close_temp_path(path: TempPath, what: &str) {
    let location = path.to_path_buf();
    if let Err(e) = path.close() {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                path = %location.display(),
                "Failed to remove {}: {}",
                what,
                e
            );
        }
    }
}

/// Create an empty, uniquely named temp file in `dir` with `extension`.
pub fn new_temp_path(dir: &Path, extension: &str) -> MediaResult<TempPath> {
    let file = tempfile::Builder::new()
        .prefix("dscan-")
        .suffix(&format!(".{}", extension))
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_visible_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload.bin");
        fs::write(&path, b"data").await.unwrap();

        assert_ok!(wait_until_visible(&path, 5, Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn test_visible_after_delay() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.bin");

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            fs::write(&writer_path, b"data").await.unwrap();
        });

        assert_ok!(wait_until_visible(&path, 20, Duration::from_millis(10)).await);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_never_visible() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.bin");

        let err = assert_err!(wait_until_visible(&path, 3, Duration::from_millis(1)).await);
        assert!(matches!(err, MediaError::FileNotVisible { attempts: 3, .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_temp_path_removed_on_close() {
        let dir = TempDir::new().unwrap();
        let path = new_temp_path(dir.path(), "mp4").unwrap();
        let location = path.to_path_buf();
        assert!(location.exists());
        assert_eq!(location.extension().unwrap(), "mp4");

        close_temp_path(path, "artifact");
        assert!(!location.exists());
    }

    #[test]
    fn test_close_already_removed_is_quiet() {
        let dir = TempDir::new().unwrap();
        let path = new_temp_path(dir.path(), "jpg").unwrap();
        std::fs::remove_file(&path).unwrap();
        close_temp_path(path, "artifact");
    }

    #[test]
    fn test_close_failure_is_logged_not_raised() {
        let dir = TempDir::new().unwrap();
        let path = new_temp_path(dir.path(), "jpg").unwrap();
        let location = path.to_path_buf();
        std::fs::remove_file(&location).unwrap();
        std::fs::create_dir(&location).unwrap();

        // A directory cannot be removed as a file; the error is logged only
        close_temp_path(path, "artifact");
        assert!(location.is_dir());
    }
}
