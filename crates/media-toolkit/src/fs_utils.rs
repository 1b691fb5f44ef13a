//! Filesystem utilities for cross-device file operations and temp-directory
//! cleanup discipline (§4.2, §6 temp filesystem layout).

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// Attempts a fast rename first; on EXDEV falls back to copy-to-temp-then-
/// rename so the destination never observes a partially written file.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "cross-device rename detected, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await.map_err(|e| {
        tracing::error!(
            "failed to copy file during cross-device move: {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    fs::rename(&tmp_dst, dst).await.map_err(|e| {
        let _ = std::fs::remove_file(&tmp_dst);
        tracing::error!(
            "failed to rename temp file during cross-device move: {} -> {}: {}",
            tmp_dst.display(),
            dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!("failed to remove source file after cross-device move: {}: {}", src.display(), e);
    }

    Ok(())
}

/// Remove `path` only if it is a descendant of `temp_root` (§6). Refuses to
/// touch anything outside the worker's own scratch space.
pub async fn cleanup_under(temp_root: impl AsRef<Path>, path: impl AsRef<Path>) -> MediaResult<()> {
    let temp_root = temp_root.as_ref();
    let path = path.as_ref();

    let canonical_root = fs::canonicalize(temp_root).await.unwrap_or_else(|_| temp_root.to_path_buf());
    let canonical_path = fs::canonicalize(path).await.unwrap_or_else(|_| path.to_path_buf());

    if !canonical_path.starts_with(&canonical_root) {
        return Err(MediaError::SecurityViolation(format!(
            "refusing to clean up path outside temp root: {}",
            path.display()
        )));
    }

    if canonical_path.is_dir() {
        fs::remove_dir_all(&canonical_path).await?;
    } else if canonical_path.exists() {
        fs::remove_file(&canonical_path).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_file_same_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.txt");
        let dst = dir.path().join("dest.txt");

        fs::write(&src, b"test content").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert!(dst.exists());
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "test content");
    }

    #[tokio::test]
    async fn test_move_file_to_subdirectory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.txt");
        let dst = dir.path().join("subdir").join("dest.txt");

        fs::write(&src, b"test content").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert!(dst.exists());
    }

    #[tokio::test]
    async fn test_is_cross_device_error() {
        let exdev_error = std::io::Error::from_raw_os_error(18);
        assert!(is_cross_device_error(&exdev_error));

        let not_found = std::io::Error::from_raw_os_error(2);
        assert!(!is_cross_device_error(&not_found));
    }

    #[tokio::test]
    async fn test_cleanup_rejects_path_outside_root() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let victim = outside.path().join("keep-me.txt");
        fs::write(&victim, b"do not delete").await.unwrap();

        let result = cleanup_under(root.path(), &victim).await;
        assert!(result.is_err());
        assert!(victim.exists());
    }

    #[tokio::test]
    async fn test_cleanup_removes_path_under_root() {
        let root = TempDir::new().unwrap();
        let job_dir = root.path().join("job-1");
        fs::create_dir_all(&job_dir).await.unwrap();
        let file = job_dir.join("frame.jpg");
        fs::write(&file, b"jpeg").await.unwrap();

        cleanup_under(root.path(), &job_dir).await.unwrap();
        assert!(!job_dir.exists());
    }
}
