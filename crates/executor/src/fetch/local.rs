//! Local directory sources

use super::{io_error, local_path};
use crate::fileops::copy_directory_recursive;
use kiln_errors::FetchError;
use std::path::Path;
use tokio::fs;
use tracing::debug;

pub(super) async fn copy(uri: &str, dest: &Path) -> Result<(), FetchError> {
    let src = local_path(uri);

    let metadata = fs::metadata(src)
        .await
        .map_err(|e| FetchError::Unreachable {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;
    if !metadata.is_dir() {
        return Err(FetchError::Unreachable {
            uri: uri.to_string(),
            message: "not a directory".to_string(),
        });
    }

    fs::create_dir_all(dest)
        .await
        .map_err(|e| io_error(dest, &e))?;
    let src = fs::canonicalize(src)
        .await
        .map_err(|e| io_error(src, &e))?;
    let dest_real = fs::canonicalize(dest)
        .await
        .map_err(|e| io_error(dest, &e))?;
    if src.starts_with(&dest_real) {
        return Err(FetchError::Io {
            path: dest.display().to_string(),
            message: format!("working directory contains the source {}", src.display()),
        });
    }

    // A working directory under the source is skipped, not copied into itself
    copy_directory_recursive(&src, dest, Some(&dest_real))
        .await
        .map_err(|e| io_error(dest, &e))?;

    debug!(src = %src.display(), dest = %dest.display(), "copied local source");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_copy_local_tree() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("project");
        fs::create_dir_all(src.join("dist/bin")).await.unwrap();
        fs::write(src.join("dist/bin/tool"), "#!/bin/sh\n").await.unwrap();

        let dest = temp.path().join("work");
        copy(&format!("file://{}", src.display()), &dest).await.unwrap();
        assert!(dest.join("dist/bin/tool").exists());
    }

    #[tokio::test]
    async fn test_work_dir_inside_source() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("project");
        fs::create_dir_all(&src).await.unwrap();
        fs::write(src.join("configure"), "#!/bin/sh\n").await.unwrap();

        let dest = src.join("build").join("project");
        copy(&src.display().to_string(), &dest).await.unwrap();
        assert!(dest.join("configure").exists());
        assert!(dest.join("build").is_dir());
        assert!(!dest.join("build/project").exists());
    }

    #[tokio::test]
    async fn test_source_inside_work_dir_rejected() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("work/project");
        fs::create_dir_all(&src).await.unwrap();

        let err = copy(&src.display().to_string(), &temp.path().join("work"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn test_missing_directory_is_unreachable() {
        let temp = tempdir().unwrap();
        let err = copy(
            &temp.path().join("absent").display().to_string(),
            &temp.path().join("work"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_file_is_not_a_source_tree() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("README");
        fs::write(&file, "hi").await.unwrap();
        let err = copy(&file.display().to_string(), &temp.path().join("work"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unreachable { .. }));
    }
}
