//! File system helpers for working directories

use std::io;
use std::path::Path;
use tokio::fs;

/// Recursively copy directory contents
///
/// An entry whose path equals `exclude` is skipped, which lets the
/// destination live inside the source. `exclude` must be spelled the way
/// entries under `src` are (both canonical).
pub fn copy_directory_recursive<'a>(
    src: &'a Path,
    dst: &'a Path,
    exclude: Option<&'a Path>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        fs::create_dir_all(dst).await?;

        let mut entries = fs::read_dir(src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            if exclude == Some(entry_path.as_path()) {
                continue;
            }
            let dst_path = dst.join(entry.file_name());
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                copy_directory_recursive(&entry_path, &dst_path, exclude).await?;
            } else if file_type.is_symlink() {
                copy_symlink(&entry_path, &dst_path).await?;
            } else {
                fs::copy(&entry_path, &dst_path).await?;
            }
        }

        Ok(())
    })
}

#[cfg(unix)]
async fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src).await?;
    fs::symlink(target, dst).await
}

#[cfg(not(unix))]
async fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).await.map(|_| ())
}

/// Remove `dir` if it exists and create it empty
pub async fn reset_directory(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(dir).await
}

/// Move the contents of `src` into `dst`
///
/// When `src` holds exactly one directory, that directory's contents are
/// moved instead, so `project-1.0/configure` lands at `dst/configure`.
/// Both paths must be on the same file system.
pub async fn promote_contents(src: &Path, dst: &Path) -> io::Result<()> {
    let mut names = Vec::new();
    let mut entries = fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        names.push((entry.path(), entry.file_type().await?));
    }

    let root = match names.as_slice() {
        [(only, file_type)] if file_type.is_dir() => only.clone(),
        _ => src.to_path_buf(),
    };

    fs::create_dir_all(dst).await?;
    let mut entries = fs::read_dir(&root).await?;
    while let Some(entry) = entries.next_entry().await? {
        fs::rename(entry.path(), dst.join(entry.file_name())).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_copy_directory_recursive() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("nested")).await.unwrap();
        fs::write(src.join("Makefile"), "all:\n").await.unwrap();
        fs::write(src.join("nested/file.c"), "int x;\n").await.unwrap();

        let dst = temp.path().join("dst");
        copy_directory_recursive(&src, &dst, None).await.unwrap();

        assert_eq!(fs::read_to_string(dst.join("Makefile")).await.unwrap(), "all:\n");
        assert!(dst.join("nested/file.c").exists());
    }

    #[tokio::test]
    async fn test_copy_skips_destination_nested_in_source() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = src.join("build/x");
        fs::create_dir_all(&dst).await.unwrap();
        fs::write(src.join("Makefile"), "all:\n").await.unwrap();
        fs::write(src.join("build/notes"), "").await.unwrap();

        copy_directory_recursive(&src, &dst, Some(&dst)).await.unwrap();

        assert!(dst.join("Makefile").exists());
        assert!(dst.join("build/notes").exists());
        assert!(!dst.join("build/x").exists());
    }

    #[tokio::test]
    async fn test_reset_directory_clears_contents() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("work");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("stale.o"), "").await.unwrap();

        reset_directory(&dir).await.unwrap();
        assert!(dir.exists());
        assert!(!dir.join("stale.o").exists());

        let fresh = temp.path().join("fresh");
        reset_directory(&fresh).await.unwrap();
        assert!(fresh.is_dir());
    }

    #[tokio::test]
    async fn test_promote_strips_single_top_level_directory() {
        let temp = tempdir().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(staging.join("hello-1.0/src")).await.unwrap();
        fs::write(staging.join("hello-1.0/configure"), "").await.unwrap();

        let dst = temp.path().join("dst");
        promote_contents(&staging, &dst).await.unwrap();
        assert!(dst.join("configure").exists());
        assert!(dst.join("src").is_dir());
    }

    #[tokio::test]
    async fn test_promote_keeps_flat_layout() {
        let temp = tempdir().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(staging.join("lib")).await.unwrap();
        fs::write(staging.join("Makefile"), "").await.unwrap();

        let dst = temp.path().join("dst");
        promote_contents(&staging, &dst).await.unwrap();
        assert!(dst.join("Makefile").exists());
        assert!(dst.join("lib").is_dir());
    }
}
