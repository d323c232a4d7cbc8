//! Archive sources: download, verify, extract

use super::{io_error, local_path, FetchOptions};
use crate::fileops::promote_contents;
use futures::StreamExt;
use kiln_errors::FetchError;
use kiln_formula::SourceLocation;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl ArchiveKind {
    fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".tbz") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Identify by magic number, for URLs without a useful file name
    fn from_magic(magic: &[u8]) -> Option<Self> {
        match magic {
            [0x1f, 0x8b, ..] => Some(Self::TarGz),
            [0x50, 0x4b, ..] => Some(Self::Zip),
            [0x42, 0x5a, 0x68, ..] => Some(Self::TarBz2),
            [0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00, ..] => Some(Self::TarXz),
            _ if magic.len() >= 262 && &magic[257..262] == b"ustar" => Some(Self::Tar),
            _ => None,
        }
    }
}

pub(super) async fn fetch(
    options: &FetchOptions,
    source: &SourceLocation,
    dest: &Path,
) -> Result<(), FetchError> {
    let uri = source.uri.as_str();
    let parent = dest.parent().unwrap_or(dest);
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| io_error(parent, &e))?;

    let scratch = tempfile::Builder::new()
        .prefix(".kiln-fetch")
        .tempdir_in(parent)
        .map_err(|e| io_error(parent, &e))?;

    let file_name = archive_file_name(uri);
    let archive_path = if is_remote(uri) {
        let path = scratch.path().join(&file_name);
        download(options, uri, &path).await?;
        path
    } else {
        let path = local_path(uri).to_path_buf();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(FetchError::Unreachable {
                uri: uri.to_string(),
                message: "no such file".to_string(),
            });
        }
        path
    };

    if let Some(expected) = &source.sha256 {
        let actual = sha256_file(&archive_path)
            .await
            .map_err(|e| io_error(&archive_path, &e))?;
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(FetchError::ChecksumMismatch {
                uri: uri.to_string(),
                expected: expected.clone(),
                actual,
            });
        }
        debug!(uri, sha256 = %actual, "checksum verified");
    }

    let kind = match ArchiveKind::from_name(&file_name) {
        Some(kind) => kind,
        None => sniff(&archive_path)
            .await
            .ok_or_else(|| FetchError::UnsupportedArchive {
                file: file_name.clone(),
            })?,
    };

    let staging = scratch.path().join("extract");
    extract(&archive_path, kind, &staging).await?;
    promote_contents(&staging, dest)
        .await
        .map_err(|e| io_error(dest, &e))?;

    info!(uri, dest = %dest.display(), "extracted archive");
    Ok(())
}

fn is_remote(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Last path segment of the URI, without query or fragment
fn archive_file_name(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "source".to_string(),
    }
}

async fn download(options: &FetchOptions, uri: &str, path: &Path) -> Result<(), FetchError> {
    let unreachable = |e: reqwest::Error| {
        if e.is_timeout() {
            FetchError::Timeout {
                uri: uri.to_string(),
                seconds: options.timeout.as_secs(),
            }
        } else {
            FetchError::Unreachable {
                uri: uri.to_string(),
                message: e.to_string(),
            }
        }
    };

    let client = reqwest::Client::builder()
        .timeout(options.timeout)
        .user_agent(&options.user_agent)
        .build()
        .map_err(unreachable)?;

    let response = client.get(uri).send().await.map_err(unreachable)?;
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(FetchError::AuthenticationFailed {
            uri: uri.to_string(),
        });
    }
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            uri: uri.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = File::create(path).await.map_err(|e| io_error(path, &e))?;
    let mut stream = response.bytes_stream();
    let mut total = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(unreachable)?;
        total += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| io_error(path, &e))?;
    }
    file.flush().await.map_err(|e| io_error(path, &e))?;

    debug!(uri, bytes = total, "download complete");
    Ok(())
}

async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

async fn sniff(path: &Path) -> Option<ArchiveKind> {
    let mut file = File::open(path).await.ok()?;
    let mut magic = vec![0u8; 512];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..]).await {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }
    ArchiveKind::from_magic(&magic[..filled])
}

async fn extract(archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<(), FetchError> {
    use async_compression::tokio::bufread::{BzDecoder, GzipDecoder, XzDecoder};

    let extraction_failed = |message: String| FetchError::ExtractionFailed { message };

    // Decompress to a plain tar next to the archive, then unpack it off the runtime
    let tar_path: PathBuf = match kind {
        ArchiveKind::Zip => return extract_zip(archive, dest).await,
        ArchiveKind::Tar => archive.to_path_buf(),
        ArchiveKind::TarGz | ArchiveKind::TarBz2 | ArchiveKind::TarXz => {
            let out = dest.with_extension("tar");
            let input = File::open(archive)
                .await
                .map_err(|e| extraction_failed(format!("failed to open archive: {e}")))?;
            let mut output = File::create(&out)
                .await
                .map_err(|e| extraction_failed(format!("failed to create temp file: {e}")))?;
            let reader = BufReader::new(input);

            let copied = match kind {
                ArchiveKind::TarGz => tokio::io::copy(&mut GzipDecoder::new(reader), &mut output).await,
                ArchiveKind::TarBz2 => tokio::io::copy(&mut BzDecoder::new(reader), &mut output).await,
                _ => tokio::io::copy(&mut XzDecoder::new(reader), &mut output).await,
            };
            copied.map_err(|e| extraction_failed(format!("failed to decompress archive: {e}")))?;
            output
                .flush()
                .await
                .map_err(|e| extraction_failed(format!("failed to flush temp file: {e}")))?;
            out
        }
    };

    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&tar_path)
            .map_err(|e| format!("failed to open tar: {e}"))?;
        std::fs::create_dir_all(&dest).map_err(|e| format!("failed to create {}: {e}", dest.display()))?;
        tar::Archive::new(file)
            .unpack(&dest)
            .map_err(|e| format!("failed to unpack tar: {e}"))
    })
    .await
    .map_err(|e| extraction_failed(format!("task join error: {e}")))?
    .map_err(extraction_failed)
}

async fn extract_zip(archive: &Path, dest: &Path) -> Result<(), FetchError> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&archive)
            .map_err(|e| format!("failed to open zip archive: {e}"))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| format!("failed to read zip archive: {e}"))?;
        zip.extract(&dest)
            .map_err(|e| format!("failed to extract zip archive: {e}"))
    })
    .await
    .map_err(|e| FetchError::ExtractionFailed {
        message: format!("task join error: {e}"),
    })?
    .map_err(|message| FetchError::ExtractionFailed { message })
}
