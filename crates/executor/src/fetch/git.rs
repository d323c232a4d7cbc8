//! Version-control sources

use super::{io_error, FetchOptions};
use kiln_errors::FetchError;
use std::path::Path;
use std::process::Stdio;
use tracing::debug;

/// Shallow clone of `uri` into `dest`
///
/// Uses the git command line rather than a library so that the user's git
/// configuration and credential helpers apply.
pub(super) async fn clone(
    options: &FetchOptions,
    uri: &str,
    reference: Option<&str>,
    dest: &Path,
) -> Result<(), FetchError> {
    let mut cmd = tokio::process::Command::new(&options.git);
    cmd.args(["clone", "--depth", "1"]);
    if let Some(reference) = reference {
        cmd.args(["--branch", reference]);
    }
    cmd.arg(uri)
        .arg(dest)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .kill_on_drop(true);

    debug!(git = %options.git, uri, reference = ?reference, "running git clone");

    let output = tokio::time::timeout(options.timeout, cmd.output())
        .await
        .map_err(|_| FetchError::Timeout {
            uri: uri.to_string(),
            seconds: options.timeout.as_secs(),
        })?
        .map_err(|e| io_error(Path::new(&options.git), &e))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if is_auth_failure(&stderr) {
        return Err(FetchError::AuthenticationFailed {
            uri: uri.to_string(),
        });
    }
    Err(FetchError::Unreachable {
        uri: uri.to_string(),
        message: stderr.trim().to_string(),
    })
}

fn is_auth_failure(stderr: &str) -> bool {
    const MARKERS: [&str; 4] = [
        "Authentication failed",
        "could not read Username",
        "Permission denied (publickey",
        "terminal prompts disabled",
    ];
    MARKERS.iter().any(|m| stderr.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_auth_failure_detection() {
        assert!(is_auth_failure(
            "fatal: Authentication failed for 'https://example.com/x.git/'"
        ));
        assert!(is_auth_failure(
            "fatal: could not read Username for 'https://github.com': terminal prompts disabled"
        ));
        assert!(!is_auth_failure(
            "fatal: repository 'https://example.com/x.git/' not found"
        ));
    }

    #[tokio::test]
    async fn test_missing_git_binary_is_reported() {
        let temp = tempdir().unwrap();
        let options = FetchOptions {
            git: temp.path().join("no-such-git").display().to_string(),
            timeout: Duration::from_secs(5),
            user_agent: "kiln-test".to_string(),
        };
        let err = clone(&options, "git://example/x.git", None, &temp.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }
}
