//! Source acquisition
//!
//! Each fetch method places the source tree directly in the destination
//! directory, which becomes the working directory for the build steps.

mod archive;
mod git;
mod local;

use kiln_config::Config;
use kiln_errors::FetchError;
use kiln_formula::{FetchMethod, SourceLocation};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Settings that control how sources are fetched
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Git executable
    pub git: String,
    /// Limit for a single clone or download
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FetchOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            git: config.fetch.git.clone(),
            timeout: Duration::from_secs(config.fetch.timeout),
            user_agent: config.fetch.user_agent.clone(),
        }
    }
}

/// Fetches formula sources into a working directory
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    options: FetchOptions,
}

impl Fetcher {
    #[must_use]
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Retrieve `source` into `dest` using its declared method
    ///
    /// `dest` must be empty or absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the method is unsupported, the source cannot be
    /// reached or authenticated against, a checksum does not match, or the
    /// retrieved files cannot be placed in `dest`.
    pub async fn fetch(&self, source: &SourceLocation, dest: &Path) -> Result<(), FetchError> {
        info!(
            uri = %source.uri,
            method = %source.method,
            dest = %dest.display(),
            "fetching source"
        );

        match &source.method {
            FetchMethod::Git => {
                git::clone(&self.options, &source.uri, source.reference.as_deref(), dest).await
            }
            FetchMethod::Archive => archive::fetch(&self.options, source, dest).await,
            FetchMethod::Local => local::copy(&source.uri, dest).await,
            FetchMethod::Other(method) => Err(FetchError::UnsupportedMethod {
                method: method.clone(),
                uri: source.uri.clone(),
            }),
        }
    }
}

/// Strip a `file://` scheme, leaving plain paths alone
fn local_path(uri: &str) -> &Path {
    Path::new(uri.strip_prefix("file://").unwrap_or(uri))
}

fn io_error(path: &Path, err: &std::io::Error) -> FetchError {
    FetchError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_unsupported_method() {
        let temp = tempdir().unwrap();
        let source = SourceLocation::new("svn://example/x", "svn");
        let err = Fetcher::default()
            .fetch(&source, &temp.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::UnsupportedMethod { ref method, .. } if method == "svn"
        ));
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("file:///srv/src"), Path::new("/srv/src"));
        assert_eq!(local_path("/srv/src"), Path::new("/srv/src"));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.fetch.timeout = 12;
        config.fetch.git = "/opt/git/bin/git".to_string();
        let options = FetchOptions::from_config(&config);
        assert_eq!(options.timeout, Duration::from_secs(12));
        assert_eq!(options.git, "/opt/git/bin/git");
    }
}
