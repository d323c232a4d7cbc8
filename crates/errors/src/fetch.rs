//! Source acquisition errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("source unreachable: {uri}: {message}")]
    Unreachable { uri: String, message: String },

    #[error("authentication failed for {uri}")]
    AuthenticationFailed { uri: String },

    #[error("unsupported fetch method {method:?} for {uri}")]
    UnsupportedMethod { method: String, uri: String },

    #[error("HTTP error {status} fetching {uri}")]
    HttpStatus { uri: String, status: u16 },

    #[error("checksum mismatch for {uri}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        uri: String,
        expected: String,
        actual: String,
    },

    #[error("extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("unsupported archive format: {file}")]
    UnsupportedArchive { file: String },

    #[error("fetch timed out after {seconds} seconds: {uri}")]
    Timeout { uri: String, seconds: u64 },

    #[error("failed to prepare {path}: {message}")]
    Io { path: String, message: String },
}

impl UserFacingError for FetchError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Unreachable { .. } | Self::HttpStatus { .. } | Self::Timeout { .. } => {
                Some("Check network access and the source URI, then retry.")
            }
            Self::AuthenticationFailed { .. } => {
                Some("Configure credentials for the repository or use a public URI.")
            }
            Self::UnsupportedMethod { .. } => {
                Some("Use one of the supported fetch methods: git, archive, local.")
            }
            Self::ChecksumMismatch { .. } => {
                Some("Update the formula's sha256 if the upstream archive changed.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::HttpStatus { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Unreachable { .. } => "fetch.unreachable",
            Self::AuthenticationFailed { .. } => "fetch.authentication_failed",
            Self::UnsupportedMethod { .. } => "fetch.unsupported_method",
            Self::HttpStatus { .. } => "fetch.http_status",
            Self::ChecksumMismatch { .. } => "fetch.checksum_mismatch",
            Self::ExtractionFailed { .. } => "fetch.extraction_failed",
            Self::UnsupportedArchive { .. } => "fetch.unsupported_archive",
            Self::Timeout { .. } => "fetch.timeout",
            Self::Io { .. } => "fetch.io",
        };
        Some(code)
    }
}
