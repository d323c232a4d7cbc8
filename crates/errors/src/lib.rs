#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for kiln
//!
//! Errors are grouped by the phase that raises them: formula validation,
//! source fetching, step execution and host configuration. All of them are
//! `Clone` so they can be stored in reports and rendered more than once.

use std::borrow::Cow;

use thiserror::Error;

pub mod config;
pub mod fetch;
pub mod formula;
pub mod step;

pub use config::ConfigError;
pub use fetch::FetchError;
pub use formula::FormulaError;
pub use step::{ExitStatus, StepError};

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid formula: {0}")]
    Formula(#[from] FormulaError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Step(#[from] StepError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Phase of a formula run that produced this error
    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Formula(_) => "validation",
            Self::Fetch(_) => "fetch",
            Self::Step(_) => "build",
            Self::Config(_) => "configuration",
            Self::Internal(_) | Self::Io { .. } => "setup",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for kiln operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Io { message, path, .. } => match path {
                Some(path) => Cow::Owned(format!("{message} ({})", path.display())),
                None => Cow::Owned(message.clone()),
            },
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Formula(err) => err.user_hint(),
            Error::Fetch(err) => err.user_hint(),
            Error::Step(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Fetch(err) => err.is_retryable(),
            Error::Step(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Formula(err) => err.user_code(),
            Error::Fetch(err) => err.user_code(),
            Error::Step(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
