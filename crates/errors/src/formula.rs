//! Formula loading and validation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum FormulaError {
    #[error("failed to read formula {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("failed to parse formula: {message}")]
    ParseError { message: String },

    #[error("unsupported formula format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("formula name cannot be empty")]
    MissingName,

    #[error("invalid formula name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("source location cannot be empty")]
    MissingSource,

    #[error("build step {index} is empty")]
    EmptyStep { index: usize },

    #[error("invalid environment override {name:?}: {reason}")]
    InvalidOverride { name: String, reason: String },

    #[error("install prefix must be an absolute path: {path}")]
    RelativePrefix { path: String },

    #[error("sha256 is only verified for archive sources, not {method}")]
    ChecksumNotSupported { method: String },
}

impl UserFacingError for FormulaError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ReadFailed { .. } => Some("Check that the formula path exists and is readable."),
            Self::UnsupportedFormat { .. } => {
                Some("Formulas are read from .yml, .yaml or .toml files.")
            }
            Self::RelativePrefix { .. } => Some("Pass an absolute directory to --prefix."),
            Self::ChecksumNotSupported { .. } => {
                Some("Remove sha256 or pin the source with a git ref instead.")
            }
            _ => Some("Correct the formula definition before retrying."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ReadFailed { .. } => "formula.read_failed",
            Self::ParseError { .. } => "formula.parse_error",
            Self::UnsupportedFormat { .. } => "formula.unsupported_format",
            Self::MissingName => "formula.missing_name",
            Self::InvalidName { .. } => "formula.invalid_name",
            Self::MissingSource => "formula.missing_source",
            Self::EmptyStep { .. } => "formula.empty_step",
            Self::InvalidOverride { .. } => "formula.invalid_override",
            Self::RelativePrefix { .. } => "formula.relative_prefix",
            Self::ChecksumNotSupported { .. } => "formula.checksum_not_supported",
        };
        Some(code)
    }
}
