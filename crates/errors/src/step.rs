//! Build step execution errors

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

/// How a failed step terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process exited with a non-zero code
    Code(i32),
    /// The process was killed by a signal
    Signal(i32),
    /// The platform reported neither a code nor a signal
    Unknown,
}

impl ExitStatus {
    /// Numeric exit code, when the process exited normally
    #[must_use]
    pub fn code(self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(code),
            _ => None,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signal(signal);
            }
        }
        Self::Unknown
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit status {code}"),
            Self::Signal(signal) => write!(f, "terminated by signal {signal}"),
            Self::Unknown => f.write_str("unknown exit status"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StepError {
    /// A step ran and reported failure; `index` is 1-based
    #[error("step {index} failed with {exit_status}: {command}")]
    Failed {
        index: usize,
        command: String,
        exit_status: ExitStatus,
    },

    #[error("step {index} could not be started: {command}: {message}")]
    Spawn {
        index: usize,
        command: String,
        message: String,
    },
}

impl StepError {
    /// 1-based index of the step that failed
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Failed { index, .. } | Self::Spawn { index, .. } => *index,
        }
    }

    /// Command text of the step that failed
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Failed { command, .. } | Self::Spawn { command, .. } => command,
        }
    }
}

impl UserFacingError for StepError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Failed { .. } => {
                Some("Inspect the kept working directory; rerunning starts from a clean checkout.")
            }
            Self::Spawn { .. } => Some("Check that the configured shell exists and is executable."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::Failed { .. } => Some("step.failed"),
            Self::Spawn { .. } => Some("step.spawn_failed"),
        }
    }
}
