//! Sequential, fail-fast step execution

use crate::environment::Environment;
use kiln_config::constants::DEFAULT_SHELL;
use kiln_errors::{ExitStatus, StepError};
use std::path::Path;
use std::process::Stdio;
use tracing::{error, info};

/// Destination of a step's standard output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepOutput {
    /// Shared with the host's stdout
    #[default]
    Inherit,
    /// Redirected to the host's stderr, keeping stdout for structured output
    Stderr,
}

impl StepOutput {
    fn stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Stderr => Stdio::from(std::io::stderr()),
        }
    }
}

/// Runs build steps through a shell
#[derive(Debug, Clone)]
pub struct StepRunner {
    shell: String,
    output: StepOutput,
}

impl Default for StepRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl StepRunner {
    #[must_use]
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            output: StepOutput::default(),
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: StepOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn output(&self) -> StepOutput {
        self.output
    }

    #[must_use]
    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Run `steps` in order inside `work_dir` with exactly `env`
    ///
    /// Each step is expanded against `env` and handed to `<shell> -c`. The
    /// next step starts only after the previous one exited successfully.
    /// Returns the number of steps run.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Failed`] for the first step that exits
    /// unsuccessfully and [`StepError::Spawn`] if a step cannot be started.
    /// No later step runs in either case.
    pub async fn run(
        &self,
        steps: &[String],
        env: &Environment,
        work_dir: &Path,
    ) -> Result<usize, StepError> {
        for (offset, command) in steps.iter().enumerate() {
            let index = offset + 1;
            let expanded = env.expand(command);
            info!(step = index, total = steps.len(), command = %expanded, "running step");

            let status = tokio::process::Command::new(&self.shell)
                .arg("-c")
                .arg(&expanded)
                .env_clear()
                .envs(env.iter())
                .current_dir(work_dir)
                .stdin(Stdio::null())
                .stdout(self.output.stdio())
                .kill_on_drop(true)
                .status()
                .await
                .map_err(|e| StepError::Spawn {
                    index,
                    command: command.clone(),
                    message: e.to_string(),
                })?;

            if !status.success() {
                let exit_status = ExitStatus::from(status);
                error!(step = index, command = %expanded, %exit_status, "step failed");
                return Err(StepError::Failed {
                    index,
                    command: command.clone(),
                    exit_status,
                });
            }
        }

        Ok(steps.len())
    }
}

/// Run `steps` with the default shell
///
/// # Errors
///
/// See [`StepRunner::run`].
pub async fn run_steps(
    steps: &[String],
    env: &Environment,
    work_dir: &Path,
) -> Result<usize, StepError> {
    StepRunner::default().run(steps, env, work_dir).await
}
