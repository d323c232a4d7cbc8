//! End-to-end execution of a single formula

use crate::environment::{prepare_environment, Environment};
use crate::fetch::{FetchOptions, Fetcher};
use crate::fileops::reset_directory;
use crate::steps::{StepOutput, StepRunner};
use kiln_config::Config;
use kiln_errors::{Error, FormulaError};
use kiln_formula::Formula;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a successful formula run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub name: String,
    /// Where the source was fetched and the steps ran
    pub work_dir: PathBuf,
    pub steps_run: usize,
    /// Whether `work_dir` still exists
    pub work_dir_kept: bool,
}

/// Fetches, configures and builds one formula at a time
#[derive(Debug, Clone)]
pub struct FormulaExecutor {
    work_root: PathBuf,
    keep_work_dir: bool,
    fetcher: Fetcher,
    runner: StepRunner,
    base_env: Environment,
}

impl FormulaExecutor {
    /// Executor configured from `config`, inheriting the process environment
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            work_root: config.build.work_root.clone(),
            keep_work_dir: config.build.keep_work_dir,
            fetcher: Fetcher::new(FetchOptions::from_config(config)),
            runner: StepRunner::new(config.build.shell.clone()),
            base_env: Environment::inherited(),
        }
    }

    /// Replace the environment the steps inherit from
    #[must_use]
    pub fn with_base_environment(mut self, base_env: Environment) -> Self {
        self.base_env = base_env;
        self
    }

    /// Choose where step stdout goes
    #[must_use]
    pub fn with_step_output(mut self, output: StepOutput) -> Self {
        self.runner = self.runner.with_output(output);
        self
    }

    #[must_use]
    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    #[must_use]
    pub fn with_keep_work_dir(mut self, keep: bool) -> Self {
        self.keep_work_dir = keep;
        self
    }

    /// Working directory used for `formula`
    #[must_use]
    pub fn work_dir_for(&self, formula: &Formula) -> PathBuf {
        self.work_root.join(&formula.name)
    }

    /// Environment the steps of `formula` would run with
    #[must_use]
    pub fn environment_for(&self, formula: &Formula, install_prefix: &Path) -> Environment {
        prepare_environment(&self.base_env, formula, install_prefix)
    }

    /// Run `formula`, installing into `install_prefix`
    ///
    /// The working directory is recreated empty, the source is fetched into
    /// it, and the steps run there in order. After success the working
    /// directory is removed unless configured otherwise; after a failure it
    /// is left in place for inspection.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any side effect, a fetch error
    /// before any step runs, or the first step failure.
    pub async fn execute(
        &self,
        formula: &Formula,
        install_prefix: &Path,
    ) -> Result<ExecutionReport, Error> {
        formula.validate()?;
        if !install_prefix.is_absolute() {
            return Err(FormulaError::RelativePrefix {
                path: install_prefix.display().to_string(),
            }
            .into());
        }

        let work_dir = self.work_dir_for(formula);
        reset_directory(&work_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &work_dir))?;

        info!(formula = %formula.name, work_dir = %work_dir.display(), "starting formula");

        self.fetcher.fetch(&formula.source, &work_dir).await.inspect_err(|e| {
            warn!(formula = %formula.name, work_dir = %work_dir.display(), error = %e, "fetch failed");
        })?;

        let env = self.environment_for(formula, install_prefix);
        let steps_run = self
            .runner
            .run(&formula.steps, &env, &work_dir)
            .await
            .inspect_err(|_| {
                warn!(
                    formula = %formula.name,
                    work_dir = %work_dir.display(),
                    "build failed; working directory kept"
                );
            })?;

        let work_dir_kept = self.keep_work_dir;
        if !work_dir_kept {
            if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
                warn!(work_dir = %work_dir.display(), error = %e, "failed to remove working directory");
            }
        }

        info!(formula = %formula.name, steps = steps_run, "formula complete");
        Ok(ExecutionReport {
            name: formula.name.clone(),
            work_dir,
            steps_run,
            work_dir_kept,
        })
    }
}
