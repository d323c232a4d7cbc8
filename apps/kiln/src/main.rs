//! kiln - fetch and build software from declarative formulas
//!
//! This is the host side of formula execution: it loads configuration,
//! supplies the install prefix and inherited environment, and maps the
//! outcome to an exit status.

mod cli;
mod display;
mod error;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::error::CliError;
use clap::Parser;
use kiln_config::Config;
use kiln_errors::FormulaError;
use kiln_executor::{FormulaExecutor, StepOutput};
use kiln_formula::load_formula;
use std::collections::BTreeSet;
use std::path::Path;
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    let config = match load_config(&cli.global).await {
        Ok(config) => config,
        Err(e) => {
            display::render_error(&e, json_mode);
            process::exit(1);
        }
    };

    logging::init_tracing(json_mode, cli.global.debug, &config.logging.log_dir);

    if let Err(e) = run(cli, config).await {
        error!("Application error: {}", e);
        display::render_error(&e, json_mode);
        process::exit(1);
    }
}

/// Load configuration: file (or defaults), then environment variables
async fn load_config(global: &GlobalArgs) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(global.config.as_deref()).await?;
    config.merge_env()?;
    Ok(config)
}

/// Main application logic
async fn run(cli: Cli, mut config: Config) -> Result<(), CliError> {
    info!("Starting kiln v{}", env!("CARGO_PKG_VERSION"));
    apply_cli_config(&mut config, &cli.command);
    let json = cli.global.json;

    match cli.command {
        Commands::Install {
            formula, prefix, ..
        } => install(&config, &formula, &prefix, json).await,
        Commands::Check { formula } => check(&formula, json).await,
        Commands::Env {
            formula,
            prefix,
            all,
        } => show_env(&config, &formula, &prefix, all, json).await,
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, command: &Commands) {
    if let Commands::Install {
        work_root,
        keep_work_dir,
        ..
    } = command
    {
        if let Some(root) = work_root {
            config.build.work_root.clone_from(root);
        }
        if *keep_work_dir {
            config.build.keep_work_dir = true;
        }
    }
}

fn require_absolute(prefix: &Path) -> Result<(), CliError> {
    if prefix.is_absolute() {
        Ok(())
    } else {
        Err(CliError::Kiln(
            FormulaError::RelativePrefix {
                path: prefix.display().to_string(),
            }
            .into(),
        ))
    }
}

async fn install(config: &Config, path: &Path, prefix: &Path, json: bool) -> Result<(), CliError> {
    let formula = load_formula(path).await?;
    require_absolute(prefix)?;

    tokio::fs::create_dir_all(prefix)
        .await
        .map_err(|e| kiln_errors::Error::io_with_path(&e, prefix))?;

    // Build output must not interleave with the JSON document on stdout
    let output = if json {
        StepOutput::Stderr
    } else {
        StepOutput::Inherit
    };
    let executor = FormulaExecutor::new(config).with_step_output(output);
    let report = executor.execute(&formula, prefix).await?;
    display::render_install(&report, prefix, json)
}

async fn check(path: &Path, json: bool) -> Result<(), CliError> {
    let formula = load_formula(path).await?;
    display::render_formula(&formula, json)
}

async fn show_env(
    config: &Config,
    path: &Path,
    prefix: &Path,
    all: bool,
    json: bool,
) -> Result<(), CliError> {
    let formula = load_formula(path).await?;
    require_absolute(prefix)?;

    let env = FormulaExecutor::new(config).environment_for(&formula, prefix);
    let own: BTreeSet<&str> = formula
        .effective_overrides()
        .map(|(name, _)| name)
        .chain(std::iter::once(formula.prefix_variable.as_str()))
        .collect();

    let vars: Vec<(&str, &str)> = env
        .iter()
        .filter(|(name, _)| all || own.contains(name))
        .collect();
    display::render_env(&vars, json)
}
