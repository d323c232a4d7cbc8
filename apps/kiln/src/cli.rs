//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kiln - fetch and build software from declarative formulas
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch and build software from declarative formulas")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging (also written as JSON to the log directory)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, build and install a formula
    #[command(alias = "i")]
    Install {
        /// Path to the formula (.yml, .yaml or .toml)
        formula: PathBuf,

        /// Absolute install prefix handed to the build steps
        #[arg(short, long, value_name = "DIR")]
        prefix: PathBuf,

        /// Parent directory for the working directory
        #[arg(long, value_name = "DIR")]
        work_root: Option<PathBuf>,

        /// Keep the working directory after a successful build
        #[arg(long)]
        keep_work_dir: bool,
    },

    /// Parse and validate a formula without running it
    Check {
        /// Path to the formula
        formula: PathBuf,
    },

    /// Print the environment a formula's steps would run with
    Env {
        /// Path to the formula
        formula: PathBuf,

        /// Absolute install prefix
        #[arg(short, long, value_name = "DIR")]
        prefix: PathBuf,

        /// Include inherited variables, not only the formula's own
        #[arg(long)]
        all: bool,
    },
}
