#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Formula execution for kiln
//!
//! Running a formula happens in three phases, each usable on its own:
//!
//! 1. [`Fetcher::fetch`] places the source in a working directory.
//! 2. [`prepare_environment`] builds the immutable environment for the steps.
//! 3. [`run_steps`] runs the steps in order and stops at the first failure.
//!
//! [`FormulaExecutor`] drives the three phases for one formula.

pub mod environment;
pub mod executor;
pub mod fetch;
pub mod fileops;
pub mod steps;

pub use environment::{prepare_environment, Environment};
pub use executor::{ExecutionReport, FormulaExecutor};
pub use fetch::{FetchOptions, Fetcher};
pub use steps::{run_steps, StepOutput, StepRunner};
