#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Formula definitions for kiln
//!
//! A formula declares where the source of one piece of software lives, how
//! to fetch it, which environment variables to override and which shell
//! steps build and install it. This crate parses formulas from YAML or TOML,
//! validates them and provides the `$NAME` template expansion used when the
//! steps are executed.

pub mod model;
pub mod parser;
pub mod template;

pub use model::{EnvOverrides, FetchMethod, Formula, SourceLocation, DEFAULT_PREFIX_VARIABLE};
pub use parser::{load_formula, parse_formula, FormulaFormat};
pub use template::expand;
