//! Environment variable names and built-in defaults

pub const ENV_WORK_ROOT: &str = "KILN_WORK_ROOT";
pub const ENV_KEEP_WORK_DIR: &str = "KILN_KEEP_WORK_DIR";
pub const ENV_SHELL: &str = "KILN_SHELL";
pub const ENV_GIT: &str = "KILN_GIT";
pub const ENV_FETCH_TIMEOUT: &str = "KILN_FETCH_TIMEOUT";
pub const ENV_LOG_DIR: &str = "KILN_LOG_DIR";

pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_GIT: &str = "git";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

/// Directory under the system temp dir that holds kiln's scratch state
pub const SCRATCH_DIR_NAME: &str = "kiln";
