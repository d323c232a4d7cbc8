//! Tracing subscriber setup

use std::path::Path;

const DEFAULT_FILTER: &str = "warn,kiln=info,kiln_executor=info";
const DEBUG_FILTER: &str = "info,kiln=debug,kiln_executor=debug,kiln_formula=debug";

fn env_filter(default: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
}

/// Initialize tracing
///
/// Normal runs log to stderr, with `RUST_LOG` overriding the filter. With
/// `--debug` logs are written as JSON to a timestamped file in `log_dir`,
/// falling back to stderr if the file cannot be created. JSON output mode
/// keeps stderr quiet unless debugging or `RUST_LOG` asks for logs.
pub fn init_tracing(json_mode: bool, debug_flag: bool, log_dir: &Path) {
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();

    if debug_flag {
        let log_file = log_dir.join(format!(
            "kiln-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        let file =
            std::fs::create_dir_all(log_dir).and_then(|()| std::fs::File::create(&log_file));
        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_env_filter(env_filter(DEBUG_FILTER))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
            }
            Err(e) => {
                eprintln!("Warning: Failed to create log file: {e}");
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(env_filter(DEBUG_FILTER))
                    .init();
            }
        }
    } else if json_mode && !rust_log_set {
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_env_filter(env_filter(DEFAULT_FILTER))
            .init();
    }
}
