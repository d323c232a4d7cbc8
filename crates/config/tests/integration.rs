//! Integration tests for config

#[cfg(test)]
mod tests {
    use kiln_config::*;
    use kiln_errors::{ConfigError, Error};
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[build]
work_root = "/var/tmp/kiln-work"
keep_work_dir = true
shell = "/bin/bash"

[fetch]
timeout = 60
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.build.work_root, PathBuf::from("/var/tmp/kiln-work"));
        assert!(config.build.keep_work_dir);
        assert_eq!(config.build.shell, "/bin/bash");
        assert_eq!(config.fetch.timeout, 60);
        assert_eq!(config.fetch.git, "git");
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load_or_default(Some(&missing)).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.build.keep_work_dir);
        assert_eq!(config.build.shell, "/bin/sh");
        assert_eq!(config.fetch.timeout, 300);
        assert!(config.fetch.user_agent.starts_with("kiln/"));
        assert!(config.build.work_root.ends_with("kiln/work"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[build\nshell = 1").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_merge_env() {
        let mut config = Config::default();
        config
            .merge_env_with(lookup(&[
                ("KILN_WORK_ROOT", "/scratch/kiln"),
                ("KILN_KEEP_WORK_DIR", "yes"),
                ("KILN_FETCH_TIMEOUT", "15"),
                ("KILN_GIT", "/usr/local/bin/git"),
            ]))
            .unwrap();

        assert_eq!(config.build.work_root, PathBuf::from("/scratch/kiln"));
        assert!(config.build.keep_work_dir);
        assert_eq!(config.fetch.timeout, 15);
        assert_eq!(config.fetch.git, "/usr/local/bin/git");
    }

    #[test]
    fn test_merge_env_rejects_bad_values() {
        let mut config = Config::default();
        let err = config
            .merge_env_with(lookup(&[("KILN_KEEP_WORK_DIR", "maybe")]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { ref field, .. }) if field == "KILN_KEEP_WORK_DIR"
        ));

        let err = config
            .merge_env_with(lookup(&[("KILN_FETCH_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }
}
