//! Integration tests for error types

#[cfg(test)]
mod tests {
    use kiln_errors::*;

    #[test]
    fn test_error_conversion() {
        let fetch_err = FetchError::UnsupportedMethod {
            method: "svn".into(),
            uri: "svn://example/x".into(),
        };
        let err: Error = fetch_err.into();
        assert!(matches!(err, Error::Fetch(_)));
        assert_eq!(err.phase(), "fetch");
    }

    #[test]
    fn test_step_failure_display() {
        let err = StepError::Failed {
            index: 1,
            command: "make".into(),
            exit_status: ExitStatus::Code(2),
        };
        assert_eq!(err.to_string(), "step 1 failed with exit status 2: make");
        assert_eq!(err.index(), 1);
        assert_eq!(err.command(), "make");
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(
            ExitStatus::Signal(9).to_string(),
            "terminated by signal 9"
        );
        assert_eq!(ExitStatus::Signal(9).code(), None);
        assert_eq!(ExitStatus::Code(3).code(), Some(3));
    }

    #[test]
    fn test_user_codes() {
        let err: Error = FormulaError::MissingName.into();
        assert_eq!(err.user_code(), Some("formula.missing_name"));
        assert!(err.user_hint().is_some());
        assert!(!err.is_retryable());

        let err: Error = FetchError::Unreachable {
            uri: "git://example/x.git".into(),
            message: "connection refused".into(),
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(err.user_code(), Some("fetch.unreachable"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io_with_path(&io_err, "/opt/x");
        assert_eq!(err.user_message(), "missing (/opt/x)");
    }

    #[test]
    fn test_error_clone() {
        let err = ConfigError::InvalidValue {
            field: "KILN_KEEP_WORK_DIR".into(),
            value: "maybe".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_json_error_is_internal() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Internal(ref msg) if msg.starts_with("JSON error")));
        assert_eq!(err.user_code(), Some("error.internal"));
        assert_eq!(err.phase(), "setup");
    }
}
