//! Structured error messages for the `critsect` binary.
//!
//! Problem-details style: a machine-readable type, a title, optional detail
//! and suggestion, and the process exit code.

use serde::Serialize;

use super::exit::ExitCode;
use crate::bench::DriverError;
use crate::config::ConfigError;

/// Structured CLI error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliError {
    /// Error type identifier (machine-readable).
    #[serde(rename = "type")]
    pub error_type: String,

    /// Short human-readable title.
    pub title: String,

    /// Detailed explanation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,

    /// Suggested action for recovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Exit code for this error.
    pub exit_code: i32,
}

impl CliError {
    /// Create a new CLI error.
    #[must_use]
    pub fn new(error_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            title: title.into(),
            detail: String::new(),
            suggestion: None,
            exit_code: ExitCode::RUNTIME_ERROR,
        }
    }

    /// Add detailed explanation.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Add a suggested recovery action.
    #[must_use]
    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Set exit code.
    #[must_use]
    pub const fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Format for human output.
    #[must_use]
    pub fn human_format(&self) -> String {
        let mut out = String::new();
        out.push_str("Error: ");
        out.push_str(&self.title);
        out.push('\n');
        if !self.detail.is_empty() {
            out.push_str(&self.detail);
            out.push('\n');
        }
        if let Some(ref suggestion) = self.suggestion {
            out.push_str("\nSuggestion: ");
            out.push_str(suggestion);
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.title)
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::new("invalid_config", "Invalid configuration")
            .detail(err.to_string())
            .exit_code(ExitCode::USER_ERROR)
    }
}

impl From<DriverError> for CliError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Config(err) => err.into(),
            DriverError::Inconsistent(inconsistency) => {
                Self::new("oracle_violation", "CRITICAL ERROR: buffer inconsistency")
                    .detail(format!("the lock does not work: {inconsistency}"))
                    .exit_code(ExitCode::ORACLE_VIOLATION)
            }
            DriverError::Lock(err) => Self::new("lock_failure", "Lock operation failed")
                .detail(err.to_string())
                .suggestion("rerun with -vv to log wait-event activity")
                .exit_code(ExitCode::RUNTIME_ERROR),
            panicked @ (DriverError::WorkerPanicked { .. } | DriverError::CheckerPanicked) => {
                Self::new("thread_panicked", "Driver thread panicked")
                    .detail(panicked.to_string())
                    .exit_code(ExitCode::INTERNAL_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::Inconsistency;
    use crate::error::{Error, ErrorKind};

    #[test]
    fn inconsistency_maps_to_oracle_violation() {
        let err = CliError::from(DriverError::Inconsistent(Inconsistency {
            index: 3,
            expected: 10,
            actual: 11,
        }));
        assert_eq!(err.exit_code, ExitCode::ORACLE_VIOLATION);
        assert!(err.human_format().starts_with("Error: CRITICAL ERROR: buffer inconsistency"));
        assert!(err.detail.contains("log[3] = 11"));
    }

    #[test]
    fn driver_errors_map_to_exit_codes() {
        let cases = [
            (
                DriverError::Config(ConfigError::InvalidWorkers),
                ExitCode::USER_ERROR,
            ),
            (
                DriverError::Lock(Error::new(ErrorKind::BackendFailure)),
                ExitCode::RUNTIME_ERROR,
            ),
            (
                DriverError::WorkerPanicked { worker: 2 },
                ExitCode::INTERNAL_ERROR,
            ),
            (DriverError::CheckerPanicked, ExitCode::INTERNAL_ERROR),
        ];
        for (driver_err, code) in cases {
            let err = CliError::from(driver_err);
            assert_eq!(err.exit_code, code, "{err}");
        }
    }

    #[test]
    fn human_format_includes_suggestion() {
        let err = CliError::new("x", "Title")
            .detail("detail")
            .suggestion("try again");
        let text = err.human_format();
        assert!(text.contains("Title\ndetail\n"));
        assert!(text.contains("Suggestion: try again"));
        assert_eq!(err.to_string(), "x: Title");
    }
}
