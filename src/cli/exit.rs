//! Semantic exit codes for the `critsect` binary.
//!
//! Exit codes are in the valid range (0-125).
//! Codes 126-255 are reserved by shells for special purposes.

/// Semantic exit codes.
pub struct ExitCode;

impl ExitCode {
    /// Success: every run finished and the log stayed consistent.
    pub const SUCCESS: i32 = 0;

    /// User error: bad arguments or configuration.
    pub const USER_ERROR: i32 = 1;

    /// Runtime error: a lock operation failed.
    pub const RUNTIME_ERROR: i32 = 2;

    /// Internal error: a driver thread panicked.
    pub const INTERNAL_ERROR: i32 = 3;

    // Application-specific codes (10-125)

    /// The consistency checker saw the lock fail to exclude.
    pub const ORACLE_VIOLATION: i32 = 11;

    /// Get human-readable description of an exit code.
    #[must_use]
    pub const fn description(code: i32) -> &'static str {
        match code {
            0 => "success",
            1 => "user error (invalid input/arguments)",
            2 => "runtime error",
            3 => "internal error (bug)",
            11 => "oracle violation",
            _ => "unknown",
        }
    }

    /// Check if an exit code indicates success (code 0).
    #[must_use]
    pub const fn is_success(code: i32) -> bool {
        code == Self::SUCCESS
    }
}
