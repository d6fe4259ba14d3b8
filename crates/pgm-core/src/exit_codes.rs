//! Exit codes for the `pgm` binary.
//!
//! Ranges:
//! - 0: success
//! - 10-19: user-correctable problems (arguments, config, model, query)
//! - 20-29: internal errors

use pgm_common::{Error, ErrorCategory};

/// Process exit codes. Stable for scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,

    /// Invalid arguments or evidence syntax.
    ArgsError = 10,

    /// Config file missing, unparseable or invalid.
    ConfigError = 11,

    /// Model file violates a precondition (bad domain, unknown id).
    ModelError = 12,

    /// The query could not be answered (scope conflict, disconnected
    /// subset, evidence outside a domain).
    InferenceError = 13,

    IoError = 14,

    /// Internal error; please report.
    InternalError = 20,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Ok
    }

    /// 10-19: fixable by the user.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    pub fn is_internal_error(self) -> bool {
        self.as_i32() >= 20
    }

    /// Name used in JSON error payloads.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::ModelError => "ERR_MODEL",
            ExitCode::InferenceError => "ERR_INFERENCE",
            ExitCode::IoError => "ERR_IO",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }

    /// Exit code for an engine error.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::Inference(_) => ExitCode::InternalError,
            _ => match err.category() {
                ErrorCategory::Model => ExitCode::ModelError,
                ErrorCategory::Algebra | ErrorCategory::Elimination => ExitCode::InferenceError,
                ErrorCategory::Config => ExitCode::ConfigError,
                ErrorCategory::Io => ExitCode::IoError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
