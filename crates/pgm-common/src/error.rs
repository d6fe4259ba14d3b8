//! Error types for exact inference.
//!
//! Every failure carries:
//! - A stable numeric code for machine parsing
//! - A category for grouping
//! - A headline and remediation hint for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Scope Conflict
//!   Reason: factors f1 and f2 share [a, b] but may share exactly one free variable
//!   Fix: Choose an elimination order that removes one of the shared variables first.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "algebra",
//!   "message": "...",
//!   "context": { "left": "f1", "right": "f2", "shared": ["a", "b"] }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for inference operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Variable and factor construction problems.
    Model,
    /// Factor product, marginalization, and reduction errors.
    Algebra,
    /// Ordering and elimination errors.
    Elimination,
    /// Engine configuration errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Algebra => write!(f, "algebra"),
            ErrorCategory::Elimination => write!(f, "elimination"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for inference.
#[derive(Error, Debug)]
pub enum Error {
    // Model errors (10-19)
    #[error("invalid domain for {variable}: {reason}")]
    InvalidDomain { variable: String, reason: String },

    #[error("variable {variable} appears more than once in scope of {factor}")]
    DuplicateVariable { variable: String, factor: String },

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    // Factor algebra errors (20-29)
    #[error("factors {left} and {right} share {shared:?} but may share exactly one free variable")]
    ScopeConflict {
        left: String,
        right: String,
        shared: Vec<String>,
    },

    #[error("variable {variable} is not in scope of factor {factor}")]
    NotInScope { variable: String, factor: String },

    #[error("evidence {evidence} rejected: {reason}")]
    EvidenceOutOfDomain { evidence: String, reason: String },

    // Elimination errors (30-39)
    #[error("interaction graph is disconnected; unreachable: {unreached:?}")]
    DisconnectedGraph { unreached: Vec<String> },

    #[error("inference failed: {0}")]
    Inference(String),

    // Configuration errors (40-49)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Codes are stable and grouped by category:
    /// - 10-19: Model errors
    /// - 20-29: Factor algebra errors
    /// - 30-39: Elimination errors
    /// - 40-49: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidDomain { .. } => 10,
            Error::DuplicateVariable { .. } => 11,
            Error::UnknownVariable(_) => 12,
            Error::ScopeConflict { .. } => 20,
            Error::NotInScope { .. } => 21,
            Error::EvidenceOutOfDomain { .. } => 22,
            Error::DisconnectedGraph { .. } => 30,
            Error::Inference(_) => 31,
            Error::Config(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidDomain { .. }
            | Error::DuplicateVariable { .. }
            | Error::UnknownVariable(_) => ErrorCategory::Model,

            Error::ScopeConflict { .. }
            | Error::NotInScope { .. }
            | Error::EvidenceOutOfDomain { .. } => ErrorCategory::Algebra,

            Error::DisconnectedGraph { .. } | Error::Inference(_) => ErrorCategory::Elimination,

            Error::Config(_) => ErrorCategory::Config,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::InvalidDomain { .. } => {
                "Domain values must be finite and nonnegative. Fix the variable definition."
            }
            Error::DuplicateVariable { .. } => {
                "List each variable once in a factor scope."
            }
            Error::UnknownVariable(_) => {
                "Check the variable id against the model's variable list."
            }
            Error::ScopeConflict { .. } => {
                "Choose an elimination order that removes one of the shared variables first, or pin shared variables with evidence."
            }
            Error::NotInScope { .. } => {
                "Only variables in a factor's scope can be summed or maximized out of it."
            }
            Error::EvidenceOutOfDomain { .. } => {
                "Evidence must name a model variable and one of its domain values."
            }
            Error::DisconnectedGraph { .. } => {
                "Query each connected component separately, or add the missing edges."
            }
            Error::Inference(_) => {
                "Internal inference failure. Re-run with '--log-level debug' and report the trace."
            }
            Error::Config(_) => {
                "Run 'pgm config show' to inspect the resolved configuration."
            }
            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InvalidDomain { .. } => "Invalid Domain",
            Error::DuplicateVariable { .. } => "Duplicate Variable",
            Error::UnknownVariable(_) => "Unknown Variable",
            Error::ScopeConflict { .. } => "Scope Conflict",
            Error::NotInScope { .. } => "Variable Not In Scope",
            Error::EvidenceOutOfDomain { .. } => "Evidence Out Of Domain",
            Error::DisconnectedGraph { .. } => "Disconnected Graph",
            Error::Inference(_) => "Inference Error",
            Error::Config(_) => "Configuration Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Additional structured context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidDomain { variable, .. } | Error::UnknownVariable(variable) => {
                context.insert("variable".to_string(), serde_json::json!(variable));
            }
            Error::DuplicateVariable { variable, factor }
            | Error::NotInScope { variable, factor } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
                context.insert("factor".to_string(), serde_json::json!(factor));
            }
            Error::ScopeConflict {
                left,
                right,
                shared,
            } => {
                context.insert("left".to_string(), serde_json::json!(left));
                context.insert("right".to_string(), serde_json::json!(right));
                context.insert("shared".to_string(), serde_json::json!(shared));
            }
            Error::EvidenceOutOfDomain { evidence, .. } => {
                context.insert("evidence".to_string(), serde_json::json!(evidence));
            }
            Error::DisconnectedGraph { unreached } => {
                context.insert("unreached".to_string(), serde_json::json!(unreached));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> Error {
        Error::ScopeConflict {
            left: "f1".into(),
            right: "f2".into(),
            shared: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn test_error_code() {
        assert_eq!(Error::UnknownVariable("x".into()).code(), 12);
        assert_eq!(conflict().code(), 20);
        assert_eq!(Error::DisconnectedGraph { unreached: vec![] }.code(), 30);
        assert_eq!(Error::Config("bad".into()).code(), 40);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::InvalidDomain {
                variable: "a".into(),
                reason: "negative".into()
            }
            .category(),
            ErrorCategory::Model
        );
        assert_eq!(conflict().category(), ErrorCategory::Algebra);
        assert_eq!(
            Error::Inference("x".into()).category(),
            ErrorCategory::Elimination
        );
    }

    #[test]
    fn test_structured_error_context() {
        let structured = StructuredError::from(&conflict());
        assert_eq!(structured.code, 20);
        assert_eq!(structured.category, ErrorCategory::Algebra);
        assert_eq!(
            structured.context.get("shared"),
            Some(&serde_json::json!(["a", "b"]))
        );
    }

    #[test]
    fn test_structured_error_json() {
        let err = Error::NotInScope {
            variable: "c".into(),
            factor: "f".into(),
        };
        let json = StructuredError::from(&err).to_json();
        assert!(json.contains(r#""code":21"#));
        assert!(json.contains(r#""category":"algebra""#));
    }

    #[test]
    fn test_format_error_human() {
        let formatted = format_error_human(&conflict(), false);
        assert!(formatted.contains("Scope Conflict"));
        assert!(formatted.contains("factors f1 and f2"));
        assert!(formatted.contains("Fix:"));
    }

    #[test]
    fn test_io_from() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code(), 60);
        assert_eq!(err.category(), ErrorCategory::Io);
    }
}
