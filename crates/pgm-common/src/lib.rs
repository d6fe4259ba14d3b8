//! Shared types for the exact-inference workspace.
//!
//! This crate provides foundational types used by every other crate:
//! - Domain values with a total order so they can key lookup tables
//! - Canonical (sorted) variable assignments
//! - The unified error type with stable codes
//! - Output format selection for the command-line façade

pub mod assignment;
pub mod error;
pub mod output;
pub mod value;

pub use assignment::Assignment;
pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use output::OutputFormat;
pub use value::Value;
