//! Exact-inference engine configuration loading and validation.
//!
//! This crate provides:
//! - The typed `EngineConfig` read from `engine.toml` or `engine.json`
//! - Config resolution (CLI → env → XDG → /etc → defaults)
//! - Semantic validation with stable error codes

pub mod engine;
pub mod resolve;
pub mod validate;

pub use engine::{EngineConfig, HeuristicKind};
pub use resolve::{load_config, resolve_config, ConfigPath, ConfigSource};
pub use validate::{validate_engine_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
