//! Event vocabulary shared by the engine and the JSONL layer.

use serde::{Deserialize, Serialize};

/// Log levels as they appear in JSONL output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Stages of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Model file parsing.
    Load,
    /// Evidence reduction.
    Reduce,
    /// Elimination-order selection.
    Order,
    /// Sum-product or max-product elimination.
    Eliminate,
    /// MPE traceback.
    Traceback,
    /// Rendering results.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Reduce => "reduce",
            Stage::Order => "order",
            Stage::Eliminate => "eliminate",
            Stage::Traceback => "traceback",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Event names used as tracing targets by the binary.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const MODEL_LOADED: &str = "model.loaded";
    pub const QUERY_FAILED: &str = "query.failed";
}
