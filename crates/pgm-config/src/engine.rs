//! Engine configuration types.
//!
//! These types mirror `engine.toml`:
//!
//! ```toml
//! schema_version = "1.0.0"
//! heuristic = "min_neighbors"
//! rescale = true
//! max_scope_products = 1048576
//! precision = 6
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::validate::ValidationError;

/// Elimination-order heuristic used when a query does not supply an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    /// Greedy minimum unmarked-neighbour count with fill-in.
    #[default]
    MinNeighbors,
    /// Maximum marked-neighbour count, no fill-in.
    MaxCardinality,
}

impl HeuristicKind {
    pub const ALL: &'static [HeuristicKind] =
        &[HeuristicKind::MinNeighbors, HeuristicKind::MaxCardinality];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeuristicKind::MinNeighbors => "min_neighbors",
            HeuristicKind::MaxCardinality => "max_cardinality",
        }
    }

    /// Parse a heuristic name, accepting a few spellings.
    pub fn parse(s: &str) -> Option<HeuristicKind> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "min_neighbors" | "min_neighbours" | "min_neighbor" | "greedy" => {
                Some(HeuristicKind::MinNeighbors)
            }
            "max_cardinality" | "mcs" => Some(HeuristicKind::MaxCardinality),
            _ => None,
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HeuristicKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeuristicKind::parse(s).ok_or_else(|| {
            let valid: Vec<&str> = HeuristicKind::ALL.iter().map(|h| h.as_str()).collect();
            format!("unknown heuristic '{}'; expected one of {}", s, valid.join(", "))
        })
    }
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

fn default_rescale() -> bool {
    true
}

fn default_max_scope_products() -> usize {
    1 << 20
}

fn default_precision() -> usize {
    6
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Heuristic for queries that need an automatically chosen order.
    #[serde(default)]
    pub heuristic: HeuristicKind,

    /// Rescale intermediate factors to max 1 and track the divisor in log space.
    #[serde(default = "default_rescale")]
    pub rescale: bool,

    /// Intermediate factors larger than this are reported at warn level.
    #[serde(default = "default_max_scope_products")]
    pub max_scope_products: usize,

    /// Decimal places used by human-readable output.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            heuristic: HeuristicKind::default(),
            rescale: default_rescale(),
            max_scope_products: default_max_scope_products(),
            precision: default_precision(),
        }
    }
}

impl EngineConfig {
    /// Load from a file; `.json` files are read as JSON, everything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ValidationError> {
        toml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Parse from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Render as TOML, the format `config show` prints for humans.
    pub fn to_toml(&self) -> Result<String, ValidationError> {
        toml::to_string_pretty(self)
            .map_err(|e| ValidationError::ParseError(format!("TOML encode failed: {}", e)))
    }
}
