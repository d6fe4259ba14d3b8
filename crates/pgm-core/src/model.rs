//! JSON model files.
//!
//! A model lists variables with their domains and marginals, the network
//! edges, and optionally explicit factor tables. Without explicit factors
//! one marginal-product factor per edge is used.
//!
//! ```json
//! {
//!   "variables": [
//!     {"id": "a", "values": [true, false], "marginal": [0.6, 0.4]},
//!     {"id": "b", "values": [true, false]}
//!   ],
//!   "edges": [{"start": "a", "end": "b"}],
//!   "factors": [
//!     {"id": "ba", "scope": ["a", "b"], "entries": [
//!       {"assignment": {"a": true, "b": true}, "value": 0.9}
//!     ]}
//!   ]
//! }
//! ```

use pgm_common::{Assignment, Error, Result, Value};
use pgm_math::approx_eq;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::factor::Factor;
use crate::logging::Stage;
use crate::network::{build_default_factors, Graph, Network};
use crate::variable::{DiscreteVariable, VariableRef};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub factors: Vec<FactorSpec>,
}

/// A variable; the marginal defaults to uniform. A marginal that does not
/// sum to one is accepted with a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    pub id: String,
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marginal: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeSpec {
    pub start: String,
    pub end: String,
    #[serde(default = "default_directed")]
    pub directed: bool,
}

fn default_directed() -> bool {
    true
}

/// An explicit factor table. Missing entries are zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactorSpec {
    pub id: String,
    pub scope: Vec<String>,
    pub entries: Vec<TableEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableEntry {
    pub assignment: Assignment,
    pub value: f64,
}

/// A loaded model: its network and the factors queries run over.
#[derive(Debug, Clone)]
pub struct Model {
    name: Option<String>,
    graph: Graph,
    factors: Vec<Factor>,
    explicit_factors: bool,
}

impl Model {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let model = Self::from_json(&text)?;
        info!(
            stage = %Stage::Load,
            path = %path.display(),
            variables = model.graph.len(),
            factors = model.factors.len(),
            explicit = model.explicit_factors,
            "model loaded"
        );
        Ok(model)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: ModelFile = serde_json::from_str(text)?;
        Self::from_spec(file)
    }

    pub fn from_spec(file: ModelFile) -> Result<Self> {
        let mut graph = Graph::new();
        for spec in &file.variables {
            graph.add_variable(build_variable(spec)?)?;
        }
        for e in &file.edges {
            graph.add_edge(&e.start, &e.end, e.directed)?;
        }

        let explicit_factors = !file.factors.is_empty();
        let factors = if explicit_factors {
            file.factors
                .iter()
                .map(|spec| build_factor(&graph, spec))
                .collect::<Result<Vec<_>>>()?
        } else {
            build_default_factors(&graph)?
        };
        debug!(
            stage = %Stage::Load,
            edges = file.edges.len(),
            factors = factors.len(),
            "model assembled"
        );

        Ok(Self {
            name: file.name,
            graph,
            factors,
            explicit_factors,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn has_explicit_factors(&self) -> bool {
        self.explicit_factors
    }

    /// Variable ids in declaration order.
    pub fn variable_ids(&self) -> Vec<String> {
        self.graph
            .nodes()
            .iter()
            .map(|v| v.id().to_string())
            .collect()
    }

    /// Look up a variable, failing with `UnknownVariable`.
    pub fn variable(&self, id: &str) -> Result<VariableRef> {
        self.graph
            .variable(id)
            .ok_or_else(|| Error::UnknownVariable(id.to_string()))
    }
}

const MARGINAL_TOLERANCE: f64 = 1e-9;

fn build_variable(spec: &VariableSpec) -> Result<VariableRef> {
    let var = match &spec.marginal {
        None => DiscreteVariable::uniform(spec.id.clone(), spec.values.iter().copied())?,
        Some(ps) if ps.len() == spec.values.len() => {
            let total: f64 = ps.iter().sum();
            if !approx_eq(total, 1.0, MARGINAL_TOLERANCE) {
                warn!(
                    stage = %Stage::Load,
                    variable = %spec.id,
                    total,
                    "marginal does not sum to one"
                );
            }
            DiscreteVariable::new(
                spec.id.clone(),
                spec.values.iter().copied().zip(ps.iter().copied()),
            )?
        }
        Some(ps) => {
            return Err(Error::InvalidDomain {
                variable: spec.id.clone(),
                reason: format!(
                    "{} marginal entries for {} values",
                    ps.len(),
                    spec.values.len()
                ),
            })
        }
    };
    Ok(var.shared())
}

fn build_factor(graph: &Graph, spec: &FactorSpec) -> Result<Factor> {
    let scope = spec
        .scope
        .iter()
        .map(|id| {
            graph
                .variable(id)
                .ok_or_else(|| Error::UnknownVariable(id.clone()))
        })
        .collect::<Result<Vec<_>>>()?;
    Factor::from_table(
        spec.id.clone(),
        scope,
        spec.entries
            .iter()
            .map(|e| (e.assignment.clone(), e.value)),
    )
}
