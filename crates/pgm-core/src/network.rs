//! Network abstraction: variables as nodes plus typed edges.
//!
//! The elimination engine only asks a network for its nodes, its edges and
//! the neighbours of a node. [`Graph`] is a small in-memory implementation
//! used by model files; callers with their own graph storage implement
//! [`Network`] directly.

use pgm_common::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

use crate::factor::Factor;
use crate::variable::{check_domain, VariableRef};

/// An edge between two variables.
#[derive(Debug, Clone)]
pub struct Edge {
    pub start: VariableRef,
    pub end: VariableRef,
    pub directed: bool,
}

impl Edge {
    pub fn new(start: VariableRef, end: VariableRef, directed: bool) -> Self {
        Self {
            start,
            end,
            directed,
        }
    }

    /// Endpoint ids as `(start, end)`.
    pub fn ids(&self) -> (&str, &str) {
        (self.start.id(), self.end.id())
    }
}

/// Read-only view of a probabilistic graphical model's structure.
pub trait Network {
    /// All variables, in a stable order.
    fn nodes(&self) -> Vec<VariableRef>;

    /// All edges, in a stable order.
    fn edges(&self) -> Vec<Edge>;

    /// Ids adjacent to `id`, ignoring edge direction.
    fn neighbors_of(&self, id: &str) -> Vec<String>;

    /// Look a variable up by id.
    fn variable(&self, id: &str) -> Option<VariableRef> {
        self.nodes().into_iter().find(|v| v.id() == id)
    }

    /// Markov blanket of `id` in an undirected model: its neighbours.
    fn markov_blanket(&self, id: &str) -> Result<Vec<String>> {
        if self.variable(id).is_none() {
            return Err(Error::UnknownVariable(id.to_string()));
        }
        Ok(self.neighbors_of(id))
    }

    /// `id` together with its Markov blanket.
    fn closure_of(&self, id: &str) -> Result<Vec<String>> {
        let mut out = vec![id.to_string()];
        out.extend(self.markov_blanket(id)?);
        Ok(out)
    }
}

/// In-memory network with insertion-ordered nodes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<VariableRef>,
    index: BTreeMap<String, usize>,
    edges: Vec<Edge>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Re-adding an id is an error; domains are checked here.
    pub fn add_variable(&mut self, var: VariableRef) -> Result<()> {
        check_domain(var.as_ref())?;
        if self.index.contains_key(var.id()) {
            return Err(Error::InvalidDomain {
                variable: var.id().to_string(),
                reason: "variable defined twice".to_string(),
            });
        }
        self.index.insert(var.id().to_string(), self.nodes.len());
        self.adjacency.entry(var.id().to_string()).or_default();
        self.nodes.push(var);
        Ok(())
    }

    /// Connect two existing variables.
    pub fn add_edge(&mut self, start: &str, end: &str, directed: bool) -> Result<()> {
        let s = self.lookup(start)?;
        let e = self.lookup(end)?;
        self.adjacency
            .entry(start.to_string())
            .or_default()
            .insert(end.to_string());
        self.adjacency
            .entry(end.to_string())
            .or_default()
            .insert(start.to_string());
        self.edges.push(Edge::new(s, e, directed));
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<VariableRef> {
        self.index
            .get(id)
            .map(|&i| self.nodes[i].clone())
            .ok_or_else(|| Error::UnknownVariable(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Network for Graph {
    fn nodes(&self) -> Vec<VariableRef> {
        self.nodes.clone()
    }

    fn edges(&self) -> Vec<Edge> {
        self.edges.clone()
    }

    fn neighbors_of(&self, id: &str) -> Vec<String> {
        self.adjacency
            .get(id)
            .map(|ns| ns.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn variable(&self, id: &str) -> Option<VariableRef> {
        self.lookup(id).ok()
    }
}

/// One marginal-product factor per edge, over the edge's two endpoints.
///
/// Used when a model supplies structure but no explicit potentials.
pub fn build_default_factors(network: &dyn Network) -> Result<Vec<Factor>> {
    network
        .edges()
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let (s, t) = e.ids();
            Factor::new(
                format!("edge{}:{}-{}", i, s, t),
                vec![e.start.clone(), e.end.clone()],
            )
        })
        .collect()
}

/// Factors whose whole scope lies inside `ids`.
pub fn scope_subset_factors<'a>(factors: &'a [Factor], ids: &[&str]) -> Vec<&'a Factor> {
    factors
        .iter()
        .filter(|f| f.scope_ids().all(|id| ids.contains(&id)))
        .collect()
}
