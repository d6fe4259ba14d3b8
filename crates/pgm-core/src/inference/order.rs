//! Elimination-order heuristics (Koller & Friedman 2009, §9.4.3).
//!
//! # Algorithm
//!
//! 1. Explore the interaction graph breadth-first from the first variable,
//!    through any node the neighbour function yields. Variables of the
//!    subset not reached this way make the order undefined
//!    (`DisconnectedGraph`).
//! 2. Rank the subset greedily:
//!    - [`MinNeighbors`]: pick the unmarked variable with the fewest
//!      unmarked neighbours, rank it next, then connect every pair of its
//!      unmarked neighbours (fill-in).
//!    - [`MaxCardinality`]: pick the unmarked variable with the most marked
//!      neighbours and rank it, counting down from `n - 1`. No fill-in.
//!
//! Ties go to the variable listed first. Marking state lives in an
//! explicit [`OrderingContext`] rather than in captured mutable maps.

use pgm_common::{Error, Result};
use pgm_config::HeuristicKind;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::factor::Factor;

/// Map from variable id to elimination rank `0..n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EliminationOrder {
    ranks: BTreeMap<String, usize>,
}

impl EliminationOrder {
    /// Order taken verbatim from a sequence.
    pub fn from_sequence<S: AsRef<str>>(sequence: &[S]) -> Self {
        Self {
            ranks: sequence
                .iter()
                .enumerate()
                .map(|(i, id)| (id.as_ref().to_string(), i))
                .collect(),
        }
    }

    pub fn rank(&self, id: &str) -> Option<usize> {
        self.ranks.get(id).copied()
    }

    /// Ids sorted by rank.
    pub fn sequence(&self) -> Vec<String> {
        let mut pairs: Vec<(&String, &usize)> = self.ranks.iter().collect();
        pairs.sort_by_key(|(_, r)| **r);
        pairs.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn ranks(&self) -> &BTreeMap<String, usize> {
        &self.ranks
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// Strategy that ranks a variable subset for elimination.
pub trait EliminationHeuristic {
    fn name(&self) -> &'static str;

    fn order(
        &self,
        variables: &[String],
        neighbors: &dyn Fn(&str) -> Vec<String>,
    ) -> Result<EliminationOrder>;
}

/// Heuristic selected by configuration.
pub fn heuristic_for(kind: HeuristicKind) -> Box<dyn EliminationHeuristic> {
    match kind {
        HeuristicKind::MinNeighbors => Box::new(MinNeighbors),
        HeuristicKind::MaxCardinality => Box::new(MaxCardinality),
    }
}

/// Neighbour function derived from factor scopes: two variables are
/// adjacent when some factor mentions both.
pub fn factor_neighbors(factors: &[Factor]) -> impl Fn(&str) -> Vec<String> {
    let mut adj: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for f in factors {
        let ids: Vec<&str> = f.scope_ids().collect();
        for a in &ids {
            let entry = adj.entry(a.to_string()).or_default();
            entry.extend(ids.iter().filter(|b| *b != a).map(|b| b.to_string()));
        }
    }
    move |id: &str| {
        adj.get(id)
            .map(|ns| ns.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Undirected adjacency discovered from a neighbour function.
#[derive(Debug, Clone, Default)]
struct InteractionGraph {
    adj: BTreeMap<String, BTreeSet<String>>,
}

impl InteractionGraph {
    /// Breadth-first exploration from `seed`.
    fn explore(seed: &str, neighbors: &dyn Fn(&str) -> Vec<String>) -> Self {
        let mut graph = Self::default();
        let mut queue = VecDeque::new();
        let mut seen = BTreeSet::new();
        seen.insert(seed.to_string());
        queue.push_back(seed.to_string());

        while let Some(node) = queue.pop_front() {
            graph.adj.entry(node.clone()).or_default();
            for n in neighbors(&node) {
                if n == node {
                    continue;
                }
                graph.connect(&node, &n);
                if seen.insert(n.clone()) {
                    queue.push_back(n);
                }
            }
        }
        graph
    }

    fn connect(&mut self, a: &str, b: &str) {
        self.adj.entry(a.to_string()).or_default().insert(b.to_string());
        self.adj.entry(b.to_string()).or_default().insert(a.to_string());
    }

    fn contains(&self, id: &str) -> bool {
        self.adj.contains_key(id)
    }

    fn neighbors(&self, id: &str) -> impl Iterator<Item = &String> {
        self.adj.get(id).into_iter().flatten()
    }
}

/// Marking state threaded through one ordering run.
#[derive(Debug)]
struct OrderingContext {
    graph: InteractionGraph,
    variables: Vec<String>,
    marked: BTreeSet<String>,
    ranks: BTreeMap<String, usize>,
}

impl OrderingContext {
    /// Dedupe the subset, explore the graph and check reachability.
    fn new(variables: &[String], neighbors: &dyn Fn(&str) -> Vec<String>) -> Result<Self> {
        let mut unique = Vec::new();
        for v in variables {
            if !unique.contains(v) {
                unique.push(v.clone());
            }
        }
        let graph = match unique.first() {
            Some(seed) => InteractionGraph::explore(seed, neighbors),
            None => InteractionGraph::default(),
        };
        let unreached: Vec<String> = unique
            .iter()
            .filter(|v| !graph.contains(v))
            .cloned()
            .collect();
        if !unreached.is_empty() {
            return Err(Error::DisconnectedGraph { unreached });
        }
        Ok(Self {
            graph,
            variables: unique,
            marked: BTreeSet::new(),
            ranks: BTreeMap::new(),
        })
    }

    fn unmarked(&self) -> impl Iterator<Item = &String> {
        self.variables.iter().filter(|v| !self.marked.contains(*v))
    }

    fn unmarked_neighbors(&self, id: &str) -> Vec<String> {
        self.graph
            .neighbors(id)
            .filter(|n| !self.marked.contains(*n))
            .cloned()
            .collect()
    }

    fn marked_neighbor_count(&self, id: &str) -> usize {
        self.graph
            .neighbors(id)
            .filter(|n| self.marked.contains(*n))
            .count()
    }

    fn mark(&mut self, id: &str, rank: usize) {
        self.marked.insert(id.to_string());
        self.ranks.insert(id.to_string(), rank);
    }

    fn finish(self) -> Result<EliminationOrder> {
        if self.ranks.len() != self.variables.len() {
            let unreached = self
                .variables
                .iter()
                .filter(|v| !self.ranks.contains_key(*v))
                .cloned()
                .collect();
            return Err(Error::DisconnectedGraph { unreached });
        }
        Ok(EliminationOrder { ranks: self.ranks })
    }
}

/// Greedy minimum-neighbour ordering with fill-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinNeighbors;

impl EliminationHeuristic for MinNeighbors {
    fn name(&self) -> &'static str {
        "min_neighbors"
    }

    fn order(
        &self,
        variables: &[String],
        neighbors: &dyn Fn(&str) -> Vec<String>,
    ) -> Result<EliminationOrder> {
        let mut ctx = OrderingContext::new(variables, neighbors)?;
        for rank in 0..ctx.variables.len() {
            let mut best: Option<(String, usize)> = None;
            for v in ctx.unmarked() {
                let count = ctx.unmarked_neighbors(v).len();
                if best.as_ref().map_or(true, |(_, c)| count < *c) {
                    best = Some((v.clone(), count));
                }
            }
            let Some((x, _)) = best else { break };

            let ns = ctx.unmarked_neighbors(&x);
            for (i, a) in ns.iter().enumerate() {
                for b in &ns[i + 1..] {
                    ctx.graph.connect(a, b);
                }
            }
            ctx.mark(&x, rank);
        }
        ctx.finish()
    }
}

/// Maximum-cardinality ordering, ranks assigned from `n - 1` down.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxCardinality;

impl EliminationHeuristic for MaxCardinality {
    fn name(&self) -> &'static str {
        "max_cardinality"
    }

    fn order(
        &self,
        variables: &[String],
        neighbors: &dyn Fn(&str) -> Vec<String>,
    ) -> Result<EliminationOrder> {
        let mut ctx = OrderingContext::new(variables, neighbors)?;
        let n = ctx.variables.len();
        for step in 0..n {
            let mut best: Option<(String, usize)> = None;
            for v in ctx.unmarked() {
                let count = ctx.marked_neighbor_count(v);
                if best.as_ref().map_or(true, |(_, c)| count > *c) {
                    best = Some((v.clone(), count));
                }
            }
            let Some((x, _)) = best else { break };
            ctx.mark(&x, n - 1 - step);
        }
        ctx.finish()
    }
}
