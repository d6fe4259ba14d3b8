//! Exact inference over factor sets.
//!
//! - [`evidence`]: restrict factors to observed values
//! - [`order`]: elimination-order heuristics over an interaction graph
//! - [`elimination`]: sum-product and max-product variable elimination
//! - [`query`]: the entry points tying the three together

pub mod elimination;
pub mod evidence;
pub mod order;
pub mod query;

pub use elimination::{EliminationState, EliminationStep, Marginal, Mpe, VariableElimination};
pub use evidence::{reduce_factors, EvidenceReduction, EvidenceSummary};
pub use order::{
    factor_neighbors, heuristic_for, EliminationHeuristic, EliminationOrder, MaxCardinality,
    MinNeighbors,
};
pub use query::{max_product_query, sum_product_query, QueryEngine};
