//! Query entry points: evidence reduction, ordering and elimination wired
//! together.

use pgm_common::{Assignment, Error, Result};
use pgm_config::EngineConfig;
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::elimination::{Marginal, Mpe, VariableElimination};
use super::evidence::reduce_factors;
use super::order::{factor_neighbors, heuristic_for, EliminationOrder};
use crate::factor::Factor;
use crate::logging::Stage;
use crate::network::{build_default_factors, Network};

/// Conditional distribution of `query` given `evidence`, with the default
/// configuration and a min-neighbour order over the factor scopes.
pub fn sum_product_query(
    factors: Vec<Factor>,
    query: &[String],
    evidence: &Assignment,
) -> Result<Marginal> {
    QueryEngine::default().conditional(factors, query, evidence)
}

/// Most probable explanation given `evidence`, eliminating in the given
/// order.
pub fn max_product_query(
    factors: Vec<Factor>,
    elimination_order: &[String],
    evidence: &Assignment,
) -> Result<Mpe> {
    QueryEngine::default().mpe(factors, elimination_order, evidence)
}

/// Configured query runner.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    config: EngineConfig,
    engine: VariableElimination,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl QueryEngine {
    pub fn new(config: EngineConfig) -> Self {
        let engine = VariableElimination::new(&config);
        Self { config, engine }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rank `variables` with the configured heuristic.
    pub fn order_for(
        &self,
        variables: &[String],
        neighbors: &dyn Fn(&str) -> Vec<String>,
    ) -> Result<EliminationOrder> {
        let heuristic = heuristic_for(self.config.heuristic);
        let order = heuristic.order(variables, neighbors)?;
        info!(
            stage = %Stage::Order,
            heuristic = heuristic.name(),
            variables = order.len(),
            "elimination order selected"
        );
        debug!(stage = %Stage::Order, sequence = ?order.sequence(), "order");
        Ok(order)
    }

    /// Sum-product over a factor set; every scope variable outside `query`
    /// is eliminated, evidence variables included.
    pub fn conditional(
        &self,
        factors: Vec<Factor>,
        query: &[String],
        evidence: &Assignment,
    ) -> Result<Marginal> {
        check_known(&factors, query)?;
        let reduction = reduce_factors(factors, evidence)?;
        let eliminate = scope_variables_except(&reduction.factors, query);
        let neighbors = factor_neighbors(&reduction.factors);
        let order = self.order_for(&eliminate, &neighbors)?;
        let summary = reduction.summary();
        let mut marginal = self.engine.sum_product(reduction.factors, &order.sequence())?;
        marginal.evidence = summary;
        Ok(marginal)
    }

    /// Sum-product driven by a network's structure.
    ///
    /// Without explicit `factors`, one default factor per edge is built.
    /// The interaction graph comes from the network's neighbour relation.
    pub fn conditional_on(
        &self,
        network: &dyn Network,
        factors: Option<Vec<Factor>>,
        query: &[String],
        evidence: &Assignment,
    ) -> Result<Marginal> {
        if let Some(missing) = query.iter().find(|q| network.variable(q).is_none()) {
            return Err(Error::UnknownVariable(missing.clone()));
        }
        let factors = match factors {
            Some(fs) => fs,
            None => build_default_factors(network)?,
        };
        check_known(&factors, query)?;
        let reduction = reduce_factors(factors, evidence)?;
        let eliminate: Vec<String> = network
            .nodes()
            .iter()
            .map(|v| v.id().to_string())
            .filter(|id| !query.contains(id))
            .collect();
        let neighbors = |id: &str| network.neighbors_of(id);
        let order = self.order_for(&eliminate, &neighbors)?;
        let summary = reduction.summary();
        let mut marginal = self.engine.sum_product(reduction.factors, &order.sequence())?;
        marginal.evidence = summary;
        Ok(marginal)
    }

    /// Max-product with a caller-supplied elimination order.
    pub fn mpe(
        &self,
        factors: Vec<Factor>,
        elimination_order: &[String],
        evidence: &Assignment,
    ) -> Result<Mpe> {
        let reduction = reduce_factors(factors, evidence)?;
        let summary = reduction.summary();
        let mut mpe = self.engine.max_product(reduction.factors, elimination_order)?;
        mpe.evidence = summary;
        Ok(mpe)
    }

    /// Max-product over every scope variable, ordered by the configured
    /// heuristic.
    pub fn mpe_auto(&self, factors: Vec<Factor>, evidence: &Assignment) -> Result<Mpe> {
        let reduction = reduce_factors(factors, evidence)?;
        let eliminate = scope_variables_except(&reduction.factors, &[]);
        let neighbors = factor_neighbors(&reduction.factors);
        let order = self.order_for(&eliminate, &neighbors)?;
        let summary = reduction.summary();
        let mut mpe = self.engine.max_product(reduction.factors, &order.sequence())?;
        mpe.evidence = summary;
        Ok(mpe)
    }
}

fn check_known(factors: &[Factor], query: &[String]) -> Result<()> {
    match query
        .iter()
        .find(|q| !factors.iter().any(|f| f.in_scope(q)))
    {
        Some(q) => Err(Error::UnknownVariable(q.clone())),
        None => Ok(()),
    }
}

/// Sorted scope ids not listed in `keep`.
fn scope_variables_except(factors: &[Factor], keep: &[String]) -> Vec<String> {
    factors
        .iter()
        .flat_map(|f| f.scope_ids())
        .filter(|id| !keep.iter().any(|k| k == id))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
