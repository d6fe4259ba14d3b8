//! Factor product and marginalization.
//!
//! # Product
//!
//! Two factors combine only when their scopes intersect in exactly one
//! *free* variable. A shared variable whose scope products take a single
//! value in either operand (typically because evidence pinned it) is not
//! free; it is still matched on, but does not count against the limit.
//! Every pair of scope products that agree on all shared variables yields
//! one union assignment in the result.
//!
//! # Marginalization
//!
//! `sumout` adds over the eliminated variable and conserves mass.
//! `maxout` keeps the best value per surviving assignment and records which
//! value of the eliminated variable achieved it.

use pgm_common::{Assignment, Error, Result, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::{Factor, Potential};
use crate::variable::VariableRef;

/// Result of maximizing a variable out of a factor.
#[derive(Debug, Clone)]
pub struct MaxOut {
    /// Max-marginal over the remaining scope.
    pub factor: Factor,
    /// Eliminated variable's maximizing value per remaining assignment.
    pub argmax: BTreeMap<Assignment, Value>,
}

impl Factor {
    /// Ids shared with `other`, in sorted order.
    pub fn shared_ids(&self, other: &Factor) -> Vec<String> {
        self.scope_ids()
            .filter(|id| other.in_scope(id))
            .map(str::to_string)
            .collect()
    }

    /// Number of distinct values `id` takes across the scope products.
    fn distinct_values(&self, id: &str) -> usize {
        self.scope_products
            .iter()
            .filter_map(|p| p.get(id))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Reject products the engine cannot form.
    fn check_shared(&self, other: &Factor) -> Result<()> {
        let shared = self.shared_ids(other);
        let free = shared
            .iter()
            .filter(|id| self.distinct_values(id) > 1 && other.distinct_values(id) > 1)
            .count();
        if shared.is_empty() || free > 1 {
            return Err(Error::ScopeConflict {
                left: self.id.clone(),
                right: other.id.clone(),
                shared,
            });
        }
        Ok(())
    }

    /// Multiply two factors.
    pub fn product(&self, other: &Factor) -> Result<Factor> {
        self.product_with(other, |x, y| x * y, |added, acc| added * acc, 1.0)
            .map(|(f, _)| f)
    }

    /// Combine two factors with a custom pointwise `combine`.
    ///
    /// `accumulate(added, acc)` folds every combined value starting from
    /// `init`; the fold is returned alongside the new factor.
    pub fn product_with<C, A>(
        &self,
        other: &Factor,
        combine: C,
        accumulate: A,
        init: f64,
    ) -> Result<(Factor, f64)>
    where
        C: Fn(f64, f64) -> f64,
        A: Fn(f64, f64) -> f64,
    {
        self.check_shared(other)?;

        let mut table = BTreeMap::new();
        let mut acc = init;
        for s in &self.scope_products {
            let vs = self.eval(s);
            for o in &other.scope_products {
                if let Some(joint) = s.merged(o) {
                    let v = combine(vs, other.eval(o));
                    acc = accumulate(v, acc);
                    table.insert(joint, v);
                }
            }
        }

        let mut scope: Vec<VariableRef> = self.scope.clone();
        for var in &other.scope {
            if !self.in_scope(var.id()) {
                scope.push(var.clone());
            }
        }
        scope.sort_by(|a, b| a.id().cmp(b.id()));

        let products = table.keys().cloned().collect();
        let f = Factor::assemble(
            Uuid::new_v4().to_string(),
            scope,
            Potential::Table(table),
            products,
        );
        Ok((f, acc))
    }

    fn without_var(&self, id: &str) -> Result<Vec<VariableRef>> {
        if !self.in_scope(id) {
            return Err(Error::NotInScope {
                variable: id.to_string(),
                factor: self.id.clone(),
            });
        }
        Ok(self.scope.iter().filter(|v| v.id() != id).cloned().collect())
    }

    /// Sum `id` out of the factor.
    ///
    /// The result's partition value equals this factor's. Summing out the
    /// last scope variable yields a scalar factor.
    pub fn sumout(&self, id: &str) -> Result<Factor> {
        let scope = self.without_var(id)?;
        let mut table: BTreeMap<Assignment, f64> = BTreeMap::new();
        for p in &self.scope_products {
            *table.entry(p.without(id)).or_insert(0.0) += self.eval(p);
        }
        let products = table.keys().cloned().collect();
        Ok(Factor::assemble(
            format!("sum[{}]({})", id, self.id),
            scope,
            Potential::Table(table),
            products,
        ))
    }

    /// Maximize `id` out of the factor, recording the maximizers.
    ///
    /// Ties keep the value met first in scope-product order.
    pub fn maxout(&self, id: &str) -> Result<MaxOut> {
        let scope = self.without_var(id)?;
        let mut best: BTreeMap<Assignment, (f64, Value)> = BTreeMap::new();
        for p in &self.scope_products {
            let Some(x) = p.get(id) else { continue };
            let v = self.eval(p);
            let key = p.without(id);
            match best.get_mut(&key) {
                Some(slot) if v > slot.0 => *slot = (v, x),
                Some(_) => {}
                None => {
                    best.insert(key, (v, x));
                }
            }
        }

        let argmax = best.iter().map(|(k, (_, x))| (k.clone(), *x)).collect();
        let table: BTreeMap<Assignment, f64> =
            best.into_iter().map(|(k, (v, _))| (k, v)).collect();
        let products = table.keys().cloned().collect();
        let factor = Factor::assemble(
            format!("max[{}]({})", id, self.id),
            scope,
            Potential::Table(table),
            products,
        );
        Ok(MaxOut { factor, argmax })
    }
}
