//! Factors over discrete variables (Koller & Friedman 2009, §4.2.1).
//!
//! A factor maps every joint assignment of its scope to a nonnegative real.
//! Each factor caches:
//! - its *scope products*, the joint assignments it is currently defined
//!   on (the Cartesian product of the scope domains, possibly narrowed by
//!   evidence)
//! - its partition value `Z`, the sum of the factor over those products
//!
//! `Z` is recomputed every time the scope-product list changes.
//!
//! # Potentials
//!
//! A factor is backed either by the product of its scope variables'
//! marginals or by an explicit lookup table keyed by canonical assignments.
//! Every derived factor (product, sum-out, max-out, rescale) carries a
//! table built once when it is derived; no derived factor re-evaluates its
//! inputs.
//!
//! # Example
//!
//! ```rust
//! use pgm_core::factor::Factor;
//! use pgm_core::variable::DiscreteVariable;
//! use pgm_common::Assignment;
//!
//! let a = DiscreteVariable::boolean("a", 0.6).unwrap().shared();
//! let b = DiscreteVariable::boolean("b", 0.5).unwrap().shared();
//! let f = Factor::new("ab", vec![a, b]).unwrap();
//!
//! assert_eq!(f.scope_products().len(), 4);
//! assert!((f.partition() - 1.0).abs() < 1e-12);
//! let v = f.value(&Assignment::new().with("a", true).with("b", false)).unwrap();
//! assert!((v - 0.3).abs() < 1e-12);
//! ```

mod ops;
mod reduce;

pub use ops::MaxOut;
pub(crate) use reduce::validate_evidence;

use pgm_common::{Assignment, Error, Result, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::variable::{check_domain, Variable, VariableRef};

/// Per-variable value lists, in scope order.
pub type Domain = Vec<(String, Vec<Value>)>;

#[derive(Debug, Clone)]
enum Potential {
    /// Product of each assigned variable's marginal.
    MarginalProduct,
    /// Explicit values; assignments without an entry are zero.
    Table(BTreeMap<Assignment, f64>),
}

/// A nonnegative function over the joint assignments of a scope.
#[derive(Debug, Clone)]
pub struct Factor {
    id: String,
    scope: Vec<VariableRef>,
    potential: Potential,
    scope_products: Vec<Assignment>,
    z: f64,
}

impl Factor {
    /// Marginal-product factor over `scope`.
    pub fn new(id: impl Into<String>, scope: Vec<VariableRef>) -> Result<Self> {
        let id = id.into();
        let scope = canonical_scope(&id, scope)?;
        let products = cartesian(&domain_of(&scope, |_| true, |_| true, |v| v));
        Ok(Self::assemble(id, scope, Potential::MarginalProduct, products))
    }

    /// Factor whose values come from `f`, evaluated once per scope product.
    pub fn from_fn<F>(id: impl Into<String>, scope: Vec<VariableRef>, f: F) -> Result<Self>
    where
        F: Fn(&Assignment) -> f64,
    {
        let id = id.into();
        let scope = canonical_scope(&id, scope)?;
        let products = cartesian(&domain_of(&scope, |_| true, |_| true, |v| v));
        let mut table = BTreeMap::new();
        for p in &products {
            let v = f(p);
            check_entry(&id, p, v)?;
            table.insert(p.clone(), v);
        }
        Ok(Self::assemble(id, scope, Potential::Table(table), products))
    }

    /// Factor from explicit `(assignment, value)` entries.
    ///
    /// Every entry must assign each scope variable a domain value and
    /// nothing else, and no assignment may appear twice. Scope products
    /// without an entry are zero.
    pub fn from_table<I>(id: impl Into<String>, scope: Vec<VariableRef>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Assignment, f64)>,
    {
        let id = id.into();
        let scope = canonical_scope(&id, scope)?;
        let mut table = BTreeMap::new();
        for (a, v) in entries {
            if let Some(foreign) = a.ids().find(|k| !scope.iter().any(|s| s.id() == *k)) {
                return Err(Error::UnknownVariable(foreign.to_string()));
            }
            for var in &scope {
                match a.get(var.id()) {
                    Some(x) if var.has_value(x) => {}
                    Some(x) => {
                        return Err(Error::InvalidDomain {
                            variable: var.id().to_string(),
                            reason: format!("table entry {} uses value {} outside the domain", a, x),
                        })
                    }
                    None => {
                        return Err(Error::InvalidDomain {
                            variable: var.id().to_string(),
                            reason: format!("table entry {} does not assign it", a),
                        })
                    }
                }
            }
            check_entry(&id, &a, v)?;
            if table.contains_key(&a) {
                return Err(Error::InvalidDomain {
                    variable: id.clone(),
                    reason: format!("table entry {} listed twice", a),
                });
            }
            table.insert(a, v);
        }
        let products = cartesian(&domain_of(&scope, |_| true, |_| true, |v| v));
        Ok(Self::assemble(id, scope, Potential::Table(table), products))
    }

    /// Conditional probability family `P(child | parents)`.
    ///
    /// `cpd(child_value, parent_assignment)` is evaluated once per joint
    /// assignment of the family.
    pub fn conditional<F>(
        id: impl Into<String>,
        child: VariableRef,
        parents: Vec<VariableRef>,
        cpd: F,
    ) -> Result<Self>
    where
        F: Fn(Value, &Assignment) -> f64,
    {
        let child_id = child.id().to_string();
        let mut scope = parents;
        scope.push(child);
        Self::from_fn(id, scope, |a| {
            let parents = a.without(&child_id);
            match a.get(&child_id) {
                Some(v) => cpd(v, &parents),
                None => 0.0,
            }
        })
    }

    /// Scope-free factor with a single value.
    pub fn constant(id: impl Into<String>, value: f64) -> Result<Self> {
        let id = id.into();
        check_entry(&id, &Assignment::new(), value)?;
        let mut table = BTreeMap::new();
        table.insert(Assignment::new(), value);
        Ok(Self::assemble(
            id,
            Vec::new(),
            Potential::Table(table),
            vec![Assignment::new()],
        ))
    }

    fn assemble(
        id: String,
        scope: Vec<VariableRef>,
        potential: Potential,
        scope_products: Vec<Assignment>,
    ) -> Self {
        let mut f = Self {
            id,
            scope,
            potential,
            scope_products,
            z: 0.0,
        };
        f.refresh_partition();
        f
    }

    /// Replace the scope products and recompute `Z`.
    fn set_products(&mut self, products: Vec<Assignment>) {
        self.scope_products = products;
        self.refresh_partition();
    }

    fn refresh_partition(&mut self) {
        self.z = self.scope_products.iter().map(|p| self.eval(p)).sum();
    }

    /// Evaluate on an assignment already known to lie in the scope.
    pub(crate) fn eval(&self, a: &Assignment) -> f64 {
        match &self.potential {
            Potential::MarginalProduct => a
                .iter()
                .map(|(id, v)| self.variable(id).map_or(0.0, |var| var.marginal(v)))
                .product(),
            Potential::Table(t) => t.get(a).copied().unwrap_or(0.0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Scope variables, sorted by id.
    pub fn scope(&self) -> &[VariableRef] {
        &self.scope
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = &str> {
        self.scope.iter().map(|v| v.id())
    }

    pub fn in_scope(&self, id: &str) -> bool {
        self.variable(id).is_some()
    }

    /// Scope variable with the given id.
    pub fn variable(&self, id: &str) -> Option<&VariableRef> {
        self.scope
            .binary_search_by(|v| v.id().cmp(id))
            .ok()
            .map(|i| &self.scope[i])
    }

    /// Joint assignments the factor is currently defined on.
    pub fn scope_products(&self) -> &[Assignment] {
        &self.scope_products
    }

    /// Partition value `Z`.
    pub fn partition(&self) -> f64 {
        self.z
    }

    /// True for a scope-free factor.
    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }

    /// Evaluate the factor on `a`.
    ///
    /// Marginal-product factors reject ids outside the scope and multiply
    /// the marginals of whatever subset is given. Table factors ignore
    /// foreign ids and return `0.0` when no entry matches.
    pub fn value(&self, a: &Assignment) -> Result<f64> {
        match &self.potential {
            Potential::MarginalProduct => {
                let mut p = 1.0;
                for (id, v) in a.iter() {
                    let var = self
                        .variable(id)
                        .ok_or_else(|| Error::UnknownVariable(id.to_string()))?;
                    p *= var.marginal(v);
                }
                Ok(p)
            }
            Potential::Table(t) => {
                let key = a.restricted(|id| self.in_scope(id));
                Ok(t.get(&key).copied().unwrap_or(0.0))
            }
        }
    }

    /// `value / Z`. A zero `Z` yields NaN or infinity, not an error.
    pub fn normalize(&self, value: f64) -> f64 {
        value / self.z
    }

    /// Normalized value of `a`.
    pub fn normalized_value(&self, a: &Assignment) -> Result<f64> {
        Ok(self.normalize(self.value(a)?))
    }

    /// `(assignment, value)` over the current scope products.
    pub fn table(&self) -> impl Iterator<Item = (&Assignment, f64)> + '_ {
        self.scope_products.iter().map(move |p| (p, self.eval(p)))
    }

    /// Best scope product; the first one wins ties.
    pub fn argmax(&self) -> Option<(Assignment, f64)> {
        let mut best: Option<(&Assignment, f64)> = None;
        for (a, v) in self.table() {
            if best.map_or(true, |(_, b)| v > b) {
                best = Some((a, v));
            }
        }
        best.map(|(a, v)| (a.clone(), v))
    }

    /// Largest value over the scope products (0.0 when there are none).
    pub fn max_value(&self) -> f64 {
        self.table().map(|(_, v)| v).fold(0.0, f64::max)
    }

    /// Domain of the scope after optional filtering and transform.
    pub fn domain_with<VF, XF, T>(&self, var_filter: VF, value_filter: XF, transform: T) -> Domain
    where
        VF: Fn(&dyn Variable) -> bool,
        XF: Fn(Value) -> bool,
        T: Fn(Value) -> Value,
    {
        domain_of(&self.scope, var_filter, value_filter, transform)
    }

    /// Unfiltered domain of the scope.
    pub fn domain(&self) -> Domain {
        self.domain_with(|_| true, |_| true, |v| v)
    }

    /// Scope variables implied by a set of assignments.
    ///
    /// Fails with [`Error::UnknownVariable`] if any assignment mentions an
    /// id outside this factor's scope.
    pub fn scope_of(&self, assignments: &[Assignment]) -> Result<Vec<VariableRef>> {
        let mut ids = std::collections::BTreeSet::new();
        for a in assignments {
            for id in a.ids() {
                if !self.in_scope(id) {
                    return Err(Error::UnknownVariable(id.to_string()));
                }
                ids.insert(id.to_string());
            }
        }
        Ok(self
            .scope
            .iter()
            .filter(|v| ids.contains(v.id()))
            .cloned()
            .collect())
    }

    /// Copy with every value multiplied by `k`.
    pub fn scaled(&self, k: f64) -> Factor {
        self.map_values(self.id.clone(), |v| v * k)
    }

    /// Divide by the largest value, returning the divisor.
    ///
    /// A factor whose values are all zero is left as is and `1.0` is returned.
    pub fn rescaled(&self) -> (Factor, f64) {
        let m = self.max_value();
        if m > 0.0 && m.is_finite() {
            (self.map_values(self.id.clone(), |v| v / m), m)
        } else {
            (self.clone(), 1.0)
        }
    }

    fn map_values<F: Fn(f64) -> f64>(&self, id: String, f: F) -> Factor {
        let table: BTreeMap<Assignment, f64> =
            self.table().map(|(a, v)| (a.clone(), f(v))).collect();
        Self::assemble(
            id,
            self.scope.clone(),
            Potential::Table(table),
            self.scope_products.clone(),
        )
    }

    /// Content hash over scope, scope products and values.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for id in self.scope_ids() {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
        }
        for (a, v) in self.table() {
            hasher.update(a.to_string().as_bytes());
            hasher.update(v.to_bits().to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl PartialEq for Factor {
    fn eq(&self, other: &Self) -> bool {
        self.scope_ids().eq(other.scope_ids())
            && self.scope_products == other.scope_products
            && self.table().zip(other.table()).all(|((_, x), (_, y))| x == y)
    }
}

/// Sort by id and reject duplicates and inadmissible domains.
fn canonical_scope(factor: &str, mut scope: Vec<VariableRef>) -> Result<Vec<VariableRef>> {
    for var in &scope {
        check_domain(var.as_ref())?;
    }
    scope.sort_by(|a, b| a.id().cmp(b.id()));
    if let Some(w) = scope.windows(2).find(|w| w[0].id() == w[1].id()) {
        return Err(Error::DuplicateVariable {
            variable: w[0].id().to_string(),
            factor: factor.to_string(),
        });
    }
    Ok(scope)
}

fn check_entry(factor: &str, a: &Assignment, v: f64) -> Result<()> {
    if v >= 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidDomain {
            variable: factor.to_string(),
            reason: format!("factor value {} at {} is not a nonnegative number", v, a),
        })
    }
}

/// Domain of an arbitrary variable set, after filtering and transform.
pub fn domain_of<VF, XF, T>(
    vars: &[VariableRef],
    var_filter: VF,
    value_filter: XF,
    transform: T,
) -> Domain
where
    VF: Fn(&dyn Variable) -> bool,
    XF: Fn(Value) -> bool,
    T: Fn(Value) -> Value,
{
    vars.iter()
        .filter(|v| var_filter(v.as_ref()))
        .map(|v| {
            let values = v
                .values()
                .iter()
                .copied()
                .filter(|x| value_filter(*x))
                .map(&transform)
                .collect();
            (v.id().to_string(), values)
        })
        .collect()
}

/// Every joint assignment of `domain`, first variable varying slowest.
///
/// An empty domain has exactly one joint assignment: the empty one.
pub fn cartesian(domain: &[(String, Vec<Value>)]) -> Vec<Assignment> {
    let mut out = vec![Assignment::new()];
    for (id, values) in domain {
        let mut next = Vec::with_capacity(out.len() * values.len());
        for prefix in &out {
            for v in values {
                next.push(prefix.clone().with(id.clone(), *v));
            }
        }
        out = next;
    }
    out
}
