//! Discrete random variables consumed by the factor algebra.
//!
//! The engine only needs three capabilities from a variable: a stable id,
//! an ordered finite domain and a marginal probability per domain value.
//! [`Variable`] captures exactly that; [`DiscreteVariable`] is the concrete
//! implementation used by model files and tests.

use pgm_common::{Assignment, Error, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A discrete random variable.
pub trait Variable: fmt::Debug + Send + Sync {
    /// Stable identifier, unique within a model.
    fn id(&self) -> &str;

    /// Ordered domain of the variable.
    fn values(&self) -> &[Value];

    /// Marginal probability of `value`; `0.0` outside the domain.
    fn marginal(&self, value: Value) -> f64;

    /// Whether `value` belongs to the domain.
    fn has_value(&self, value: Value) -> bool {
        self.values().contains(&value)
    }

    /// Single-variable assignments `{id = v}` for every domain value.
    fn value_set(&self) -> Vec<Assignment> {
        self.values()
            .iter()
            .map(|v| Assignment::new().with(self.id(), *v))
            .collect()
    }
}

/// Shared handle to a variable. Factors and networks share variables freely.
pub type VariableRef = Arc<dyn Variable>;

/// Reject domains containing negative or non-finite values.
pub fn check_domain(var: &dyn Variable) -> Result<()> {
    if let Some(bad) = var.values().iter().find(|v| !v.is_admissible()) {
        return Err(Error::InvalidDomain {
            variable: var.id().to_string(),
            reason: format!("value {} is negative or not finite", bad),
        });
    }
    Ok(())
}

/// A finite-domain variable with an explicit marginal table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteVariable {
    id: String,
    values: Vec<Value>,
    #[serde(with = "marginal_table")]
    marginal: BTreeMap<Value, f64>,
}

impl DiscreteVariable {
    /// Build from `(value, probability)` pairs in domain order.
    ///
    /// Fails with [`Error::InvalidDomain`] on a duplicated value, a
    /// negative or non-finite value, or a negative probability.
    pub fn new<V: Into<Value>>(
        id: impl Into<String>,
        table: impl IntoIterator<Item = (V, f64)>,
    ) -> Result<Self> {
        let id = id.into();
        let mut values = Vec::new();
        let mut marginal = BTreeMap::new();
        for (v, p) in table {
            let v = v.into();
            if !(p >= 0.0 && p.is_finite()) {
                return Err(Error::InvalidDomain {
                    variable: id.clone(),
                    reason: format!("probability {} for value {} is not a nonnegative number", p, v),
                });
            }
            if marginal.insert(v, p).is_some() {
                return Err(Error::InvalidDomain {
                    variable: id.clone(),
                    reason: format!("value {} listed twice", v),
                });
            }
            values.push(v);
        }
        let var = Self {
            id,
            values,
            marginal,
        };
        check_domain(&var)?;
        Ok(var)
    }

    /// Uniform marginal over the given domain.
    pub fn uniform<V: Into<Value>>(
        id: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let p = if values.is_empty() {
            0.0
        } else {
            1.0 / values.len() as f64
        };
        Self::new(id, values.into_iter().map(|v| (v, p)))
    }

    /// Boolean variable with `P(true) = p_true`.
    pub fn boolean(id: impl Into<String>, p_true: f64) -> Result<Self> {
        Self::new(id, [(true, p_true), (false, 1.0 - p_true)])
    }

    /// Convenience wrapper into a shared handle.
    pub fn shared(self) -> VariableRef {
        Arc::new(self)
    }
}

impl Variable for DiscreteVariable {
    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> &[Value] {
        &self.values
    }

    fn marginal(&self, value: Value) -> f64 {
        self.marginal.get(&value).copied().unwrap_or(0.0)
    }
}

/// Marginals serialize as a list of `[value, probability]` pairs since JSON
/// object keys must be strings.
mod marginal_table {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        table: &BTreeMap<Value, f64>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let pairs: Vec<(Value, f64)> = table.iter().map(|(v, p)| (*v, *p)).collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BTreeMap<Value, f64>, D::Error> {
        let pairs: Vec<(Value, f64)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_marginals() {
        let c = DiscreteVariable::boolean("C", 0.8).unwrap();
        assert_eq!(c.id(), "C");
        assert_eq!(c.values(), &[Value::TRUE, Value::FALSE]);
        assert!((c.marginal(Value::TRUE) - 0.8).abs() < 1e-12);
        assert!((c.marginal(Value::FALSE) - 0.2).abs() < 1e-12);
        assert_eq!(c.marginal(Value::new(7.0)), 0.0);
    }

    #[test]
    fn test_negative_domain_rejected() {
        let err = DiscreteVariable::new("x", [(-1.0, 0.5), (1.0, 0.5)]).unwrap_err();
        assert!(matches!(err, Error::InvalidDomain { .. }));
    }

    #[test]
    fn test_duplicate_value_rejected() {
        let err = DiscreteVariable::new("x", [(1.0, 0.5), (1.0, 0.5)]).unwrap_err();
        assert!(matches!(err, Error::InvalidDomain { .. }));
    }

    #[test]
    fn test_negative_probability_rejected() {
        assert!(DiscreteVariable::new("x", [(0.0, -0.1)]).is_err());
    }

    #[test]
    fn test_uniform() {
        let d = DiscreteVariable::uniform("d", [0u32, 1, 2, 3]).unwrap();
        assert_eq!(d.values().len(), 4);
        assert!((d.marginal(Value::from(2u32)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_value_set() {
        let a = DiscreteVariable::boolean("a", 0.6).unwrap();
        let vs = a.value_set();
        assert_eq!(vs.len(), 2);
        assert_eq!(vs[0], Assignment::new().with("a", true));
    }

    #[test]
    fn test_serde_round_trip() {
        let a = DiscreteVariable::boolean("a", 0.6).unwrap();
        let json = serde_json::to_string(&a).unwrap();
        let back: DiscreteVariable = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
