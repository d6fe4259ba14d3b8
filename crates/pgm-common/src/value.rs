//! Domain values of discrete random variables.
//!
//! Values are real numbers so that boolean, integer and coded categorical
//! outcomes share one representation. They carry a total order and a hash so
//! assignments built from them can key lookup tables.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A single outcome of a discrete variable.
#[derive(Debug, Clone, Copy)]
pub struct Value(f64);

impl Value {
    /// Outcome conventionally used for `true`.
    pub const TRUE: Value = Value(1.0);
    /// Outcome conventionally used for `false`.
    pub const FALSE: Value = Value(0.0);

    /// Wrap a raw number. Negative zero is folded into zero.
    pub fn new(raw: f64) -> Self {
        if raw == 0.0 {
            Value(0.0)
        } else {
            Value(raw)
        }
    }

    /// The underlying number.
    pub fn get(self) -> f64 {
        self.0
    }

    /// Whether this value may appear in a factor's domain (finite and >= 0).
    pub fn is_admissible(self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Value {
    fn from(raw: f64) -> Self {
        Value::new(raw)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b {
            Value::TRUE
        } else {
            Value::FALSE
        }
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::new(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::new(f64::from(n))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_finite() && self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{:.0}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Value {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" => Ok(Value::TRUE),
            "false" | "f" | "no" => Ok(Value::FALSE),
            other => other
                .parse::<f64>()
                .map(Value::new)
                .map_err(|_| format!("invalid value: {}", s)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

/// Model files may spell boolean outcomes as JSON booleans.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Number(f64),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawValue::deserialize(deserializer)? {
            RawValue::Bool(b) => Value::from(b),
            RawValue::Number(n) => Value::new(n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn negative_zero_equals_zero() {
        assert_eq!(Value::new(-0.0), Value::new(0.0));
        let mut set = HashSet::new();
        set.insert(Value::new(-0.0));
        assert!(set.contains(&Value::FALSE));
    }

    #[test]
    fn admissibility() {
        assert!(Value::new(0.0).is_admissible());
        assert!(Value::new(3.5).is_admissible());
        assert!(!Value::new(-1.0).is_admissible());
        assert!(!Value::new(f64::NAN).is_admissible());
        assert!(!Value::new(f64::INFINITY).is_admissible());
    }

    #[test]
    fn ordering_is_numeric() {
        let mut v = vec![Value::new(2.0), Value::FALSE, Value::TRUE];
        v.sort();
        assert_eq!(v, vec![Value::FALSE, Value::TRUE, Value::new(2.0)]);
    }

    #[test]
    fn display_integral_and_fractional() {
        assert_eq!(Value::TRUE.to_string(), "1");
        assert_eq!(Value::new(2.5).to_string(), "2.5");
    }

    #[test]
    fn parse_booleans_and_numbers() {
        assert_eq!("true".parse::<Value>().unwrap(), Value::TRUE);
        assert_eq!("F".parse::<Value>().unwrap(), Value::FALSE);
        assert_eq!("3".parse::<Value>().unwrap(), Value::new(3.0));
        assert!("maybe".parse::<Value>().is_err());
    }

    #[test]
    fn deserialize_bool_or_number() {
        let vs: Vec<Value> = serde_json::from_str("[true, false, 2]").unwrap();
        assert_eq!(vs, vec![Value::TRUE, Value::FALSE, Value::new(2.0)]);
        assert_eq!(serde_json::to_string(&Value::TRUE).unwrap(), "1.0");
    }
}
