//! Canonical variable assignments.
//!
//! An assignment maps variable ids to values. Entries are kept sorted by id,
//! so two assignments over the same variables compare and hash equal no
//! matter the insertion order. That lets assignments key factor tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// A mapping from variable id to value with a canonical ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(BTreeMap<String, Value>);

impl Assignment {
    /// The empty assignment.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(id, value);
        self
    }

    /// Insert or overwrite one entry.
    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(id.into(), value.into());
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.0.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Variable ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True when every entry of `other` appears here with the same value.
    pub fn is_superset_of(&self, other: &Assignment) -> bool {
        other.iter().all(|(id, v)| self.get(id) == Some(v))
    }

    /// True when the two assignments agree on every shared id.
    pub fn consistent_with(&self, other: &Assignment) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .iter()
            .all(|(id, v)| large.get(id).map_or(true, |w| w == v))
    }

    /// Union of two consistent assignments; `None` if they disagree.
    pub fn merged(&self, other: &Assignment) -> Option<Assignment> {
        if !self.consistent_with(other) {
            return None;
        }
        let mut out = self.clone();
        for (id, v) in other.iter() {
            out.0.insert(id.to_string(), v);
        }
        Some(out)
    }

    /// Keep only the entries whose id passes `keep`.
    pub fn restricted<F>(&self, keep: F) -> Assignment
    where
        F: Fn(&str) -> bool,
    {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| keep(k.as_str()))
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        )
    }

    /// Copy without one id.
    pub fn without(&self, id: &str) -> Assignment {
        self.restricted(|k| k != id)
    }
}

impl<K, V> FromIterator<(K, V)> for Assignment
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (id, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", id, v)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ab(a: bool, b: bool) -> Assignment {
        Assignment::new().with("a", a).with("b", b)
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let x = Assignment::new().with("b", true).with("a", false);
        let y = Assignment::new().with("a", false).with("b", true);
        assert_eq!(x, y);

        let mut table = HashMap::new();
        table.insert(x, 0.5);
        assert_eq!(table.get(&y), Some(&0.5));
    }

    #[test]
    fn test_superset_and_consistency() {
        let full = ab(true, false);
        let part = Assignment::new().with("a", true);
        assert!(full.is_superset_of(&part));
        assert!(!part.is_superset_of(&full));
        assert!(full.is_superset_of(&Assignment::new()));

        let other = Assignment::new().with("a", true).with("c", true);
        assert!(full.consistent_with(&other));
        assert!(!full.consistent_with(&Assignment::new().with("b", true)));
    }

    #[test]
    fn test_merge() {
        let left = Assignment::new().with("a", true);
        let right = Assignment::new().with("b", false);
        assert_eq!(left.merged(&right), Some(ab(true, false)));
        assert_eq!(left.merged(&Assignment::new().with("a", false)), None);
    }

    #[test]
    fn test_restrict_and_without() {
        let x = ab(true, true).with("c", false);
        assert_eq!(x.without("c"), ab(true, true));
        assert_eq!(x.restricted(|id| id == "a").len(), 1);
    }

    #[test]
    fn test_display_and_serde() {
        let x = ab(true, false);
        assert_eq!(x.to_string(), "{a=1, b=0}");
        let json = serde_json::to_string(&x).unwrap();
        assert_eq!(json, r#"{"a":1.0,"b":0.0}"#);
        let back: Assignment = serde_json::from_str(r#"{"b":false,"a":true}"#).unwrap();
        assert_eq!(back, x);
    }

    #[test]
    fn test_from_iter() {
        let x: Assignment = vec![("a", true), ("b", false)].into_iter().collect();
        assert_eq!(x, ab(true, false));
    }
}
