//! Reduction of factors by observed evidence (Koller & Friedman 2009, §4.2.3).

use pgm_common::{Assignment, Error, Result};

use super::Factor;
use crate::variable::VariableRef;

impl Factor {
    /// Copy keeping only scope products that contain every evidence entry.
    ///
    /// The scope is unchanged. Evidence naming a variable outside the scope
    /// therefore leaves no products; use [`Factor::reduced_by_vars`] when
    /// the evidence spans several factors.
    pub fn reduced_by_value(&self, evidence: &Assignment) -> Factor {
        let mut out = self.clone();
        out.reduce_by_value(evidence);
        out
    }

    /// In-place form of [`Factor::reduced_by_value`].
    pub fn reduce_by_value(&mut self, evidence: &Assignment) {
        let kept = self
            .scope_products
            .iter()
            .filter(|p| p.is_superset_of(evidence))
            .cloned()
            .collect();
        self.set_products(kept);
    }

    /// Reduce by evidence stated over `context`, which may exceed the scope.
    ///
    /// Every evidence entry must name a context variable and one of its
    /// domain values, else [`Error::EvidenceOutOfDomain`]. The evidence is
    /// then narrowed to this factor's scope and inconsistent scope products
    /// are dropped.
    pub fn reduce_by_vars(&mut self, context: &[VariableRef], evidence: &Assignment) -> Result<()> {
        validate_evidence(context, evidence)?;
        let local = evidence.restricted(|id| self.in_scope(id));
        self.reduce_by_value(&local);
        Ok(())
    }

    /// Pure form of [`Factor::reduce_by_vars`].
    pub fn reduced_by_vars(&self, context: &[VariableRef], evidence: &Assignment) -> Result<Factor> {
        let mut out = self.clone();
        out.reduce_by_vars(context, evidence)?;
        Ok(out)
    }
}

/// Check that `evidence` is a valid instantiation of `context`.
pub(crate) fn validate_evidence(context: &[VariableRef], evidence: &Assignment) -> Result<()> {
    for (id, v) in evidence.iter() {
        let var = context.iter().find(|c| c.id() == id).ok_or_else(|| {
            Error::EvidenceOutOfDomain {
                evidence: format!("{}={}", id, v),
                reason: "variable is not part of the evidence context".to_string(),
            }
        })?;
        if !var.has_value(v) {
            return Err(Error::EvidenceOutOfDomain {
                evidence: format!("{}={}", id, v),
                reason: format!(
                    "value is outside the domain {:?}",
                    var.values().iter().map(|x| x.to_string()).collect::<Vec<_>>()
                ),
            });
        }
    }
    Ok(())
}
