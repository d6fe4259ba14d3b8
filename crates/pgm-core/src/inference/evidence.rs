//! Evidence reduction over a factor set.
//!
//! Factors whose scope meets the evidence are restricted to consistent
//! scope products; the rest pass through untouched. Evidence that names no
//! scope variable is reported back rather than rejected.

use pgm_common::{Assignment, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::factor::{validate_evidence, Factor};
use crate::logging::Stage;
use crate::variable::VariableRef;

/// Outcome of reducing a factor set by evidence.
#[derive(Debug, Clone)]
pub struct EvidenceReduction {
    /// Reduced factors, in input order.
    pub factors: Vec<Factor>,
    /// Evidence entries that matched at least one scope.
    pub applied: Assignment,
    /// Evidence entries no factor mentions.
    pub unused: Assignment,
}

/// Summary of a reduction for reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvidenceSummary {
    pub applied: Assignment,
    pub unused: Assignment,
}

impl EvidenceReduction {
    pub fn summary(&self) -> EvidenceSummary {
        EvidenceSummary {
            applied: self.applied.clone(),
            unused: self.unused.clone(),
        }
    }
}

/// Restrict `factors` to scope products consistent with `evidence`.
///
/// Fails with `EvidenceOutOfDomain` when an evidence value lies outside
/// the domain of the variable it names.
pub fn reduce_factors(factors: Vec<Factor>, evidence: &Assignment) -> Result<EvidenceReduction> {
    let context = evidence_context(&factors, evidence);
    let applied = evidence.restricted(|id| context.iter().any(|v| v.id() == id));
    let unused = evidence.restricted(|id| !applied.contains(id));

    if !unused.is_empty() {
        warn!(
            stage = %Stage::Reduce,
            unused = %unused,
            "evidence names variables outside every factor scope; ignoring"
        );
    }
    validate_evidence(&context, &applied)?;

    let mut reduced = Vec::with_capacity(factors.len());
    for mut f in factors {
        if applied.ids().any(|id| f.in_scope(id)) {
            let before = f.scope_products().len();
            f.reduce_by_vars(&context, &applied)?;
            debug!(
                stage = %Stage::Reduce,
                factor = f.id(),
                before,
                after = f.scope_products().len(),
                "reduced factor by evidence"
            );
        }
        reduced.push(f);
    }

    Ok(EvidenceReduction {
        factors: reduced,
        applied,
        unused,
    })
}

/// Variables named by `evidence` that appear in some factor's scope.
fn evidence_context(factors: &[Factor], evidence: &Assignment) -> Vec<VariableRef> {
    let mut context: Vec<VariableRef> = Vec::new();
    for id in evidence.ids() {
        if let Some(var) = factors.iter().find_map(|f| f.variable(id)) {
            context.push(var.clone());
        }
    }
    context
}
