//! Variable elimination (Koller & Friedman 2009, Alg. 9.1 and 13.1).
//!
//! # Algorithm
//!
//! For each variable in the order:
//! 1. Remove every working factor whose scope contains it
//! 2. Multiply them together
//! 3. Sum the variable out (sum-product) or maximize it out (max-product,
//!    recording the maximizer per surviving assignment)
//! 4. Put the result back into the working set
//!
//! A variable no factor mentions is skipped. After the last step the
//! remaining factors are multiplied into the answer.
//!
//! # Normalizer
//!
//! Long chains of products shrink values towards zero. With `rescale` on,
//! every intermediate factor is divided by its largest value and the
//! divisor is folded into a running [`LogScale`]. Scope-free intermediates
//! fold into the scale entirely. The final answer is scaled back, so the
//! observable values match direct-space arithmetic.
//!
//! # Traceback
//!
//! Max-product picks the best assignment of whatever survives elimination,
//! then walks the recorded maximizers from the last eliminated variable to
//! the first, reading each one off the assignment fixed so far.

use pgm_common::{Assignment, Error, Result, Value};
use pgm_config::EngineConfig;
use pgm_math::{log_sum_exp, safe_ln, LogScale};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use super::evidence::EvidenceSummary;
use crate::factor::Factor;
use crate::logging::Stage;

/// Diagnostics for one elimination step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EliminationStep {
    pub variable: String,
    /// Factors multiplied together in this step.
    pub consumed: usize,
    /// Scope size of the intermediate product.
    pub scope_width: usize,
    /// Scope products of the intermediate product.
    pub scope_products: usize,
}

/// Per-query lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EliminationState {
    Init,
    Eliminating(usize),
    Done,
}

impl fmt::Display for EliminationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EliminationState::Init => write!(f, "init"),
            EliminationState::Eliminating(i) => write!(f, "eliminating({})", i),
            EliminationState::Done => write!(f, "done"),
        }
    }
}

/// Sum-product answer.
#[derive(Debug, Clone)]
pub struct Marginal {
    /// Unnormalized answer over the query variables.
    pub factor: Factor,
    /// Partition value of the answer, i.e. the probability of the evidence.
    pub alpha: f64,
    /// `ln(alpha)`, exact even when `alpha` underflows.
    pub log_alpha: f64,
    pub steps: Vec<EliminationStep>,
    /// Evidence that reduced some factor, and evidence nothing mentioned.
    pub evidence: EvidenceSummary,
}

impl Marginal {
    /// Conditional probability of `a` given the evidence.
    pub fn conditional(&self, a: &Assignment) -> Result<f64> {
        self.factor.normalized_value(a)
    }

    /// `(assignment, unnormalized, conditional)` for every answer row.
    pub fn rows(&self) -> Vec<(Assignment, f64, f64)> {
        self.factor
            .table()
            .map(|(a, v)| (a.clone(), v, self.factor.normalize(v)))
            .collect()
    }
}

/// Max-product answer.
#[derive(Debug, Clone)]
pub struct Mpe {
    pub assignment: Assignment,
    /// Joint probability of `assignment`.
    pub probability: f64,
    pub log_probability: f64,
    pub steps: Vec<EliminationStep>,
    pub evidence: EvidenceSummary,
}

/// Maximizers recorded when one variable was maximized out.
#[derive(Debug, Clone)]
struct TracebackEntry {
    variable: String,
    scope: Vec<String>,
    argmax: BTreeMap<Assignment, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sum,
    Max,
}

/// Working state of one query.
struct Run {
    mode: Mode,
    state: EliminationState,
    factors: Vec<Factor>,
    log_scale: LogScale,
    steps: Vec<EliminationStep>,
    traceback: Vec<TracebackEntry>,
}

impl Run {
    fn new(mode: Mode, factors: Vec<Factor>) -> Self {
        let mut run = Self {
            mode,
            state: EliminationState::Init,
            factors: Vec::with_capacity(factors.len()),
            log_scale: LogScale::one(),
            steps: Vec::new(),
            traceback: Vec::new(),
        };
        for f in factors {
            if f.is_scalar() {
                run.log_scale.mul_value(f.partition());
            } else {
                run.factors.push(f);
            }
        }
        debug!(
            stage = %Stage::Eliminate,
            state = %run.state,
            factors = run.factors.len(),
            "elimination initialized"
        );
        run
    }

    fn transition(&mut self, next: EliminationState) {
        debug!(stage = %Stage::Eliminate, from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    /// Return a marginalized factor to the working set.
    fn absorb(&mut self, f: Factor, rescale: bool) {
        if f.is_scalar() {
            self.log_scale.mul_value(f.partition());
        } else if rescale {
            let (r, m) = f.rescaled();
            self.log_scale.mul_value(m);
            self.factors.push(r);
        } else {
            self.factors.push(f);
        }
    }
}

/// Multiply a factor list left to right; `None` when it is empty.
fn multiply_all(factors: Vec<Factor>) -> Result<Option<Factor>> {
    let mut it = factors.into_iter();
    let Some(first) = it.next() else {
        return Ok(None);
    };
    it.try_fold(first, |acc, f| acc.product(&f)).map(Some)
}

/// Variable-elimination engine.
#[derive(Debug, Clone)]
pub struct VariableElimination {
    rescale: bool,
    max_scope_products: usize,
}

impl Default for VariableElimination {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl VariableElimination {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            rescale: config.rescale,
            max_scope_products: config.max_scope_products,
        }
    }

    /// Sum out `order` and return the remaining answer.
    pub fn sum_product(&self, factors: Vec<Factor>, order: &[String]) -> Result<Marginal> {
        let run = self.run(Mode::Sum, factors, order)?;
        let log_scale = run.log_scale;

        let answer = match multiply_all(run.factors)? {
            Some(f) => f,
            None => Factor::constant("answer", 1.0)?,
        };
        let row_logs: Vec<f64> = answer.table().map(|(_, v)| safe_ln(v)).collect();
        let mut evidence_scale = LogScale::from_ln(log_sum_exp(&row_logs));
        evidence_scale.mul_scale(log_scale);
        let log_alpha = evidence_scale.ln();
        let factor = answer.scaled(log_scale.value());
        let alpha = factor.partition();
        if evidence_scale.is_zero() {
            warn!(stage = %Stage::Eliminate, "evidence has zero probability");
        }

        info!(
            stage = %Stage::Eliminate,
            alpha,
            log_alpha,
            answer_scope = factor.scope().len(),
            "sum-product complete"
        );
        Ok(Marginal {
            factor,
            alpha,
            log_alpha,
            steps: run.steps,
            evidence: EvidenceSummary::default(),
        })
    }

    /// Maximize out `order` and reconstruct the most probable assignment.
    pub fn max_product(&self, factors: Vec<Factor>, order: &[String]) -> Result<Mpe> {
        let run = self.run(Mode::Max, factors, order)?;
        let log_scale = run.log_scale;

        let (mut assignment, best) = match multiply_all(run.factors)? {
            Some(f) => f.argmax().unwrap_or_else(|| (Assignment::new(), 0.0)),
            None => (Assignment::new(), 1.0),
        };

        for entry in run.traceback.iter().rev() {
            let key = assignment.restricted(|id| entry.scope.iter().any(|s| s == id));
            if key.len() != entry.scope.len() {
                return Err(Error::Inference(format!(
                    "traceback for {} needs {:?} but only {} is fixed",
                    entry.variable, entry.scope, key
                )));
            }
            let value = entry.argmax.get(&key).copied().ok_or_else(|| {
                Error::Inference(format!(
                    "no maximizer recorded for {} at {}",
                    entry.variable, key
                ))
            })?;
            debug!(
                stage = %Stage::Traceback,
                variable = %entry.variable,
                value = %value,
                given = %key,
                "resolved maximizer"
            );
            assignment.insert(entry.variable.clone(), value);
        }

        let mut total = LogScale::from_value(best);
        total.mul_scale(log_scale);
        let probability = total.value();
        let log_probability = total.ln();
        if total.is_zero() {
            warn!(stage = %Stage::Traceback, "every assignment has zero probability");
        }
        info!(
            stage = %Stage::Traceback,
            probability,
            assignment = %assignment,
            "max-product complete"
        );
        Ok(Mpe {
            assignment,
            probability,
            log_probability,
            steps: run.steps,
            evidence: EvidenceSummary::default(),
        })
    }

    fn run(&self, mode: Mode, factors: Vec<Factor>, order: &[String]) -> Result<Run> {
        let mut run = Run::new(mode, factors);
        for (i, var) in order.iter().enumerate() {
            run.transition(EliminationState::Eliminating(i));
            self.eliminate(&mut run, var)?;
        }
        run.transition(EliminationState::Done);
        Ok(run)
    }

    fn eliminate(&self, run: &mut Run, var: &str) -> Result<()> {
        let (consumed, kept): (Vec<Factor>, Vec<Factor>) = std::mem::take(&mut run.factors)
            .into_iter()
            .partition(|f| f.in_scope(var));
        run.factors = kept;

        let n = consumed.len();
        let Some(joint) = multiply_all(consumed)? else {
            debug!(stage = %Stage::Eliminate, variable = var, "no factor mentions variable; skipping");
            run.steps.push(EliminationStep {
                variable: var.to_string(),
                consumed: 0,
                scope_width: 0,
                scope_products: 0,
            });
            return Ok(());
        };

        let step = EliminationStep {
            variable: var.to_string(),
            consumed: n,
            scope_width: joint.scope().len(),
            scope_products: joint.scope_products().len(),
        };
        if step.scope_products > self.max_scope_products {
            warn!(
                stage = %Stage::Eliminate,
                variable = var,
                scope_products = step.scope_products,
                limit = self.max_scope_products,
                "intermediate factor exceeds configured size"
            );
        }
        debug!(
            stage = %Stage::Eliminate,
            variable = var,
            consumed = n,
            scope_width = step.scope_width,
            scope_products = step.scope_products,
            "eliminating"
        );
        run.steps.push(step);

        let marginalized = match run.mode {
            Mode::Sum => joint.sumout(var)?,
            Mode::Max => {
                let m = joint.maxout(var)?;
                run.traceback.push(TracebackEntry {
                    variable: var.to_string(),
                    scope: m.factor.scope_ids().map(str::to_string).collect(),
                    argmax: m.argmax,
                });
                m.factor
            }
        };
        run.absorb(marginalized, self.rescale);
        Ok(())
    }
}
