//! Numerically stable primitives for log-domain factor arithmetic.

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    for v in values {
        sum += (*v - max).exp();
    }
    max + sum.ln()
}

/// Natural log that maps an exact zero to NEG_INFINITY.
///
/// Negative and NaN inputs yield NaN; factor values are never negative, so a
/// NaN here means a caller broke the nonnegativity precondition.
pub fn safe_ln(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    x.ln()
}

/// Approximate equality with an absolute floor and a relative band.
///
/// Infinities compare equal when they share a sign; NaN never compares equal.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sum_exp_basic() {
        let v = [0.0, 0.0];
        let out = log_sum_exp(&v);
        assert!(approx_eq(out, 2.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_sum_exp_dominance() {
        let v = [-1000.0, 0.0];
        let out = log_sum_exp(&v);
        assert!(approx_eq(out, 0.0, 1e-12));
    }

    #[test]
    fn log_sum_exp_all_neg_inf() {
        let v = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        let out = log_sum_exp(&v);
        assert!(out.is_infinite() && out.is_sign_negative());
    }

    #[test]
    fn log_sum_exp_empty_is_neg_inf() {
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn log_sum_exp_nan_propagates() {
        let out = log_sum_exp(&[0.0, f64::NAN]);
        assert!(out.is_nan());
    }

    #[test]
    fn log_sum_exp_matches_direct_sum() {
        let probs = [0.774_f64, 0.07];
        let logs: Vec<f64> = probs.iter().map(|p| p.ln()).collect();
        assert!(approx_eq(log_sum_exp(&logs).exp(), 0.844, 1e-12));
    }

    #[test]
    fn safe_ln_zero_and_negative() {
        assert_eq!(safe_ln(0.0), f64::NEG_INFINITY);
        assert!(safe_ln(-0.5).is_nan());
        assert!(approx_eq(safe_ln(1.0), 0.0, 1e-15));
    }

    #[test]
    fn approx_eq_relative_band() {
        assert!(approx_eq(1e12, 1e12 + 1.0, 1e-10));
        assert!(!approx_eq(1.0, 1.1, 1e-3));
        assert!(approx_eq(f64::NEG_INFINITY, f64::NEG_INFINITY, 1e-9));
        assert!(!approx_eq(f64::NAN, f64::NAN, 1.0));
    }
}
