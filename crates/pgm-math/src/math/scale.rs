//! Running multiplicative scale kept in the log domain.
//!
//! Long elimination chains multiply many small normalizers together. Holding
//! the running product as a log keeps it representable long after the direct
//! product would have underflowed to zero.

use serde::Serialize;

use super::stable::safe_ln;

/// A nonnegative scalar stored as its natural log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogScale {
    log_value: f64,
}

impl LogScale {
    /// The multiplicative identity.
    pub fn one() -> Self {
        Self { log_value: 0.0 }
    }

    /// Build from a direct-space value.
    pub fn from_value(value: f64) -> Self {
        Self {
            log_value: safe_ln(value),
        }
    }

    /// Build from a log-space value.
    pub fn from_ln(log_value: f64) -> Self {
        Self { log_value }
    }

    /// Multiply by a direct-space value.
    pub fn mul_value(&mut self, value: f64) {
        self.log_value += safe_ln(value);
    }

    /// Multiply by another scale.
    pub fn mul_scale(&mut self, other: LogScale) {
        self.log_value += other.log_value;
    }

    /// Log of the running product.
    pub fn ln(&self) -> f64 {
        self.log_value
    }

    /// Direct-space value; may underflow to 0.0 even when `ln()` is finite.
    pub fn value(&self) -> f64 {
        self.log_value.exp()
    }

    /// True when some multiplicand was exactly zero.
    pub fn is_zero(&self) -> bool {
        self.log_value == f64::NEG_INFINITY
    }
}

impl Default for LogScale {
    fn default() -> Self {
        Self::one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::stable::approx_eq;

    #[test]
    fn one_is_identity() {
        let mut s = LogScale::one();
        s.mul_value(0.25);
        assert!(approx_eq(s.value(), 0.25, 1e-15));
    }

    #[test]
    fn chain_matches_direct_product() {
        let factors = [0.5, 0.99, 0.95, 0.98];
        let mut s = LogScale::one();
        for f in factors {
            s.mul_value(f);
        }
        let direct: f64 = factors.iter().product();
        assert!(approx_eq(s.value(), direct, 1e-12));
    }

    #[test]
    fn zero_multiplicand_is_absorbing() {
        let mut s = LogScale::from_value(3.0);
        s.mul_value(0.0);
        assert!(s.is_zero());
        s.mul_value(10.0);
        assert!(s.is_zero());
        assert_eq!(s.value(), 0.0);
    }

    #[test]
    fn survives_underflow_of_direct_product() {
        let mut s = LogScale::one();
        for _ in 0..2000 {
            s.mul_value(1e-3);
        }
        assert_eq!(s.value(), 0.0);
        assert!(s.ln().is_finite());
        assert!(approx_eq(s.ln(), 2000.0 * 1e-3f64.ln(), 1e-9));
    }

    #[test]
    fn mul_scale_adds_logs() {
        let mut a = LogScale::from_value(2.0);
        a.mul_scale(LogScale::from_ln(3.0f64.ln()));
        assert!(approx_eq(a.value(), 6.0, 1e-12));
    }

    #[test]
    fn serializes_log_value() {
        let s = LogScale::from_ln(-1.5);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"log_value":-1.5}"#);
    }
}
