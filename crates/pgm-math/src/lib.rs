//! Log-domain math utilities for the variable-elimination engine.

pub mod math;

pub use math::scale::LogScale;
pub use math::stable::*;
