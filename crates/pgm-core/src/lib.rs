//! Exact inference for discrete probabilistic graphical models.
//!
//! - [`variable`] and [`network`]: the model abstractions queries consume
//! - [`factor`]: factor algebra (product, reduction, marginalization)
//! - [`inference`]: evidence reduction, elimination ordering, sum-product
//!   and max-product variable elimination
//! - [`model`]: JSON model files
//! - [`logging`] and [`exit_codes`]: support for the `pgm` binary
//!
//! The binary entry point is in `main.rs`.

pub mod exit_codes;
pub mod factor;
pub mod inference;
pub mod logging;
pub mod model;
pub mod network;
pub mod variable;

pub use factor::{Factor, MaxOut};
pub use inference::{max_product_query, sum_product_query, Marginal, Mpe, QueryEngine};
pub use model::Model;
pub use network::{build_default_factors, Edge, Graph, Network};
pub use variable::{DiscreteVariable, Variable, VariableRef};
