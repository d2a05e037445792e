//! Defines some common functions used in this library.

/// Defines a running mean/variance accumulator.
pub mod stats;

/// Defines some useful numeric functions such as normalization.
pub mod utils;

/// Defines some checker functions.
pub(crate) mod checker;

pub use stats::ScalarStats;
