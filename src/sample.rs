//! Struct `Sample` represents a batch of examples stored column by column.

// Provides feature struct.
pub(crate) mod feature;
// Provides sample struct.
pub(crate) mod sample_struct;


pub use sample_struct::Sample;
pub use feature::Feature;
