//! Caches of node values.
//!
//! A [`SamplesCache`] holds one column per cached node over a whole dataset
//! and evaluates uncached nodes in bulk over index subsets.
//! An [`InstanceCache`] memoizes node values for a single instance.

/// Lazy views over node values restricted to an index set.
pub mod sample_vector;

/// Per-dataset column cache with a memory budget.
pub mod samples_cache;

/// Per-instance memoization.
pub mod instance_cache;


pub use sample_vector::{SampleVector, SampleRef, SampleIter};
pub use samples_cache::{SamplesCache, dispatch_indices};
pub use instance_cache::InstanceCache;
