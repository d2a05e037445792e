//! Default values shared by caches, learners and boosters.

/// Default budget, in bytes, for evictable cached columns.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 512 * 1024 * 1024;

/// Chunks of an `IndexSet` split when their density drops below this.
pub const DEFAULT_MINIMUM_SPARSITY: f64 = 0.5;

pub const DEFAULT_MAX_ITERATIONS:   usize = 100;
pub const DEFAULT_LEARNING_RATE:      f64 = 0.1;
pub const DEFAULT_TEMPERATURE:        f64 = 1.0;
pub const DEFAULT_COST_PENALTY:       f64 = 0.0;
pub const DEFAULT_MIN_EXAMPLES:     usize = 64;
pub const DEFAULT_POLICY_CANDIDATES: usize = 20;
pub const DEFAULT_POLICY_MAX_SIZE:   usize = 5;
pub const DEFAULT_RANDOM_CANDIDATES: usize = 50;
pub const DEFAULT_PATIENCE:         usize = 10;
pub const DEFAULT_SEED:               u64 = 1234;

/// Smoothing term added to branch weights before taking log-ratios.
pub const VOTE_SMOOTHING: f64 = 1e-9;

/// Tolerance used when comparing cached and recomputed values.
pub const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Minimum weight sum before normalization is skipped.
pub const MINIMAL_WEIGHT_SUM: f64 = 1e-100;
