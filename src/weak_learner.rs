//! The files in `weak_learner/` directory define
//! the [`WeakLearner`] trait, the weak objectives it maximizes
//! and the weak learners.

/// Provides the `WeakLearner` trait.
pub mod core;

/// Provides the `WeakObjective` and `BoostingObjective` traits.
pub mod objective;

/// Defines candidate generators.
pub mod candidates;

pub(crate) mod scoring;

/// Defines weak learners over a finite set of candidates.
pub mod finite;

/// Defines the reverse Polish policy learner.
pub mod policy;

/// Defines the best-of-many learner.
pub mod composite;

/// Defines successive halving over candidates.
pub mod laminating;

/// Defines depth two trees over weak nodes.
pub mod binary_tree;


pub use self::core::WeakLearner;
pub use self::objective::{WeakObjective, BoostingObjective};
pub use self::candidates::{
    CandidateGenerator,
    InputVariables,
    ExhaustiveFunctions,
    RandomFunctions,
};
pub use self::finite::{FiniteLearner, SingleStump};
pub use self::policy::PolicyLearner;
pub use self::composite::CompositeLearner;
pub use self::laminating::LaminatingLearner;
pub use self::binary_tree::BinaryTreeLearner;
