#![warn(missing_docs)]

//! 
//! A crate that grows typed expression trees by boosting.
//! 
//! An expression is a small symbolic program built from
//! input variables, constants, function applications,
//! ternary tests and reducing sequences.
//! All nodes live in a [`Universe`](crate::Universe) arena
//! that deduplicates structurally equal nodes.
//! 
//! Training happens over a [`SamplesCache`](crate::SamplesCache),
//! which materializes node values column by column over the training rows
//! and keeps them within a memory budget.
//! A boosting algorithm (e.g., [`AdaBoost`](crate::AdaBoost))
//! asks a weak learner for a new node at each round,
//! computes the votes of its branches,
//! and grafts the result into the root sequence of a
//! [`LuapeInference`](crate::LuapeInference).
//! 
//! ```no_run
//! use luape::prelude::*;
//! 
//! let sample = Sample::from_csv("train.csv", true)
//!     .unwrap()
//!     .set_target("class")
//!     .unwrap();
//! 
//! let mut inference = LuapeInference::from_sample(
//!     &sample, Task::BinaryClassification
//! ).unwrap();
//! inference.set_samples(&sample, None).unwrap();
//! 
//! let mut booster = AdaBoost::init(inference)
//!     .force_quit_at(100);
//! let mut weak_learner = SingleStump::init();
//! booster.run(&mut weak_learner).unwrap();
//! ```

pub mod constants;
pub mod error;
pub mod data_type;
pub mod index_set;
pub mod sample;
pub mod expression;
pub mod universe;
pub mod cache;
pub mod inference;
pub mod weak_learner;
pub mod booster;
pub mod research;
pub mod common;

/// Exports the standard boosting algorithms, weak learners and traits.
pub mod prelude;


pub use error::{LuapeError, Result};
pub use data_type::{Type, Value, Column, SparseVector};
pub use index_set::{IndexSet, IntersectionRegion};
pub use sample::{Sample, Feature};

pub use expression::{
    NodeId,
    Node,
    NodeKind,
    SequenceKind,
    Function,
    SequenceAccumulator,
};

pub use universe::Universe;

pub use cache::{
    SampleVector,
    SamplesCache,
    InstanceCache,
    dispatch_indices,
};

pub use inference::{
    Task,
    Dataset,
    LuapeInference,
};

pub use weak_learner::{
    WeakObjective,
    BoostingObjective,
    WeakLearner,
    CandidateGenerator,
    InputVariables,
    ExhaustiveFunctions,
    RandomFunctions,
    FiniteLearner,
    SingleStump,
    PolicyLearner,
    CompositeLearner,
    LaminatingLearner,
    BinaryTreeLearner,
};

pub use booster::{
    Booster,
    Votes,
    AdaBoost,
    AdaBoostMH,
    L2Boost,
    RankingBoost,
    ExponentialLoss,
    MultiClassExponentialLoss,
    SquaredLoss,
};

pub use research::{
    Callback,
    ConsoleCallback,
    RecordingCallback,
    NullCallback,
    EarlyStopping,
    Logger,
    Research,
};
