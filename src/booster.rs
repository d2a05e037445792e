//! Provides the boosting algorithms.
//!
//! Each booster owns a [`LuapeInference`](crate::LuapeInference),
//! asks a weak learner for a boolean node at every round
//! and grafts it, together with the votes of its branches,
//! into the root sequence.

mod core;
mod graft;

// ------------------------------------------------
// Classification
mod adaboost;
mod adaboost_mh;

// ------------------------------------------------
// Regression
mod l2boost;

// ------------------------------------------------
// Ranking
mod ranking_boost;


/// Booster trait
pub use self::core::Booster;
pub use self::graft::Votes;

pub use self::adaboost::{AdaBoost, ExponentialLoss};
pub use self::adaboost_mh::{AdaBoostMH, MultiClassExponentialLoss};

pub use self::l2boost::{L2Boost, SquaredLoss};

pub use self::ranking_boost::RankingBoost;
