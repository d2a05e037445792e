//! Error type shared by every fallible operation of this crate.

use thiserror::Error;

use crate::data_type::Type;


/// Errors raised while building expressions, loading data or learning.
#[derive(Debug, Error)]
pub enum LuapeError {
    /// A function or node received arguments of an unexpected type.
    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Where the mismatch occurred.
        context: String,
        /// Human readable description of the accepted type(s).
        expected: String,
        /// The type that was actually given.
        found: Type,
    },

    /// The weak learner could not produce any candidate.
    #[error("weak learner `{learner}` found no candidate: {reason}")]
    SearchFailure {
        /// Name of the weak learner.
        learner: String,
        /// Why the search failed.
        reason: String,
    },

    /// A named feature does not exist in the sample.
    #[error("feature `{0}` does not exist")]
    MissingFeature(String),

    /// An argument is outside of its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O failure while reading or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure raised by `polars`.
    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    /// Failure raised while (de)serializing JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}


impl LuapeError {
    pub(crate) fn type_mismatch<C, E>(context: C, expected: E, found: Type)
        -> Self
        where C: ToString,
              E: ToString,
    {
        Self::TypeMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            found,
        }
    }


    pub(crate) fn search_failure<L, R>(learner: L, reason: R) -> Self
        where L: ToString,
              R: ToString,
    {
        Self::SearchFailure {
            learner: learner.to_string(),
            reason: reason.to_string(),
        }
    }
}


/// Shorthand for results carrying a [`LuapeError`].
pub type Result<T> = std::result::Result<T, LuapeError>;
