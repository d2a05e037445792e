//! This directory provides some features for research.
//! Per iteration of a boosting algorithm, the followings are reported:
//! - Weak objective
//! - Training and validation scores
//! - Cache size
//! - Running time

/// Defines the `Callback` trait and simple callbacks.
pub mod callback;

/// Defines a callback that stops a booster.
pub mod early_stopping;

/// Defines `Logger` and the `Research` trait.
pub mod logger;

pub use callback::{
    Callback,
    ConsoleCallback,
    RecordingCallback,
    NullCallback,
};
pub(crate) use callback::Callbacks;
pub use early_stopping::EarlyStopping;
pub use logger::{Logger, Research};
