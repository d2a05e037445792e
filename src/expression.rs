//! Typed symbolic expressions.
//!
//! Nodes are stored in a [`Universe`](crate::Universe) arena and referred to
//! through [`NodeId`] handles, so a tree never owns its children.

/// Node handles and node kinds.
pub mod node;

/// The closed set of pure functions a node may apply.
pub mod function;

/// Incremental accumulation of sequence outputs.
pub mod sequence;

/// Scalar evaluation shared by the raw and the memoized paths.
pub(crate) mod evaluate;


pub use node::{NodeId, Node, NodeKind, SequenceKind};
pub use function::Function;
pub use sequence::SequenceAccumulator;
