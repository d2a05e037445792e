use serde::{Serialize, Deserialize};

use std::fmt;

use crate::data_type::{Type, Value};


/// Handle to a node of a [`Universe`](crate::Universe).
/// The handle is also the allocation index of the node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize,
)]
pub struct NodeId(pub(crate) usize);


impl NodeId {
    /// Allocation index of this node.
    pub fn index(&self) -> usize {
        self.0
    }
}


impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}


/// The reduction performed by a sequence node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequenceKind {
    /// Sum of scalar children.
    ScalarSum {
        /// Map the result through the logistic sigmoid.
        convert_to_probabilities: bool,
        /// Divide the sum by the number of children.
        compute_average: bool,
    },
    /// Element-wise sum of vector children.
    VectorSum {
        /// Dimension of the children.
        n: usize,
        /// Squash each element then normalize the vector.
        convert_to_probabilities: bool,
    },
    /// Child `i` becomes entry `i` of a sparse vector.
    CreateSparseVector,
}


impl SequenceKind {
    /// Output type of the sequence.
    pub fn output_type(&self) -> Type {
        match self {
            Self::ScalarSum { .. } => Type::Double,
            Self::VectorSum { n, .. } => Type::DoubleVector(*n),
            Self::CreateSparseVector => Type::SparseVector,
        }
    }


    /// Returns `true` if a child of type `ty` can be appended.
    pub fn accepts(&self, ty: Type) -> bool {
        match self {
            Self::ScalarSum { .. } | Self::CreateSparseVector => ty.is_numeric(),
            Self::VectorSum { n, .. } => ty == Type::DoubleVector(*n),
        }
    }


    /// Short name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScalarSum { .. } => "sum",
            Self::VectorSum { .. } => "vsum",
            Self::CreateSparseVector => "sparse",
        }
    }
}


/// The content of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Reference to an input slot.
    Variable {
        /// Name of the input.
        name: String,
        /// Index of the input slot.
        input_index: usize,
    },
    /// A fixed value.
    Constant(Value),
    /// Application of a pure function.
    Function {
        /// The applied function.
        function: super::Function,
        /// Argument nodes.
        arguments: Vec<NodeId>,
    },
    /// Ternary test on a boolean condition.
    Test {
        /// Boolean condition.
        condition: NodeId,
        /// Node evaluated when the condition is `false`.
        failure: NodeId,
        /// Node evaluated when the condition is `true`.
        success: NodeId,
        /// Node evaluated when the condition is missing.
        missing: NodeId,
    },
    /// A growing list of children reduced into one value.
    Sequence {
        /// The reduction.
        kind: SequenceKind,
        /// Children, in insertion order.
        children: Vec<NodeId>,
    },
}


impl NodeKind {
    /// The nodes this node reads.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Variable { .. } | Self::Constant(_) => Vec::new(),
            Self::Function { arguments, .. } => arguments.clone(),
            Self::Test { condition, failure, success, missing } => {
                vec![*condition, *failure, *success, *missing]
            },
            Self::Sequence { children, .. } => children.clone(),
        }
    }


    /// Kind tag used as a statistics key.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Variable { .. } => "variable",
            Self::Constant(_) => "constant",
            Self::Function { .. } => "function",
            Self::Test { .. } => "test",
            Self::Sequence { .. } => "sequence",
        }
    }
}


/// A typed node of an expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) ty: Type,
    pub(crate) importance: f64,
}


impl Node {
    pub(crate) fn new(kind: NodeKind, ty: Type) -> Self {
        Self { kind, ty, importance: 0.0 }
    }


    /// The content of this node.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }


    /// The type of every value this node produces.
    pub fn ty(&self) -> Type {
        self.ty
    }


    /// Accumulated relevance of this node.
    pub fn importance(&self) -> f64 {
        self.importance
    }


    /// The value of a constant node.
    pub fn as_constant(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Constant(value) => Some(value),
            _ => None,
        }
    }


    /// Returns `true` for variable nodes.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, NodeKind::Variable { .. })
    }
}
