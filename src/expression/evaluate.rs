use crate::data_type::{Value, RAW_FALSE, RAW_TRUE};
use crate::universe::Universe;

use super::{NodeId, NodeKind, SequenceAccumulator};


/// What a node reads while being evaluated.
pub(crate) enum Operand {
    /// An input slot.
    Input(usize),
    /// Another node.
    Node(NodeId),
}


/// Evaluate `node` on one instance.
/// `operand` resolves input slots and child nodes,
/// so the same rules serve the raw and the memoized paths.
/// Only the branch selected by a test is evaluated.
pub(crate) fn evaluate_node<F>(
    universe: &Universe,
    node: NodeId,
    operand: &mut F,
) -> Value
    where F: FnMut(Operand) -> Value,
{
    let node_ref = universe.node(node);
    match node_ref.kind() {
        NodeKind::Variable { name, input_index } => {
            let value = operand(Operand::Input(*input_index));
            assert!(
                value.matches_type(node_ref.ty()),
                "input `{name}` expects {}, got {value:?}",
                node_ref.ty()
            );
            value
        },
        NodeKind::Constant(value) => value.clone(),
        NodeKind::Function { function, arguments } => {
            let args = arguments.iter()
                .map(|a| operand(Operand::Node(*a)))
                .collect::<Vec<_>>();
            function.compute(&args)
        },
        NodeKind::Test { condition, failure, success, missing } => {
            let branch = match operand(Operand::Node(*condition)).raw_boolean() {
                RAW_FALSE => *failure,
                RAW_TRUE => *success,
                _ => *missing,
            };
            operand(Operand::Node(branch))
        },
        NodeKind::Sequence { kind, children } => {
            let mut accumulator = SequenceAccumulator::new(kind, 1);
            for (i, child) in children.iter().enumerate() {
                let value = operand(Operand::Node(*child));
                accumulator.add_value(i, &value);
            }
            accumulator.value(0)
        },
    }
}
