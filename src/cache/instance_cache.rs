use std::collections::HashMap;

use crate::data_type::Value;
use crate::expression::NodeId;
use crate::expression::evaluate::{evaluate_node, Operand};
use crate::universe::Universe;


/// Memoized node values for a single instance.
#[derive(Debug, Clone, Default)]
pub struct InstanceCache {
    inputs: Vec<Value>,
    values: HashMap<NodeId, Value>,
}


impl InstanceCache {
    /// Construct a cache over the raw inputs of one instance.
    pub fn new(inputs: Vec<Value>) -> Self {
        Self { inputs, values: HashMap::new() }
    }


    /// Force the value of `node`.
    pub fn set(&mut self, node: NodeId, value: Value) {
        self.values.insert(node, value);
    }


    /// Number of memoized nodes.
    pub fn len(&self) -> usize {
        self.values.len()
    }


    /// Returns `true` if nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }


    /// Value of `node` for this instance.
    pub fn compute(&mut self, universe: &Universe, node: NodeId) -> Value {
        compute_memoized(universe, node, &self.inputs, &mut self.values)
    }
}


fn compute_memoized(
    universe: &Universe,
    node: NodeId,
    inputs: &[Value],
    values: &mut HashMap<NodeId, Value>,
) -> Value
{
    if let Some(value) = values.get(&node) {
        return value.clone();
    }
    let value = evaluate_node(universe, node, &mut |operand| match operand {
        Operand::Input(i) => inputs.get(i).cloned().unwrap_or_default(),
        Operand::Node(child) => compute_memoized(universe, child, inputs, values),
    });
    values.insert(node, value.clone());
    value
}
