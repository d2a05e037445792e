//! The node arena.
//!
//! A [`Universe`] owns every node built during a learning run.
//! Structurally equal constants and function applications are interned,
//! so two candidates built independently by a weak learner
//! share one [`NodeId`], one cache entry and one importance score.
//! The universe also tracks how long each kind of node takes to compute.
use serde::{Serialize, Deserialize};

use std::collections::HashMap;
use std::sync::Mutex;

use crate::data_type::{Type, Value, ValueKey};
use crate::expression::{
    NodeId,
    Node,
    NodeKind,
    SequenceKind,
    Function,
};
use crate::expression::evaluate::{evaluate_node, Operand};
use crate::common::ScalarStats;
use crate::error::{LuapeError, Result};


type FunctionKey = (&'static str, Option<u64>, Vec<NodeId>);
type TimeKey = (&'static str, &'static str);


/// Arena of expression nodes with interning and cost statistics.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Universe {
    nodes: Vec<Node>,
    constant_folding: bool,

    #[serde(skip)]
    functions: HashMap<FunctionKey, NodeId>,
    #[serde(skip)]
    constants: HashMap<(ValueKey, Type), NodeId>,
    #[serde(skip)]
    variables: HashMap<usize, NodeId>,
    #[serde(skip)]
    computing_times: Mutex<HashMap<TimeKey, ScalarStats>>,
}


impl Universe {
    /// Construct an empty universe that interns without simplifying.
    pub fn new() -> Self {
        Self::default()
    }


    /// Enable constant folding and argument sorting of
    /// commutative functions before interning.
    pub fn constant_folding(mut self, flag: bool) -> Self {
        self.constant_folding = flag;
        self
    }


    /// Number of allocated nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }


    /// Returns `true` if no node has been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }


    /// The node behind `id`.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }


    /// Type of the node behind `id`.
    pub fn type_of(&self, id: NodeId) -> Type {
        self.nodes[id.0].ty
    }


    /// Iterate over every node with its handle.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }


    fn allocate(&mut self, kind: NodeKind, ty: Type) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, ty));
        id
    }


    /// Get or create the variable reading input slot `input_index`.
    pub fn make_variable_node<S>(&mut self, name: S, ty: Type, input_index: usize)
        -> Result<NodeId>
        where S: ToString,
    {
        if let Some(&id) = self.variables.get(&input_index) {
            let existing = self.type_of(id);
            if existing != ty {
                return Err(LuapeError::type_mismatch(
                    format!("input slot {input_index}"), existing, ty,
                ));
            }
            return Ok(id);
        }
        let kind = NodeKind::Variable { name: name.to_string(), input_index };
        let id = self.allocate(kind, ty);
        self.variables.insert(input_index, id);
        Ok(id)
    }


    /// Get or create the constant `value` of type `ty`.
    pub fn make_constant_node(&mut self, value: Value, ty: Type)
        -> Result<NodeId>
    {
        if !value.matches_type(ty) {
            let found = value.natural_type().unwrap_or(ty);
            return Err(LuapeError::type_mismatch("constant", ty, found));
        }
        let value = if value.is_missing() { Value::Missing } else { value };
        let key = (value.key(), ty);
        if let Some(&id) = self.constants.get(&key) {
            return Ok(id);
        }
        let id = self.allocate(NodeKind::Constant(value), ty);
        self.constants.insert(key, id);
        Ok(id)
    }


    /// Get or create the application of `function` to `arguments`.
    pub fn make_function_node(&mut self, function: Function, arguments: Vec<NodeId>)
        -> Result<NodeId>
    {
        let types = arguments.iter()
            .map(|a| self.type_of(*a))
            .collect::<Vec<_>>();
        let ty = function.initialize(&types)?;

        let (function, arguments) = self.canonize_node(function, arguments);
        if self.constant_folding {
            let values = arguments.iter()
                .map(|a| self.node(*a).as_constant().cloned())
                .collect::<Option<Vec<_>>>();
            if let Some(values) = values {
                let value = function.compute(&values);
                return self.make_constant_node(value, ty);
            }
        }

        let key = (function.name(), function.parameter_bits(), arguments.clone());
        if let Some(&id) = self.functions.get(&key) {
            return Ok(id);
        }
        let id = self.allocate(NodeKind::Function { function, arguments }, ty);
        self.functions.insert(key, id);
        Ok(id)
    }


    /// Normalize a function application before interning.
    /// This is the identity unless constant folding is enabled,
    /// in which case commutative arguments are sorted.
    pub fn canonize_node(&self, function: Function, mut arguments: Vec<NodeId>)
        -> (Function, Vec<NodeId>)
    {
        if self.constant_folding && function.is_commutative() {
            arguments.sort_unstable();
        }
        (function, arguments)
    }


    /// Create a test routing to `failure`, `success` or `missing`
    /// depending on the boolean `condition`.
    pub fn make_test_node(
        &mut self,
        condition: NodeId,
        failure: NodeId,
        success: NodeId,
        missing: NodeId,
    ) -> Result<NodeId>
    {
        let condition_type = self.type_of(condition);
        if !condition_type.is_boolean() {
            return Err(LuapeError::type_mismatch(
                "test condition", Type::Boolean, condition_type,
            ));
        }
        let ty = self.type_of(success);
        for branch in [failure, missing] {
            let branch_type = self.type_of(branch);
            if branch_type != ty {
                return Err(LuapeError::type_mismatch("test branch", ty, branch_type));
            }
        }
        let kind = NodeKind::Test { condition, failure, success, missing };
        Ok(self.allocate(kind, ty))
    }


    /// Create a sequence node.
    pub fn make_sequence_node(&mut self, kind: SequenceKind, children: Vec<NodeId>)
        -> Result<NodeId>
    {
        if let SequenceKind::VectorSum { n: 0, .. } = kind {
            return Err(LuapeError::InvalidArgument(
                "a vector sum needs a positive dimension".into()
            ));
        }
        for child in children.iter() {
            self.check_sequence_child(&kind, *child)?;
        }
        let ty = kind.output_type();
        Ok(self.allocate(NodeKind::Sequence { kind, children }, ty))
    }


    fn check_sequence_child(&self, kind: &SequenceKind, child: NodeId)
        -> Result<()>
    {
        let ty = self.type_of(child);
        if kind.accepts(ty) {
            Ok(())
        } else {
            let expected = match kind {
                SequenceKind::VectorSum { n, .. } => Type::DoubleVector(*n).to_string(),
                _ => "double or integer".to_string(),
            };
            Err(LuapeError::type_mismatch(kind.name(), expected, ty))
        }
    }


    /// Append `child` to `sequence`. Returns the index of the new child.
    ///
    /// Cached outputs of `sequence` are not updated here;
    /// see [`SamplesCache::observe_new_child`](crate::SamplesCache::observe_new_child).
    pub fn push_sequence_child(&mut self, sequence: NodeId, child: NodeId)
        -> Result<usize>
    {
        assert!(child.0 < self.nodes.len(), "unknown node {child}");
        let kind = match self.node(sequence).kind() {
            NodeKind::Sequence { kind, .. } => kind.clone(),
            other => {
                return Err(LuapeError::InvalidArgument(format!(
                    "node {sequence} is a {}, not a sequence", other.tag()
                )));
            },
        };
        self.check_sequence_child(&kind, child)?;
        match &mut self.nodes[sequence.0].kind {
            NodeKind::Sequence { children, .. } => {
                children.push(child);
                Ok(children.len() - 1)
            },
            _ => unreachable!("checked above"),
        }
    }


    /// Add `importance` to `node` and to every node below it.
    pub fn add_importance(&mut self, node: NodeId, importance: f64) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.importance += importance;
            stack.extend(node.kind.children());
        }
    }


    /// The `k` most important variable and function nodes.
    pub fn most_important_nodes(&self, k: usize) -> Vec<(NodeId, f64)> {
        let mut nodes = self.nodes()
            .filter(|(_, n)| {
                matches!(n.kind, NodeKind::Variable { .. } | NodeKind::Function { .. })
            })
            .filter(|(_, n)| n.importance > 0.0)
            .map(|(id, n)| (id, n.importance))
            .collect::<Vec<_>>();
        nodes.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        nodes.truncate(k);
        nodes
    }


    fn time_key(&self, node: NodeId) -> TimeKey {
        let kind = self.node(node).kind();
        let function = match kind {
            NodeKind::Function { function, .. } => function.name(),
            NodeKind::Sequence { kind, .. } => kind.name(),
            _ => "",
        };
        (kind.tag(), function)
    }


    /// Record that computing `node` took `time_per_element`
    /// (microseconds per row).
    pub fn observe_node_computing_time(&self, node: NodeId, time_per_element: f64) {
        let key = self.time_key(node);
        if let Ok(mut times) = self.computing_times.lock() {
            times.entry(key).or_default().push(time_per_element);
        }
    }


    /// Statistics of the observed computing times of the kind of `node`.
    pub fn computing_time_stats(&self, node: NodeId) -> Option<ScalarStats> {
        let key = self.time_key(node);
        self.computing_times.lock().ok()?.get(&key).copied()
    }


    /// Expected time per row to compute `node` from its leaves:
    /// the sum of the mean observed times of the kinds along the tree.
    pub fn expected_computing_time(&self, node: NodeId) -> f64 {
        let times = match self.computing_times.lock() {
            Ok(times) => times,
            Err(_) => return 0.0,
        };
        let mut total = 0.0;
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let kind = self.node(id).kind();
            if let NodeKind::Variable { .. } | NodeKind::Constant(_) = kind {
                continue;
            }
            total += times.get(&self.time_key(id)).map_or(0.0, |s| s.mean());
            stack.extend(kind.children());
        }
        total
    }


    /// Evaluate `node` on one instance given its raw inputs.
    pub fn compute(&self, node: NodeId, inputs: &[Value]) -> Value {
        evaluate_node(self, node, &mut |operand| match operand {
            Operand::Input(i) => inputs.get(i).cloned().unwrap_or_default(),
            Operand::Node(child) => self.compute(child, inputs),
        })
    }


    /// Render `node` as a readable formula.
    pub fn to_short_string(&self, node: NodeId) -> String {
        match self.node(node).kind() {
            NodeKind::Variable { name, .. } => name.clone(),
            NodeKind::Constant(value) => value.to_string(),
            NodeKind::Function { function, arguments } => {
                let args = arguments.iter()
                    .map(|a| self.to_short_string(*a))
                    .collect::<Vec<_>>();
                function.to_short_string(&args)
            },
            NodeKind::Test { condition, failure, success, missing } => {
                format!(
                    "({} ? {} : {} | {})",
                    self.to_short_string(*condition),
                    self.to_short_string(*success),
                    self.to_short_string(*failure),
                    self.to_short_string(*missing),
                )
            },
            NodeKind::Sequence { kind, children } => {
                let children = children.iter()
                    .map(|c| self.to_short_string(*c))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}[{children}]", kind.name())
            },
        }
    }


    /// Serialize the arena.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }


    /// Deserialize an arena and rebuild its interning tables.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut universe = serde_json::from_str::<Self>(json)?;
        universe.rebuild_tables();
        Ok(universe)
    }


    pub(crate) fn rebuild_tables(&mut self) {
        self.functions.clear();
        self.constants.clear();
        self.variables.clear();
        for (i, node) in self.nodes.iter().enumerate() {
            let id = NodeId(i);
            match &node.kind {
                NodeKind::Variable { input_index, .. } => {
                    self.variables.insert(*input_index, id);
                },
                NodeKind::Constant(value) => {
                    self.constants.insert((value.key(), node.ty), id);
                },
                NodeKind::Function { function, arguments } => {
                    let key = (function.name(), function.parameter_bits(), arguments.clone());
                    self.functions.insert(key, id);
                },
                _ => {},
            }
        }
    }
}
