use std::sync::Arc;

use crate::{
    IndexSet,
    LuapeInference,
    NodeId,
    Result,
    Type,
    Value,
    dispatch_indices,
};
use super::{BoostingObjective, WeakLearner};


/// A depth two decision tree over weak nodes.
///
/// The condition learner splits `examples`;
/// the branch learner then learns one node on the `false` rows
/// and one on the `true` rows.
/// Rows where the condition is missing predict missing.
pub struct BinaryTreeLearner {
    condition: Box<dyn WeakLearner>,
    branch: Box<dyn WeakLearner>,
}


impl BinaryTreeLearner {
    /// Learn conditions with `condition` and leaves with `branch`.
    pub fn new<C, B>(condition: C, branch: B) -> Self
        where C: WeakLearner + 'static,
              B: WeakLearner + 'static,
    {
        Self { condition: Box::new(condition), branch: Box::new(branch) }
    }


    fn learn_branch(
        &mut self,
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        rows: IndexSet,
    ) -> Result<NodeId>
    {
        if rows.is_empty() {
            return inference.universe_mut()
                .make_constant_node(Value::Missing, Type::Boolean);
        }
        let (node, _) = self.branch.learn(inference, objective, &Arc::new(rows))?;
        Ok(node)
    }
}


impl WeakLearner for BinaryTreeLearner {
    fn name(&self) -> &str {
        "Binary Tree"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        Some(vec![
            ("Condition", self.condition.name().to_string()),
            ("Branches", self.branch.name().to_string()),
        ])
    }


    fn initialize(&mut self, inference: &mut LuapeInference) -> Result<()> {
        self.condition.initialize(inference)?;
        self.branch.initialize(inference)
    }


    fn learn(
        &mut self,
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        examples: &Arc<IndexSet>,
    ) -> Result<(NodeId, f64)>
    {
        let (condition, _) = self.condition.learn(inference, objective, examples)?;
        let values = inference.training_samples(condition, examples);
        let (failure, success, _) = dispatch_indices(&values);

        let failure = self.learn_branch(inference, objective, failure)?;
        let success = self.learn_branch(inference, objective, success)?;
        let missing = inference.universe_mut()
            .make_constant_node(Value::Missing, Type::Boolean)?;
        let tree = inference.universe_mut()
            .make_test_node(condition, failure, success, missing)?;

        let predictions = inference.training_samples(tree, examples);
        let value = objective.weak_objective().compute(&predictions);
        Ok((tree, value))
    }
}
