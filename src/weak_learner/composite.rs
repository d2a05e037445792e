use std::sync::Arc;

use crate::{
    IndexSet,
    LuapeError,
    LuapeInference,
    NodeId,
    Result,
};
use super::{BoostingObjective, WeakLearner};


/// Runs each of its weak learners and keeps the best node.
/// Sub-learners that find nothing are skipped;
/// the search fails only when all of them fail.
#[derive(Default)]
pub struct CompositeLearner {
    learners: Vec<Box<dyn WeakLearner>>,
}


impl CompositeLearner {
    /// Construct an empty composite learner.
    pub fn new() -> Self {
        Self::default()
    }


    /// Add a sub-learner.
    pub fn push<W: WeakLearner + 'static>(mut self, learner: W) -> Self {
        self.learners.push(Box::new(learner));
        self
    }


    /// Number of sub-learners.
    pub fn len(&self) -> usize {
        self.learners.len()
    }


    /// Returns `true` if there is no sub-learner.
    pub fn is_empty(&self) -> bool {
        self.learners.is_empty()
    }
}


impl WeakLearner for CompositeLearner {
    fn name(&self) -> &str {
        "Composite"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let info = self.learners.iter()
            .enumerate()
            .map(|(i, l)| ("Learner", format!("[{i}] {}", l.name())))
            .collect::<Vec<_>>();
        Some(info)
    }


    fn initialize(&mut self, inference: &mut LuapeInference) -> Result<()> {
        self.learners.iter_mut()
            .try_for_each(|learner| learner.initialize(inference))
    }


    fn learn(
        &mut self,
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        examples: &Arc<IndexSet>,
    ) -> Result<(NodeId, f64)>
    {
        let mut best: Option<(NodeId, f64)> = None;
        for learner in self.learners.iter_mut() {
            match learner.learn(inference, objective, examples) {
                Ok((node, value)) => {
                    if best.map_or(true, |(_, b)| value > b) {
                        best = Some((node, value));
                    }
                },
                Err(LuapeError::SearchFailure { learner, reason }) => {
                    log::debug!("sub-learner `{learner}` failed: {reason}");
                },
                Err(e) => return Err(e),
            }
        }
        best.ok_or_else(|| {
            LuapeError::search_failure("Composite", "every sub-learner failed")
        })
    }
}
