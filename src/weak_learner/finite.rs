use std::sync::Arc;

use crate::{
    IndexSet,
    LuapeError,
    LuapeInference,
    NodeId,
    Result,
};
use super::{
    BoostingObjective,
    CandidateGenerator,
    InputVariables,
    WeakLearner,
    scoring,
};


/// Scores every candidate of a [`CandidateGenerator`]
/// and returns the best boolean split.
///
/// Boolean candidates are scored as they are,
/// numeric candidates through the best stump threshold,
/// enumerations through the best `x == value` test.
///
/// ```no_run
/// use luape::prelude::*;
///
/// let stumps = SingleStump::init();
/// let functions = FiniteLearner::new(ExhaustiveFunctions::new(2));
/// ```
#[derive(Debug, Clone)]
pub struct FiniteLearner<G> {
    generator: G,
}


/// A stump over one input variable.
pub type SingleStump = FiniteLearner<InputVariables>;


impl SingleStump {
    /// Construct the single stump learner.
    pub fn init() -> Self {
        Self::new(InputVariables)
    }
}


impl<G: CandidateGenerator> FiniteLearner<G> {
    /// Score the candidates of `generator`.
    pub fn new(generator: G) -> Self {
        Self { generator }
    }


    /// The candidate generator.
    pub fn generator(&self) -> &G {
        &self.generator
    }
}


impl<G: CandidateGenerator> WeakLearner for FiniteLearner<G> {
    fn name(&self) -> &str {
        self.generator.name()
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        self.generator.info()
    }


    fn learn(
        &mut self,
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        examples: &Arc<IndexSet>,
    ) -> Result<(NodeId, f64)>
    {
        let candidates = self.generator.candidates(inference)?;
        if candidates.is_empty() {
            return Err(LuapeError::search_failure(self.name(), "no candidate"));
        }

        let mut weak_objective = objective.weak_objective();
        let best = scoring::best_candidate(
            inference, weak_objective.as_mut(), candidates, examples,
        );
        let best = best.ok_or_else(|| {
            LuapeError::search_failure(self.name(), "no candidate has a scalar type")
        })?;
        let node = best.build(inference.universe_mut())?;
        Ok((node, best.objective))
    }
}
