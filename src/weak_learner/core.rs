use std::sync::Arc;

use crate::{
    LuapeInference,
    IndexSet,
    NodeId,
    Result,
};
use super::BoostingObjective;


/// A trait that defines the behavior of a weak learner.
///
/// At each round, a booster asks its weak learner for one boolean node
/// over the training rows in `examples`,
/// scored by the weak objective the booster provides.
///
/// # Required Methods
/// - [`WeakLearner::name`]
/// - [`WeakLearner::learn`]
/// - [`WeakLearner::info`] ... optional.
/// - [`WeakLearner::initialize`] ... optional.
pub trait WeakLearner {
    /// Returns the name of the weak learner.
    fn name(&self) -> &str;


    /// Returns the parameters of the weak learner.
    fn info(&self) -> Option<Vec<(&str, String)>> {
        None
    }


    /// Called once before the first round.
    fn initialize(&mut self, _inference: &mut LuapeInference) -> Result<()> {
        Ok(())
    }


    /// Returns a boolean node of `inference.universe()`
    /// together with its objective over `examples`.
    ///
    /// Fails with [`LuapeError::SearchFailure`](crate::LuapeError::SearchFailure)
    /// when no candidate can be scored.
    fn learn(
        &mut self,
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        examples: &Arc<IndexSet>,
    ) -> Result<(NodeId, f64)>;
}


impl<W: WeakLearner + ?Sized> WeakLearner for Box<W> {
    fn name(&self) -> &str {
        (**self).name()
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        (**self).info()
    }


    fn initialize(&mut self, inference: &mut LuapeInference) -> Result<()> {
        (**self).initialize(inference)
    }


    fn learn(
        &mut self,
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        examples: &Arc<IndexSet>,
    ) -> Result<(NodeId, f64)>
    {
        (**self).learn(inference, objective, examples)
    }
}
