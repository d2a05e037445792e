//! Grafting of weak nodes into the root of an inference.
use std::ops::ControlFlow;

use crate::{
    Dataset,
    LuapeError,
    LuapeInference,
    NodeId,
    Result,
    SampleVector,
    Value,
};
use crate::research::Callbacks;
use crate::weak_learner::objective::branch_of;


/// Votes of the `failure`, `success` and `missing` branches
/// of a grafted weak node.
#[derive(Debug, Clone, PartialEq)]
pub struct Votes {
    /// Vote where the weak node is `false`.
    pub failure: Value,
    /// Vote where the weak node is `true`.
    pub success: Value,
    /// Vote where the weak node is missing.
    pub missing: Value,
}


impl Votes {
    /// Scalar votes.
    pub fn scalar(failure: f64, success: f64, missing: f64) -> Self {
        Self {
            failure: Value::Double(failure),
            success: Value::Double(success),
            missing: Value::Double(missing),
        }
    }


    /// One vote per class.
    pub fn vector(failure: Vec<f64>, success: Vec<f64>, missing: Vec<f64>) -> Self {
        Self {
            failure: Value::Vector(failure),
            success: Value::Vector(success),
            missing: Value::Vector(missing),
        }
    }


    /// The vote of `branch` (`0` failure, `1` success, `2` missing).
    pub fn branch(&self, branch: usize) -> &Value {
        match branch {
            0 => &self.failure,
            1 => &self.success,
            _ => &self.missing,
        }
    }


    /// Largest absolute vote component.
    pub fn magnitude(&self) -> f64 {
        [&self.failure, &self.success, &self.missing].into_iter()
            .flat_map(|v| match v {
                Value::Vector(v) => v.clone(),
                other => vec![other.as_f64().unwrap_or(0.0)],
            })
            .fold(0.0_f64, |m, x| m.max(x.abs()))
    }
}


/// Branch of every element of `predictions`, in vector order.
pub(crate) fn branches(predictions: &SampleVector) -> Vec<(usize, usize)> {
    predictions.iter()
        .map(|s| (s.row, branch_of(s.raw_boolean())))
        .collect()
}


/// Wrap the boolean `weak` node into a test over constant votes
/// and append it to the root of `inference`.
/// A constant weak node contributes the vote of its branch directly.
pub(crate) fn graft(inference: &mut LuapeInference, weak: NodeId, votes: &Votes)
    -> Result<NodeId>
{
    let ty = inference.task().vote_type();
    let universe = inference.universe_mut();

    let contribution = match universe.node(weak).as_constant().cloned() {
        Some(value) => {
            let vote = match value.as_bool() {
                Some(false) => &votes.failure,
                Some(true) => &votes.success,
                None => &votes.missing,
            };
            universe.make_constant_node(vote.clone(), ty)?
        },
        None => {
            let failure = universe.make_constant_node(votes.failure.clone(), ty)?;
            let success = universe.make_constant_node(votes.success.clone(), ty)?;
            let missing = universe.make_constant_node(votes.missing.clone(), ty)?;
            universe.make_test_node(weak, failure, success, missing)?
        },
    };
    universe.add_importance(weak, votes.magnitude());

    inference.push_node(contribution)?;
    inference.clear_removable();
    Ok(contribution)
}


/// Report the results of `iteration` and tell whether to stop.
pub(crate) fn report(
    callbacks: &mut Callbacks,
    inference: &LuapeInference,
    iteration: usize,
    objective: f64,
) -> ControlFlow<usize>
{
    callbacks.result(iteration, "WeakObjective", objective);
    if let Some(score) = inference.evaluate_predictions(Dataset::Training) {
        callbacks.result(iteration, "TrainScore", score);
    }
    if let Some(score) = inference.evaluate_predictions(Dataset::Validation) {
        callbacks.result(iteration, "ValidationScore", score);
    }
    let size = inference.cache_size(Dataset::Training) as f64;
    callbacks.result(iteration, "CacheSize", size);

    if callbacks.stop_requested() {
        callbacks.information(&format!("stop requested at iteration {iteration}"));
        ControlFlow::Break(iteration)
    } else {
        ControlFlow::Continue(())
    }
}


/// Number of training rows, or an error when none is attached.
pub(crate) fn check_training(inference: &LuapeInference, booster: &str) -> Result<usize> {
    let n_sample = inference.n_training();
    if n_sample == 0 || inference.supervision(Dataset::Training).is_none() {
        return Err(LuapeError::InvalidArgument(format!(
            "{booster} needs training samples, call `set_samples` first"
        )));
    }
    Ok(n_sample)
}

