//! Turns a candidate node of any scalar type into a scored boolean split.
use std::sync::Arc;

use crate::data_type::{Type, RAW_FALSE, RAW_TRUE, RAW_MISSING};
use crate::expression::{NodeId, Function};
use crate::index_set::IndexSet;
use crate::inference::LuapeInference;
use crate::universe::Universe;
use crate::error::Result;

use super::WeakObjective;


/// How a candidate becomes a boolean node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Split {
    /// The candidate already is boolean.
    Boolean,
    /// `candidate >= threshold`.
    Stump(f64),
    /// `candidate == value`.
    Equals(i64),
}


#[derive(Debug, Clone, Copy)]
pub(crate) struct Scored {
    pub(crate) base: NodeId,
    pub(crate) split: Split,
    pub(crate) objective: f64,
}


impl Scored {
    /// Allocate the boolean node.
    pub(crate) fn build(&self, universe: &mut Universe) -> Result<NodeId> {
        match self.split {
            Split::Boolean => Ok(self.base),
            Split::Stump(threshold) => {
                universe.make_function_node(Function::Stump { threshold }, vec![self.base])
            },
            Split::Equals(value) => {
                universe.make_function_node(Function::EqualsConstantEnum(value), vec![self.base])
            },
        }
    }
}


/// Score `candidate` over `examples`.
/// Returns `None` for vector types, which cannot be split.
pub(crate) fn score_candidate(
    inference: &mut LuapeInference,
    objective: &mut dyn WeakObjective,
    candidate: NodeId,
    examples: &Arc<IndexSet>,
) -> Option<Scored>
{
    let split_and_objective = match inference.universe().type_of(candidate) {
        Type::Boolean => {
            let samples = inference.training_samples(candidate, examples);
            (Split::Boolean, objective.compute(&samples))
        },
        Type::Double | Type::Integer => {
            let (sorted, missing) = inference.training_sorted_doubles(candidate, examples);
            let (threshold, value) = objective.find_best_threshold(&sorted, &missing);
            (Split::Stump(threshold), value)
        },
        Type::Enumeration(n) => {
            let samples = inference.training_samples(candidate, examples);
            let values = samples.iter()
                .map(|s| (s.row, s.raw_double()))
                .collect::<Vec<_>>();

            let mut best = (Split::Equals(0), f64::NEG_INFINITY);
            for v in 0..n as i64 {
                let raw = values.iter()
                    .map(|&(row, x)| {
                        let p = if x.is_nan() {
                            RAW_MISSING
                        } else if x == v as f64 {
                            RAW_TRUE
                        } else {
                            RAW_FALSE
                        };
                        (row, p)
                    })
                    .collect::<Vec<_>>();
                objective.set_raw_predictions(&raw);
                let value = objective.compute_objective();
                if value > best.1 {
                    best = (Split::Equals(v), value);
                }
            }
            best
        },
        Type::DoubleVector(_) | Type::SparseVector => return None,
    };

    let (split, score) = split_and_objective;
    let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
    Some(Scored { base: candidate, split, objective: score })
}


/// Score every candidate and keep the best one.
/// Ties keep the earliest candidate.
pub(crate) fn best_candidate<I>(
    inference: &mut LuapeInference,
    objective: &mut dyn WeakObjective,
    candidates: I,
    examples: &Arc<IndexSet>,
) -> Option<Scored>
    where I: IntoIterator<Item = NodeId>,
{
    let mut best: Option<Scored> = None;
    for candidate in candidates {
        let Some(scored) = score_candidate(inference, objective, candidate, examples)
            else { continue };
        if best.map_or(true, |b| scored.objective > b.objective) {
            best = Some(scored);
        }
    }
    best
}
