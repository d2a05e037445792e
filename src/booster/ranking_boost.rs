//! Provides [`RankingBoost`](RankingBoost),
//! gradient boosting of the pairwise logistic loss within query groups.
use rayon::prelude::*;

use std::ops::ControlFlow;

use crate::{
    Booster,
    Dataset,
    LuapeError,
    LuapeInference,
    Result,
    Task,
    WeakLearner,

    common::{checker, utils},
    research::{Callback, Callbacks, Research},
};
use crate::constants::{DEFAULT_LEARNING_RATE, DEFAULT_MAX_ITERATIONS};
use super::graft::{self, Votes};
use super::SquaredLoss;


/// Negative gradient of `sum log(1 + exp(-(F_i - F_j)))`
/// over the pairs `i`, `j` of a group where `i` is more relevant than `j`.
/// Groups are sizes of consecutive rows.
fn pairwise_gradients(scores: &[f64], relevance: &[f64], groups: &[usize]) -> Vec<f64> {
    let bounds = groups.iter()
        .scan(0, |offset, &size| {
            let start = *offset;
            *offset += size;
            Some(start..start + size)
        })
        .collect::<Vec<_>>();

    bounds.into_par_iter()
        .map(|range| {
            let s = &scores[range.clone()];
            let r = &relevance[range];
            let mut gradients = vec![0.0; s.len()];
            for i in 0..s.len() {
                for j in 0..s.len() {
                    if r[i] > r[j] {
                        let lambda = utils::sigmoid(s[j] - s[i]);
                        gradients[i] += lambda;
                        gradients[j] -= lambda;
                    }
                }
            }
            gradients
        })
        .collect::<Vec<_>>()
        .concat()
}


/// Defines `RankingBoost`.
///
/// The supervision holds relevance scores and
/// [`LuapeInference::set_ranking_groups`] cuts the rows into queries
/// (one query over every row by default).
/// Each round fits a boolean node to the pairwise logistic pseudo-residuals
/// with the [`SquaredLoss`] objective and grafts the shrunk branch means.
/// The reported training score is the fraction of misordered pairs.
///
/// ```no_run
/// use luape::prelude::*;
///
/// let sample = Sample::from_csv("queries.csv", true)
///     .unwrap()
///     .set_target("relevance")
///     .unwrap();
/// let mut inference = LuapeInference::from_sample(&sample, Task::Ranking)
///     .unwrap();
/// inference.set_samples(&sample, None).unwrap();
/// inference.set_ranking_groups(Dataset::Training, vec![10; 20]).unwrap();
///
/// let mut booster = RankingBoost::init(inference).force_quit_at(100);
/// booster.run(&mut SingleStump::init()).unwrap();
/// ```
pub struct RankingBoost {
    inference: LuapeInference,

    relevance: Vec<f64>,
    groups: Vec<usize>,
    residuals: Vec<f64>,

    learning_rate: f64,
    max_iter: usize,
    last_objective: f64,
    callbacks: Callbacks,
}


impl RankingBoost {
    /// Initialize the `RankingBoost` over a ranking inference.
    pub fn init(inference: LuapeInference) -> Self {
        Self {
            inference,
            relevance: Vec::new(),
            groups: Vec::new(),
            residuals: Vec::new(),
            learning_rate: DEFAULT_LEARNING_RATE,
            max_iter: DEFAULT_MAX_ITERATIONS,
            last_objective: f64::NAN,
            callbacks: Callbacks::default(),
        }
    }


    /// Set the learning rate (shrinkage), in `(0, 1]`.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        checker::check_learning_rate(rate);
        self.learning_rate = rate;
        self
    }


    /// Force quits after `it` iterations.
    pub fn force_quit_at(mut self, it: usize) -> Self {
        self.max_iter = it;
        self
    }


    /// Chain a callback receiving the per-iteration reports.
    pub fn callback<C: Callback + 'static>(mut self, callback: C) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }


    /// The inference grown so far.
    pub fn inference(&self) -> &LuapeInference {
        &self.inference
    }


    /// Release the inference.
    pub fn into_inference(self) -> LuapeInference {
        self.inference
    }


    /// The current pseudo-residuals.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }


    fn update_residuals(&mut self) {
        let scores = self.inference.scores(Dataset::Training);
        self.residuals = pairwise_gradients(&scores, &self.relevance, &self.groups);
    }
}


impl Booster for RankingBoost {
    fn name(&self) -> &str {
        "RankingBoost"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let info = vec![
            ("# of examples", format!("{}", self.inference.n_training())),
            ("# of groups", format!("{}", self.groups.len())),
            ("Learning rate", format!("{}", self.learning_rate)),
            ("Max iteration", format!("{}", self.max_iter)),
        ];
        Some(info)
    }


    fn preprocess<W>(&mut self, weak_learner: &mut W) -> Result<()>
        where W: WeakLearner + ?Sized
    {
        if self.inference.task() != Task::Ranking {
            return Err(LuapeError::InvalidArgument(format!(
                "RankingBoost needs a ranking task, got {:?}",
                self.inference.task(),
            )));
        }
        let n_sample = graft::check_training(&self.inference, self.name())?;

        self.relevance = self.inference.labels(Dataset::Training);
        self.groups = self.inference.ranking_groups(Dataset::Training).to_vec();
        if self.groups.is_empty() {
            self.groups = vec![n_sample];
        }
        checker::check_groups(&self.groups, n_sample);
        self.update_residuals();
        weak_learner.initialize(&mut self.inference)?;

        self.callbacks.information(&format!(
            "RankingBoost with {} over {} groups",
            weak_learner.name(), self.groups.len(),
        ));
        Ok(())
    }


    fn boost<W>(&mut self, weak_learner: &mut W, iteration: usize)
        -> Result<ControlFlow<usize>>
        where W: WeakLearner + ?Sized
    {
        if self.max_iter < iteration {
            return Ok(ControlFlow::Break(self.max_iter));
        }

        let examples = self.inference.training_indices();
        let loss = SquaredLoss::new(&self.residuals);
        let (weak, objective) = match weak_learner.learn(&mut self.inference, &loss, &examples) {
            Ok(found) => found,
            Err(e) => {
                self.callbacks.error(&e.to_string());
                return Err(e);
            },
        };

        let predictions = self.inference.training_samples(weak, &examples);
        let [v0, v1, v2] = loss.branch_means(&graft::branches(&predictions))
            .map(|mean| self.learning_rate * mean);
        let votes = Votes::scalar(v0, v1, v2);

        graft::graft(&mut self.inference, weak, &votes)?;
        self.last_objective = objective;
        self.update_residuals();

        Ok(graft::report(&mut self.callbacks, &self.inference, iteration, objective))
    }


    fn postprocess<W>(&mut self, _weak_learner: &mut W) -> Result<()>
        where W: WeakLearner + ?Sized
    {
        let n_nodes = self.inference.contributions().len();
        self.callbacks.information(&format!("RankingBoost grafted {n_nodes} nodes"));
        Ok(())
    }
}


impl Research for RankingBoost {
    fn current_inference(&self) -> &LuapeInference {
        &self.inference
    }


    fn last_objective(&self) -> f64 {
        self.last_objective
    }
}
