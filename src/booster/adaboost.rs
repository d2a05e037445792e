//! Provides [`AdaBoost`](AdaBoost) with confidence-rated votes
//! by Schapire & Singer, 1999.
use rayon::prelude::*;

use std::ops::ControlFlow;

use crate::{
    Booster,
    BoostingObjective,
    Dataset,
    LuapeError,
    LuapeInference,
    Result,
    Task,
    WeakLearner,
    WeakObjective,

    common::utils,
    research::{Callback, Callbacks, Research},
};
use crate::constants::{
    DEFAULT_MAX_ITERATIONS,
    MINIMAL_WEIGHT_SUM,
    VOTE_SMOOTHING,
};
use crate::weak_learner::objective::{branch_of, Predictions};
use super::graft::{self, Votes};


/// The exponential loss `exp(-y F(x))` under the current example weights.
///
/// Its weak objective scores a boolean node by
/// `1 - sum_b 2 sqrt(W+_b W-_b) / Z`, where `W+_b` (resp. `W-_b`)
/// is the weight of the positive (resp. negative) examples
/// falling in branch `b` (failure, success or missing).
#[derive(Debug, Clone, Copy)]
pub struct ExponentialLoss<'a> {
    labels: &'a [f64],
    weights: &'a [f64],
}


impl<'a> ExponentialLoss<'a> {
    /// `labels` are `+1` / `-1`, `weights` sum to one.
    pub fn new(labels: &'a [f64], weights: &'a [f64]) -> Self {
        assert_eq!(labels.len(), weights.len());
        Self { labels, weights }
    }


    /// `[W-, W+]` of each branch for `(row, branch)` pairs.
    pub fn branch_weights(&self, branches: &[(usize, usize)]) -> [[f64; 2]; 3] {
        let mut sums = [[0.0; 2]; 3];
        for &(row, branch) in branches {
            let positive = (self.labels[row] > 0.0) as usize;
            sums[branch][positive] += self.weights[row];
        }
        sums
    }
}


/// Objective of the branch weights `[W-, W+]`.
fn edge_of(sums: &[[f64; 2]; 3]) -> f64 {
    let z = sums.iter().flatten().sum::<f64>();
    if z <= MINIMAL_WEIGHT_SUM {
        return 0.0;
    }
    let loss = sums.iter()
        .map(|[neg, pos]| 2.0 * (neg.max(0.0) * pos.max(0.0)).sqrt())
        .sum::<f64>();
    1.0 - loss / z
}


/// Smoothed half log-odds of a branch.
fn confidence(neg: f64, pos: f64) -> f64 {
    0.5 * ((pos + VOTE_SMOOTHING) / (neg + VOTE_SMOOTHING)).ln()
}


struct ExponentialObjective<'a> {
    loss: ExponentialLoss<'a>,
    predictions: Predictions,
    sums: [[f64; 2]; 3],
}


impl ExponentialObjective<'_> {
    #[inline(always)]
    fn add(&mut self, row: usize, branch: usize, sign: f64) {
        let positive = (self.loss.labels[row] > 0.0) as usize;
        self.sums[branch][positive] += sign * self.loss.weights[row];
    }
}


impl WeakObjective for ExponentialObjective<'_> {
    fn set_raw_predictions(&mut self, predictions: &[(usize, u8)]) {
        self.predictions.reset(predictions);
        self.sums = [[0.0; 2]; 3];
        for &(row, raw) in predictions {
            self.add(row, branch_of(raw), 1.0);
        }
    }


    fn flip_prediction(&mut self, row: usize) {
        if let Some((old, new)) = self.predictions.flip(row) {
            self.add(row, old, -1.0);
            self.add(row, new, 1.0);
        }
    }


    fn compute_objective(&self) -> f64 {
        edge_of(&self.sums)
    }
}


impl BoostingObjective for ExponentialLoss<'_> {
    fn weak_objective(&self) -> Box<dyn WeakObjective + '_> {
        Box::new(ExponentialObjective {
            loss: *self,
            predictions: Predictions::new(self.labels.len()),
            sums: [[0.0; 2]; 3],
        })
    }
}


/// Defines `AdaBoost` over boolean weak nodes.
///
/// Each round, the weak learner returns a boolean node `h`,
/// and the root receives the test `h ? v_1 : v_0` (`v_2` if `h` is missing)
/// where `v_b = 0.5 ln(W+_b / W-_b)` (smoothed).
/// The example weights are then reset to `exp(-y F(x))`, normalized.
///
/// ```no_run
/// use luape::prelude::*;
///
/// let sample = Sample::from_csv("train.csv", true)
///     .unwrap()
///     .set_target("class")
///     .unwrap();
/// let mut inference = LuapeInference::from_sample(
///     &sample, Task::BinaryClassification
/// ).unwrap();
/// inference.set_samples(&sample, None).unwrap();
///
/// let mut booster = AdaBoost::init(inference)
///     .force_quit_at(100)
///     .callback(ConsoleCallback::new().print_every(10));
/// let mut weak_learner = SingleStump::init();
/// booster.run(&mut weak_learner).unwrap();
///
/// let error = booster.inference()
///     .evaluate_predictions(Dataset::Training)
///     .unwrap();
/// println!("Training error is: {error}");
/// ```
pub struct AdaBoost {
    inference: LuapeInference,

    // `+1` / `-1` labels of the training rows.
    labels: Vec<f64>,

    // Distribution over the training rows.
    weights: Vec<f64>,

    max_iter: usize,
    last_objective: f64,
    callbacks: Callbacks,
}


impl AdaBoost {
    /// Initialize the `AdaBoost` over a binary classification inference.
    /// Training samples must be attached before [`Booster::run`].
    pub fn init(inference: LuapeInference) -> Self {
        Self {
            inference,
            labels: Vec::new(),
            weights: Vec::new(),
            max_iter: DEFAULT_MAX_ITERATIONS,
            last_objective: f64::NAN,
            callbacks: Callbacks::default(),
        }
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


    /// The current distribution over training rows.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }


    /// Reset the weights to `exp(-y F(x))`, normalized.
    /// Works in log scale to avoid overflow.
    fn update_weights(&mut self) {
        let scores = self.inference.scores(Dataset::Training);
        let margins = self.labels.par_iter()
            .zip(scores)
            .map(|(y, f)| -y * f)
            .collect::<Vec<_>>();
        let max = margins.iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        self.weights = margins.into_par_iter()
            .map(|m| (m - max).exp())
            .collect();
        utils::normalize(&mut self.weights);
    }
}


impl Booster for AdaBoost {
    fn name(&self) -> &str {
        "AdaBoost"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let info = vec![
            ("# of examples", format!("{}", self.inference.n_training())),
            ("Max iteration", format!("{}", self.max_iter)),
            ("# of callbacks", format!("{}", self.callbacks.len())),
        ];
        Some(info)
    }


    fn preprocess<W>(&mut self, weak_learner: &mut W) -> Result<()>
        where W: WeakLearner + ?Sized
    {
        if self.inference.task() != Task::BinaryClassification {
            return Err(LuapeError::InvalidArgument(format!(
                "AdaBoost needs a binary classification task, got {:?}",
                self.inference.task(),
            )));
        }
        let n_sample = graft::check_training(&self.inference, self.name())?;

        self.labels = self.inference.labels(Dataset::Training);
        self.update_weights();
        weak_learner.initialize(&mut self.inference)?;

        self.callbacks.information(&format!(
            "AdaBoost with {} over {n_sample} examples", weak_learner.name()
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
        let loss = ExponentialLoss::new(&self.labels, &self.weights);
        let (weak, objective) = match weak_learner.learn(&mut self.inference, &loss, &examples) {
            Ok(found) => found,
            Err(e) => {
                self.callbacks.error(&e.to_string());
                return Err(e);
            },
        };

        let predictions = self.inference.training_samples(weak, &examples);
        let sums = loss.branch_weights(&graft::branches(&predictions));
        let [v0, v1, v2] = sums.map(|[neg, pos]| confidence(neg, pos));
        let votes = Votes::scalar(v0, v1, v2);
        log::debug!(
            "AdaBoost round {iteration}: {} with objective {objective}",
            self.inference.universe().to_short_string(weak),
        );

        graft::graft(&mut self.inference, weak, &votes)?;
        self.last_objective = objective;
        self.update_weights();

        Ok(graft::report(&mut self.callbacks, &self.inference, iteration, objective))
    }


    fn postprocess<W>(&mut self, _weak_learner: &mut W) -> Result<()>
        where W: WeakLearner + ?Sized
    {
        let n_nodes = self.inference.contributions().len();
        self.callbacks.information(&format!("AdaBoost grafted {n_nodes} nodes"));
        Ok(())
    }
}


impl Research for AdaBoost {
    fn current_inference(&self) -> &LuapeInference {
        &self.inference
    }


    fn last_objective(&self) -> f64 {
        self.last_objective
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_split_has_objective_one() {
        let labels = [-1.0, -1.0, 1.0, 1.0];
        let weights = [0.25; 4];
        let loss = ExponentialLoss::new(&labels, &weights);
        let sums = loss.branch_weights(&[(0, 0), (1, 0), (2, 1), (3, 1)]);
        assert!((edge_of(&sums) - 1.0).abs() < 1e-12);
        assert!(confidence(sums[0][0], sums[0][1]) < 0.0);
        assert!(confidence(sums[1][0], sums[1][1]) > 0.0);
    }


    #[test]
    fn flips_match_recomputation() {
        let labels = [-1.0, 1.0, 1.0, -1.0, 1.0];
        let weights = [0.1, 0.2, 0.3, 0.15, 0.25];
        let loss = ExponentialLoss::new(&labels, &weights);
        let mut objective = loss.weak_objective();
        objective.set_raw_predictions(&[(0, 1), (1, 1), (2, 0), (3, 2), (4, 1)]);
        objective.flip_prediction(2);
        objective.flip_prediction(0);
        let incremental = objective.compute_objective();

        objective.set_raw_predictions(&[(0, 0), (1, 1), (2, 1), (3, 2), (4, 1)]);
        assert!((incremental - objective.compute_objective()).abs() < 1e-12);
    }
}
