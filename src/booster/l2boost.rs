//! Provides [`L2Boost`](L2Boost), gradient boosting of the squared loss
//! with boolean weak nodes.
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

    common::checker,
    research::{Callback, Callbacks, Research},
};
use crate::constants::{DEFAULT_LEARNING_RATE, DEFAULT_MAX_ITERATIONS};
use crate::weak_learner::objective::{branch_of, Predictions};
use super::graft::{self, Votes};


/// The squared loss against the current residuals.
///
/// A boolean node splits the examples into its three branches.
/// Its weak objective is minus the pooled within-branch squared deviation
/// of the residuals, divided by the number of examples,
/// so that the best split explains the most variance.
#[derive(Debug, Clone, Copy)]
pub struct SquaredLoss<'a> {
    residuals: &'a [f64],
}


impl<'a> SquaredLoss<'a> {
    /// Fit `residuals`.
    pub fn new(residuals: &'a [f64]) -> Self {
        Self { residuals }
    }


    /// Mean residual of each branch for `(row, branch)` pairs.
    /// Empty branches get `0`.
    pub fn branch_means(&self, branches: &[(usize, usize)]) -> [f64; 3] {
        let mut stats = [[0.0; 3]; 3];
        for &(row, branch) in branches {
            accumulate(&mut stats[branch], self.residuals[row], 1.0);
        }
        stats.map(|[count, sum, _]| if count > 0.0 { sum / count } else { 0.0 })
    }
}


/// Add (`sign = 1`) or remove (`sign = -1`) `r` from `[count, sum, sum of squares]`.
#[inline(always)]
fn accumulate(stats: &mut [f64; 3], r: f64, sign: f64) {
    stats[0] += sign;
    stats[1] += sign * r;
    stats[2] += sign * r * r;
}


struct SquaredObjective<'a> {
    loss: SquaredLoss<'a>,
    predictions: Predictions,
    stats: [[f64; 3]; 3],
}


impl WeakObjective for SquaredObjective<'_> {
    fn set_raw_predictions(&mut self, predictions: &[(usize, u8)]) {
        self.predictions.reset(predictions);
        self.stats = [[0.0; 3]; 3];
        for &(row, raw) in predictions {
            accumulate(&mut self.stats[branch_of(raw)], self.loss.residuals[row], 1.0);
        }
    }


    fn flip_prediction(&mut self, row: usize) {
        if let Some((old, new)) = self.predictions.flip(row) {
            let r = self.loss.residuals[row];
            accumulate(&mut self.stats[old], r, -1.0);
            accumulate(&mut self.stats[new], r, 1.0);
        }
    }


    fn compute_objective(&self) -> f64 {
        let n_sample = self.stats.iter().map(|s| s[0]).sum::<f64>();
        if n_sample < 0.5 {
            return 0.0;
        }
        let deviation = self.stats.iter()
            .filter(|[count, _, _]| *count > 0.5)
            .map(|[count, sum, squares]| (squares - sum * sum / count).max(0.0))
            .sum::<f64>();
        -deviation / n_sample
    }
}


impl BoostingObjective for SquaredLoss<'_> {
    fn weak_objective(&self) -> Box<dyn WeakObjective + '_> {
        Box::new(SquaredObjective {
            loss: *self,
            predictions: Predictions::new(self.residuals.len()),
            stats: [[0.0; 3]; 3],
        })
    }
}


/// Defines `L2Boost` for regression.
///
/// Each round fits a boolean node to the residuals `y - F(x)`
/// and grafts the mean residual of each branch,
/// shrunk by the learning rate.
///
/// ```no_run
/// use luape::prelude::*;
///
/// let sample = Sample::from_csv("housing.csv", true)
///     .unwrap()
///     .set_target("price")
///     .unwrap();
/// let mut inference = LuapeInference::from_sample(&sample, Task::Regression)
///     .unwrap();
/// inference.set_samples(&sample, None).unwrap();
///
/// let mut booster = L2Boost::init(inference)
///     .learning_rate(0.5)
///     .force_quit_at(200);
/// booster.run(&mut SingleStump::init()).unwrap();
/// ```
pub struct L2Boost {
    inference: LuapeInference,

    targets: Vec<f64>,
    residuals: Vec<f64>,

    learning_rate: f64,
    max_iter: usize,
    last_objective: f64,
    callbacks: Callbacks,
}


impl L2Boost {
    /// Initialize the `L2Boost` over a regression inference.
    pub fn init(inference: LuapeInference) -> Self {
        Self {
            inference,
            targets: Vec::new(),
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


    /// The current residuals.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }


    fn update_residuals(&mut self) {
        let scores = self.inference.scores(Dataset::Training);
        self.residuals = self.targets.par_iter()
            .zip(scores)
            .map(|(y, f)| y - f)
            .collect();
    }
}


impl Booster for L2Boost {
    fn name(&self) -> &str {
        "L2Boost"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let info = vec![
            ("# of examples", format!("{}", self.inference.n_training())),
            ("Learning rate", format!("{}", self.learning_rate)),
            ("Max iteration", format!("{}", self.max_iter)),
        ];
        Some(info)
    }


    fn preprocess<W>(&mut self, weak_learner: &mut W) -> Result<()>
        where W: WeakLearner + ?Sized
    {
        if self.inference.task() != Task::Regression {
            return Err(LuapeError::InvalidArgument(format!(
                "L2Boost needs a regression task, got {:?}",
                self.inference.task(),
            )));
        }
        let n_sample = graft::check_training(&self.inference, self.name())?;

        self.targets = self.inference.labels(Dataset::Training);
        self.update_residuals();
        weak_learner.initialize(&mut self.inference)?;

        self.callbacks.information(&format!(
            "L2Boost with {} over {n_sample} examples", weak_learner.name()
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
        self.callbacks.information(&format!("L2Boost grafted {n_nodes} nodes"));
        Ok(())
    }
}


impl Research for L2Boost {
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
    fn objective_is_minus_the_within_branch_variance() {
        let residuals = [1.0, 3.0, 10.0, 14.0];
        let loss = SquaredLoss::new(&residuals);
        let mut objective = loss.weak_objective();
        objective.set_raw_predictions(&[(0, 0), (1, 0), (2, 1), (3, 1)]);
        // (2 + 8) / 4
        assert!((objective.compute_objective() + 2.5).abs() < 1e-12);

        let means = loss.branch_means(&[(0, 0), (1, 0), (2, 1), (3, 1)]);
        assert_eq!(means, [2.0, 12.0, 0.0]);
    }
}
