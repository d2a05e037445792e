//! Provides [`AdaBoostMH`](AdaBoostMH), the multi-class
//! reduction of AdaBoost by Schapire & Singer, 1999.
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

    research::{Callback, Callbacks, Research},
};
use crate::constants::{
    DEFAULT_MAX_ITERATIONS,
    MINIMAL_WEIGHT_SUM,
    VOTE_SMOOTHING,
};
use crate::weak_learner::objective::{branch_of, Predictions};
use super::graft::{self, Votes};


/// The exponential loss of the one-versus-all reduction.
///
/// Every `(row, class)` pair carries a weight `w_ic` and
/// a sign `y_ic` (`+1` for the correct class, `-1` otherwise).
/// A boolean node `h` (`+1` true, `-1` false, `0` missing)
/// has the edge `r_c = sum_i w_ic y_ic h_i` on class `c`,
/// and its weak objective is `sum_c |r_c| / Z`.
#[derive(Debug, Clone, Copy)]
pub struct MultiClassExponentialLoss<'a> {
    labels: &'a [usize],
    weights: &'a [Vec<f64>],
    n_classes: usize,
}


impl<'a> MultiClassExponentialLoss<'a> {
    /// `labels` are class indices and `weights[i][c]` sum to one.
    pub fn new(labels: &'a [usize], weights: &'a [Vec<f64>], n_classes: usize) -> Self {
        assert_eq!(labels.len(), weights.len());
        Self { labels, weights, n_classes }
    }


    #[inline(always)]
    fn sign(&self, row: usize, class: usize) -> f64 {
        if self.labels[row] == class { 1.0 } else { -1.0 }
    }


    /// `[W-, W+]` of each class in each branch for `(row, branch)` pairs.
    pub fn branch_weights(&self, branches: &[(usize, usize)]) -> [Vec<[f64; 2]>; 3] {
        let mut sums = [
            vec![[0.0; 2]; self.n_classes],
            vec![[0.0; 2]; self.n_classes],
            vec![[0.0; 2]; self.n_classes],
        ];
        for &(row, branch) in branches {
            for (c, w) in self.weights[row].iter().enumerate() {
                let positive = (self.labels[row] == c) as usize;
                sums[branch][c][positive] += w;
            }
        }
        sums
    }
}


struct MultiClassObjective<'a> {
    loss: MultiClassExponentialLoss<'a>,
    predictions: Predictions,
    // `sum_i w_ic y_ic` per branch and class.
    signed: [Vec<f64>; 3],
    total: [f64; 3],
}


impl MultiClassObjective<'_> {
    fn add(&mut self, row: usize, branch: usize, sign: f64) {
        for (c, w) in self.loss.weights[row].iter().enumerate() {
            self.signed[branch][c] += sign * self.loss.sign(row, c) * w;
            self.total[branch] += sign * w;
        }
    }
}


impl WeakObjective for MultiClassObjective<'_> {
    fn set_raw_predictions(&mut self, predictions: &[(usize, u8)]) {
        self.predictions.reset(predictions);
        self.signed.iter_mut()
            .for_each(|s| s.iter_mut().for_each(|x| *x = 0.0));
        self.total = [0.0; 3];
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
        let z = self.total.iter().sum::<f64>();
        if z <= MINIMAL_WEIGHT_SUM {
            return 0.0;
        }
        let edge = self.signed[1].iter()
            .zip(&self.signed[0])
            .map(|(s, f)| (s - f).abs())
            .sum::<f64>();
        edge / z
    }
}


impl BoostingObjective for MultiClassExponentialLoss<'_> {
    fn weak_objective(&self) -> Box<dyn WeakObjective + '_> {
        Box::new(MultiClassObjective {
            loss: *self,
            predictions: Predictions::new(self.labels.len()),
            signed: [
                vec![0.0; self.n_classes],
                vec![0.0; self.n_classes],
                vec![0.0; self.n_classes],
            ],
            total: [0.0; 3],
        })
    }
}


/// Defines `AdaBoost.MH` over boolean weak nodes.
///
/// The root sums one vote vector per round.
/// With symmetric votes (the default) the success branch votes
/// `alpha * sign(r_c)` for each class `c`, the failure branch the opposite
/// and the missing branch nothing, with
/// `alpha = 0.5 ln((1 + r) / (1 - r))` and `r` the weak objective.
/// Otherwise each branch votes its smoothed half log-odds per class.
///
/// ```no_run
/// use luape::prelude::*;
///
/// let sample = Sample::from_csv("iris.csv", true)
///     .unwrap()
///     .set_target("species")
///     .unwrap();
/// let task = Task::MultiClassClassification { n_classes: 3 };
/// let mut inference = LuapeInference::from_sample(&sample, task).unwrap();
/// inference.set_samples(&sample, None).unwrap();
///
/// let mut booster = AdaBoostMH::init(inference).force_quit_at(50);
/// booster.run(&mut SingleStump::init()).unwrap();
/// ```
pub struct AdaBoostMH {
    inference: LuapeInference,
    n_classes: usize,

    labels: Vec<usize>,
    weights: Vec<Vec<f64>>,

    symmetric_votes: bool,
    max_iter: usize,
    last_objective: f64,
    callbacks: Callbacks,
}


impl AdaBoostMH {
    /// Initialize the `AdaBoostMH` over a multi-class inference.
    pub fn init(inference: LuapeInference) -> Self {
        let n_classes = match inference.task() {
            Task::MultiClassClassification { n_classes } => n_classes,
            _ => 0,
        };
        Self {
            inference,
            n_classes,
            labels: Vec::new(),
            weights: Vec::new(),
            symmetric_votes: true,
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


    /// Use `alpha * sign(r_c)` votes (`true`, default)
    /// or per-branch log-odds (`false`).
    pub fn symmetric_votes(mut self, flag: bool) -> Self {
        self.symmetric_votes = flag;
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


    /// The current weights, one row per example and one column per class.
    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }


    /// Reset the weights to `w0_ic exp(-y_ic F_c(x_i))`, normalized,
    /// where `w0` puts half of the mass on the correct classes.
    fn update_weights(&mut self) {
        let n_sample = self.labels.len() as f64;
        let m = self.n_classes;
        let correct = (1.0 / (2.0 * n_sample)).ln();
        let wrong = (1.0 / (2.0 * n_sample * (m - 1) as f64)).ln();

        let scores = self.inference.class_scores(Dataset::Training);
        let logs = self.labels.par_iter()
            .zip(scores)
            .map(|(&y, f)| {
                f.iter()
                    .enumerate()
                    .map(|(c, f)| if c == y { correct - f } else { wrong + f })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let max = logs.iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        let mut weights = logs.into_par_iter()
            .map(|row| row.into_iter().map(|l| (l - max).exp()).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let z = weights.iter().flatten().sum::<f64>();
        if z > MINIMAL_WEIGHT_SUM {
            weights.par_iter_mut()
                .for_each(|row| row.iter_mut().for_each(|w| *w /= z));
        }
        self.weights = weights;
    }


    fn votes(&self, sums: &[Vec<[f64; 2]>; 3]) -> Votes {
        let m = self.n_classes;
        let vote = |[neg, pos]: [f64; 2]| {
            0.5 * ((pos + VOTE_SMOOTHING) / (neg + VOTE_SMOOTHING)).ln()
        };
        if !self.symmetric_votes {
            let [failure, success, missing] = sums.clone()
                .map(|branch| branch.into_iter().map(vote).collect::<Vec<_>>());
            return Votes::vector(failure, success, missing);
        }

        let edges = (0..m)
            .map(|c| {
                let success = sums[1][c][1] - sums[1][c][0];
                let failure = sums[0][c][1] - sums[0][c][0];
                success - failure
            })
            .collect::<Vec<_>>();
        let z = sums.iter().flatten().flatten().sum::<f64>();
        let r = if z > MINIMAL_WEIGHT_SUM {
            edges.iter().map(|e| e.abs()).sum::<f64>() / z
        } else {
            0.0
        };
        let alpha = 0.5 * ((1.0 + r + VOTE_SMOOTHING) / (1.0 - r + VOTE_SMOOTHING)).ln();

        let success = edges.iter()
            .map(|e| if *e == 0.0 { 0.0 } else { alpha * e.signum() })
            .collect::<Vec<_>>();
        let failure = success.iter().map(|v| -v).collect();
        Votes::vector(failure, success, vec![0.0; m])
    }
}


impl Booster for AdaBoostMH {
    fn name(&self) -> &str {
        "AdaBoost.MH"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let info = vec![
            ("# of examples", format!("{}", self.inference.n_training())),
            ("# of classes", format!("{}", self.n_classes)),
            ("Symmetric votes", format!("{}", self.symmetric_votes)),
            ("Max iteration", format!("{}", self.max_iter)),
        ];
        Some(info)
    }


    fn preprocess<W>(&mut self, weak_learner: &mut W) -> Result<()>
        where W: WeakLearner + ?Sized
    {
        if self.n_classes < 2 {
            return Err(LuapeError::InvalidArgument(format!(
                "AdaBoost.MH needs a multi-class task, got {:?}",
                self.inference.task(),
            )));
        }
        let n_sample = graft::check_training(&self.inference, self.name())?;

        self.labels = self.inference.labels(Dataset::Training)
            .into_iter()
            .map(|y| y as usize)
            .collect();
        self.update_weights();
        weak_learner.initialize(&mut self.inference)?;

        self.callbacks.information(&format!(
            "AdaBoost.MH with {} over {n_sample} examples and {} classes",
            weak_learner.name(), self.n_classes,
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
        let loss = MultiClassExponentialLoss::new(&self.labels, &self.weights, self.n_classes);
        let (weak, objective) = match weak_learner.learn(&mut self.inference, &loss, &examples) {
            Ok(found) => found,
            Err(e) => {
                self.callbacks.error(&e.to_string());
                return Err(e);
            },
        };

        let predictions = self.inference.training_samples(weak, &examples);
        let sums = loss.branch_weights(&graft::branches(&predictions));
        let votes = self.votes(&sums);
        log::debug!(
            "AdaBoost.MH round {iteration}: {} with objective {objective}",
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
        self.callbacks.information(&format!("AdaBoost.MH grafted {n_nodes} nodes"));
        Ok(())
    }
}


impl Research for AdaBoostMH {
    fn current_inference(&self) -> &LuapeInference {
        &self.inference
    }


    fn last_objective(&self) -> f64 {
        self.last_objective
    }
}
