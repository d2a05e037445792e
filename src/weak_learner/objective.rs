//! Scorers of boolean predictions.
use crate::data_type::{RAW_FALSE, RAW_TRUE, RAW_MISSING};
use crate::cache::SampleVector;


/// Raw prediction of a row that is not part of the scored examples.
pub(crate) const RAW_EXCLUDED: u8 = 3;


/// A stateful scorer of one boolean prediction per example.
///
/// Predictions use the raw boolean encoding
/// (`0` false, `1` true, `2` missing).
/// Rows absent from the last call to
/// [`WeakObjective::set_raw_predictions`] are ignored.
pub trait WeakObjective {
    /// Replace every prediction.
    fn set_raw_predictions(&mut self, predictions: &[(usize, u8)]);

    /// Swap the prediction of `row` between `true` and `false`.
    /// Missing predictions are left untouched.
    fn flip_prediction(&mut self, row: usize);

    /// The objective of the current predictions. Larger is better.
    fn compute_objective(&self) -> f64;


    /// Replace every prediction by the values of `predictions`.
    fn set_predictions(&mut self, predictions: &SampleVector) {
        let raw = predictions.iter()
            .map(|s| (s.row, s.raw_boolean().min(RAW_MISSING)))
            .collect::<Vec<_>>();
        self.set_raw_predictions(&raw);
    }


    /// Score `predictions`.
    fn compute(&mut self, predictions: &SampleVector) -> f64 {
        self.set_predictions(predictions);
        self.compute_objective()
    }


    /// Find the stump threshold with the largest objective.
    ///
    /// `sorted` holds `(row, value)` pairs in ascending value order
    /// and `missing` the rows without a value.
    /// Thresholds are the midpoints between consecutive distinct values,
    /// or the larger value when the midpoint does not separate them;
    /// ties keep the smallest threshold.
    /// With fewer than two distinct values, returns that value (or `0`)
    /// with the objective of predicting `true` everywhere.
    fn find_best_threshold(&mut self, sorted: &[(usize, f64)], missing: &[usize])
        -> (f64, f64)
    {
        let mut raw = sorted.iter()
            .map(|(row, _)| (*row, RAW_TRUE))
            .collect::<Vec<_>>();
        raw.extend(missing.iter().map(|row| (*row, RAW_MISSING)));
        self.set_raw_predictions(&raw);

        let distinct = sorted.windows(2)
            .any(|w| w[0].1 != w[1].1);
        if !distinct {
            let value = sorted.first().map_or(0.0, |(_, x)| *x);
            return (value, self.compute_objective());
        }

        let mut best = (f64::NAN, f64::NEG_INFINITY);
        let mut i = 0;
        while i < sorted.len() {
            let value = sorted[i].1;
            while i < sorted.len() && sorted[i].1 == value {
                self.flip_prediction(sorted[i].0);
                i += 1;
            }
            // Every row is `false` past the last value.
            let Some(&(_, next)) = sorted.get(i) else { break };

            let threshold = split_between(value, next);
            let objective = self.compute_objective();
            if objective > best.1 {
                best = (threshold, objective);
            }
        }
        best
    }
}


/// A threshold `t` with `value < t <= next`, so that `x >= t`
/// splits the rows exactly as scored.
/// The halfway point rounds back to `value` between adjacent floats,
/// and `(value + next) / 2` overflows for large values.
fn split_between(value: f64, next: f64) -> f64 {
    let mid = value + (next - value) / 2.0;
    if mid > value && mid <= next { mid } else { next }
}


/// A factory of [`WeakObjective`]s over the current state of a booster
/// (weights for AdaBoost, residuals for L2 boosting, ...).
pub trait BoostingObjective {
    /// A fresh scorer over the current weights or residuals.
    fn weak_objective(&self) -> Box<dyn WeakObjective + '_>;
}


/// Branch (`0` failure, `1` success, `2` missing) of a raw prediction.
#[inline(always)]
pub(crate) fn branch_of(raw: u8) -> usize {
    raw.min(RAW_MISSING) as usize
}


/// Per-row predictions shared by the weak objectives.
#[derive(Debug, Clone)]
pub(crate) struct Predictions {
    raw: Vec<u8>,
}


impl Predictions {
    pub(crate) fn new(n_samples: usize) -> Self {
        Self { raw: vec![RAW_EXCLUDED; n_samples] }
    }


    /// Exclude every row, then record `predictions`.
    pub(crate) fn reset(&mut self, predictions: &[(usize, u8)]) {
        self.raw.iter_mut().for_each(|p| *p = RAW_EXCLUDED);
        for &(row, p) in predictions {
            self.raw[row] = p.min(RAW_MISSING);
        }
    }


    /// Flip `row` and return its `(old, new)` branches.
    pub(crate) fn flip(&mut self, row: usize) -> Option<(usize, usize)> {
        let old = self.raw[row];
        let new = match old {
            RAW_FALSE => RAW_TRUE,
            RAW_TRUE => RAW_FALSE,
            _ => return None,
        };
        self.raw[row] = new;
        Some((old as usize, new as usize))
    }
}
