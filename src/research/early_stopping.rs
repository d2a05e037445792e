use std::sync::{Arc, Mutex, PoisonError};

use crate::constants::DEFAULT_PATIENCE;
use super::Callback;


#[derive(Debug)]
struct State {
    best: f64,
    best_iteration: Option<usize>,
    since_best: usize,
}


/// Requests a stop once the monitored score
/// has not improved for `patience` reports.
/// Lower scores are better.
///
/// Clones share their state,
/// so the best iteration can be read after the run.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    monitor: String,
    patience: usize,
    state: Arc<Mutex<State>>,
}


impl Default for EarlyStopping {
    fn default() -> Self {
        Self::new(DEFAULT_PATIENCE)
    }
}


impl EarlyStopping {
    /// Stop after `patience` reports of `ValidationScore` without improvement.
    pub fn new(patience: usize) -> Self {
        assert!(patience > 0, "patience must be positive");
        let state = State { best: f64::INFINITY, best_iteration: None, since_best: 0 };
        Self {
            monitor: "ValidationScore".to_string(),
            patience,
            state: Arc::new(Mutex::new(state)),
        }
    }


    /// Monitor the result named `name` instead.
    pub fn monitor<S: ToString>(mut self, name: S) -> Self {
        self.monitor = name.to_string();
        self
    }


    /// Iteration of the best score so far.
    pub fn best_iteration(&self) -> Option<usize> {
        self.state.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .best_iteration
    }


    /// Best score so far, `+inf` before the first report.
    pub fn best_score(&self) -> f64 {
        self.state.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .best
    }
}


impl Callback for EarlyStopping {
    fn result(&mut self, iteration: usize, name: &str, value: f64) {
        if name != self.monitor || value.is_nan() {
            return;
        }
        let mut state = self.state.lock()
            .unwrap_or_else(PoisonError::into_inner);
        if value < state.best {
            state.best = value;
            state.best_iteration = Some(iteration);
            state.since_best = 0;
        } else {
            state.since_best += 1;
        }
    }


    fn stop_requested(&self) -> bool {
        let state = self.state.lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.since_best >= self.patience
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_patience() {
        let mut stopping = EarlyStopping::new(2).monitor("TrainScore");
        stopping.result(1, "TrainScore", 0.5);
        stopping.result(2, "TrainScore", 0.4);
        stopping.result(2, "CacheSize", 100.0);
        stopping.result(3, "TrainScore", 0.4);
        assert!(!stopping.stop_requested());
        stopping.result(4, "TrainScore", 0.45);
        assert!(stopping.stop_requested());
        assert_eq!(stopping.best_iteration(), Some(2));
    }
}
