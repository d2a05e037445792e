use serde::{Serialize, Deserialize};


/// Running statistics of a scalar stream (Welford's algorithm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}


impl Default for ScalarStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}


impl ScalarStats {
    /// Construct empty statistics.
    pub fn new() -> Self {
        Self::default()
    }


    /// Observe `x`.
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }


    /// Number of observations.
    pub fn count(&self) -> usize {
        self.count
    }


    /// Mean of the observations, `0` if there is none.
    pub fn mean(&self) -> f64 {
        self.mean
    }


    /// Population variance of the observations.
    pub fn variance(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.m2 / self.count as f64 }
    }


    /// Standard deviation of the observations.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }


    /// Smallest observation.
    pub fn min(&self) -> f64 {
        self.min
    }


    /// Largest observation.
    pub fn max(&self) -> f64 {
        self.max
    }
}
