//! Per-iteration reporting of the boosters.
use colored::Colorize;

use std::sync::{Arc, Mutex, PoisonError};

const WIDTH: usize = 8;
const PREC_WIDTH: usize = 5;
const NAME_WIDTH: usize = 16;


/// Receives what a booster reports at each iteration.
///
/// Every method does nothing by default.
/// A callback that returns `true` from
/// [`Callback::stop_requested`] ends the run after the current iteration.
pub trait Callback {
    /// A named scalar result of `iteration`,
    /// e.g. `TrainScore` or `CacheSize`.
    fn result(&mut self, _iteration: usize, _name: &str, _value: f64) {}


    /// A free-form message.
    fn information(&mut self, _message: &str) {}


    /// A failure message.
    fn error(&mut self, _message: &str) {}


    /// Returns `true` when the booster should stop.
    fn stop_requested(&self) -> bool {
        false
    }
}


/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCallback;


impl Callback for NullCallback {}


/// Prints the reports on the console.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleCallback {
    round: usize,
}


impl Default for ConsoleCallback {
    fn default() -> Self {
        Self::new()
    }
}


impl ConsoleCallback {
    /// Print every result.
    pub fn new() -> Self {
        Self { round: 1 }
    }


    /// Print results only every `round` iterations.
    pub fn print_every(mut self, round: usize) -> Self {
        assert!(round > 0, "cannot print every 0 rounds");
        self.round = round;
        self
    }
}


impl Callback for ConsoleCallback {
    fn result(&mut self, iteration: usize, name: &str, value: f64) {
        if iteration % self.round != 0 {
            return;
        }
        println!(
            "{} {}\t{}\t{}",
            "[LOG]".bold().magenta(),
            format!("{:>WIDTH$}", iteration).red(),
            format!("{:<NAME_WIDTH$}", name).blue(),
            format!("{:>WIDTH$.PREC_WIDTH$}", value).green(),
        );
    }


    fn information(&mut self, message: &str) {
        println!("{} {}", "[INF]".bold().cyan(), message);
    }


    fn error(&mut self, message: &str) {
        eprintln!("{} {}", "[ERR]".bold().bright_red(), message.red());
    }
}


#[derive(Debug, Default)]
struct Records {
    results: Vec<(usize, String, f64)>,
    messages: Vec<String>,
    errors: Vec<String>,
}


/// Keeps every report in memory.
///
/// Clones share the same records, so a clone can be given to a booster
/// and read after the run:
///
/// ```
/// use luape::prelude::*;
///
/// let recorder = RecordingCallback::new();
/// let mut callback = recorder.clone();
/// callback.result(1, "TrainScore", 0.25);
/// assert_eq!(recorder.values("TrainScore"), vec![0.25]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingCallback {
    records: Arc<Mutex<Records>>,
}


impl RecordingCallback {
    /// Construct an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }


    fn with<T>(&self, f: impl FnOnce(&mut Records) -> T) -> T {
        let mut records = self.records.lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut records)
    }


    /// Every `(iteration, name, value)` result in report order.
    pub fn results(&self) -> Vec<(usize, String, f64)> {
        self.with(|r| r.results.clone())
    }


    /// The values reported under `name`, in iteration order.
    pub fn values(&self, name: &str) -> Vec<f64> {
        self.with(|r| {
            r.results.iter()
                .filter(|(_, n, _)| n == name)
                .map(|(_, _, v)| *v)
                .collect()
        })
    }


    /// Every information message.
    pub fn messages(&self) -> Vec<String> {
        self.with(|r| r.messages.clone())
    }


    /// Every error message.
    pub fn errors(&self) -> Vec<String> {
        self.with(|r| r.errors.clone())
    }
}


impl Callback for RecordingCallback {
    fn result(&mut self, iteration: usize, name: &str, value: f64) {
        self.with(|r| r.results.push((iteration, name.to_string(), value)));
    }


    fn information(&mut self, message: &str) {
        self.with(|r| r.messages.push(message.to_string()));
    }


    fn error(&mut self, message: &str) {
        self.with(|r| r.errors.push(message.to_string()));
    }
}


/// The callbacks chained to one booster.
#[derive(Default)]
pub(crate) struct Callbacks {
    callbacks: Vec<Box<dyn Callback>>,
}


impl Callbacks {
    pub(crate) fn push(&mut self, callback: Box<dyn Callback>) {
        self.callbacks.push(callback);
    }


    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }


    pub(crate) fn result(&mut self, iteration: usize, name: &str, value: f64) {
        self.callbacks.iter_mut()
            .for_each(|c| c.result(iteration, name, value));
    }


    pub(crate) fn information(&mut self, message: &str) {
        self.callbacks.iter_mut()
            .for_each(|c| c.information(message));
    }


    pub(crate) fn error(&mut self, message: &str) {
        self.callbacks.iter_mut()
            .for_each(|c| c.error(message));
    }


    pub(crate) fn stop_requested(&self) -> bool {
        self.callbacks.iter()
            .any(|c| c.stop_requested())
    }
}
