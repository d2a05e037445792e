use colored::Colorize;

use crate::{
    Booster,
    Dataset,
    LuapeInference,
    Result,
    WeakLearner,
};

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::time::Instant;
use std::ops::ControlFlow;

const DEFAULT_ROUND: usize = 100;
const DEFAULT_TIMELIMIT_MILLIS: u128 = u128::MAX;
const WIDTH: usize = 8;
const PREC_WIDTH: usize = 5;
const FULL_WIDTH: usize = 60;
const STAT_WIDTH: usize = (FULL_WIDTH - 4) / 2;
const HEADER: &str = "Iteration,WeakObjective,TrainScore,ValidationScore,CacheSize,Time\n";


/// Implementing this trait allows you to use [`Logger`] to
/// log algorithm's behavor.
pub trait Research {
    /// The inference grown so far.
    fn current_inference(&self) -> &LuapeInference;

    /// Weak objective of the last grafted node.
    fn last_objective(&self) -> f64;
}


/// Struct `Logger` runs a booster and
/// logs the weak objective, the train/validation scores,
/// the cache size and the running time of each round
/// to the console and to a CSV file.
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
/// let booster = AdaBoost::init(inference).force_quit_at(50);
/// let mut logger = Logger::new(booster, SingleStump::init())
///     .time_limit_as_secs(60)
///     .print_every(10);
/// logger.run("adaboost.csv").unwrap();
/// ```
pub struct Logger<B, W> {
    booster: B,
    weak_learner: W,
    time_limit: u128,
    round: usize,
}


impl<B, W> Logger<B, W> {
    /// Create a new instance of `Logger`.
    pub fn new(booster: B, weak_learner: W) -> Self {
        Self {
            booster,
            weak_learner,
            time_limit: DEFAULT_TIMELIMIT_MILLIS,
            round: DEFAULT_ROUND,
        }
    }


    /// The logged booster.
    pub fn booster(&self) -> &B {
        &self.booster
    }


    /// Release the booster and the weak learner.
    pub fn into_parts(self) -> (B, W) {
        (self.booster, self.weak_learner)
    }
}


impl<B, W> Logger<B, W>
    where B: Booster + Research,
          W: WeakLearner,
{
    /// Set the time limit for boosting algorithm as milliseconds.
    /// If the boosting algorithm reaches this limit,
    /// breaks immediately.
    #[inline(always)]
    pub fn time_limit_as_millis(mut self, time_limit: u128) -> Self {
        self.time_limit = time_limit;
        self
    }


    /// Set the time limit for boosting algorithm as seconds.
    #[inline(always)]
    pub fn time_limit_as_secs(mut self, time_limit: u64) -> Self {
        self.time_limit = (time_limit as u128).saturating_mul(1_000);
        self
    }


    /// Set the time limit for boosting algorithm as minutes.
    #[inline(always)]
    pub fn time_limit_as_mins(mut self, time_limit: u64) -> Self {
        self.time_limit = (time_limit as u128).saturating_mul(60_000);
        self
    }


    /// Set the interval to print the current status.
    /// By default, the method `run` prints its status every `100` rounds.
    /// If you don't want to print the log,
    /// set `usize::MAX`.
    #[inline(always)]
    pub fn print_every(mut self, round: usize) -> Self {
        assert!(round > 0, "cannot print every 0 rounds");
        self.round = round;
        self
    }


    #[inline(always)]
    fn print_log_header(&self) {
        println!(
            "      {:>WIDTH$}\t\t{:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}",
            "".bold().red(),
            "OBJ.".bold().blue(),
            "TRAIN".bold().green(),
            "VALID.".bold().yellow(),
            "ACC.".bold().cyan(),
        );
        println!(
            "      {:>WIDTH$}\t\t{:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}\n",
            "ROUND".bold().red(),
            "VALUE".bold().blue(),
            "SCORE".bold().green(),
            "SCORE".bold().yellow(),
            "TIME".bold().cyan(),
        );
    }


    fn info_lines(info: Option<Vec<(&str, String)>>) {
        let Some(info) = info else { return };
        let line = info.into_iter()
            .map(|(key, val)| {
                format!(
                    "    + {:<STAT_WIDTH$}\t{:>width$}",
                    key,
                    val.bold().yellow(),
                    width = STAT_WIDTH - 8
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        println!("{line}");
    }


    /// print current settings.
    #[inline(always)]
    fn print_stats(&self) {
        let limit = if self.time_limit != u128::MAX {
            time_format(self.time_limit)
        } else {
            "Nothing".into()
        };
        let inference = self.booster.current_inference();
        let task = format!("{:?}", inference.task());
        let rows = format!("{}", inference.n_training());

        let header = format!(
            "{:=>FULL_WIDTH$}\n{:^FULL_WIDTH$}\n{:->FULL_WIDTH$}",
            "", "STATS".bold(), "",
        );
        println!(
            "\n{header}\n\
            + {:<STAT_WIDTH$}\t{:>STAT_WIDTH$}\n\
            + {:<STAT_WIDTH$}\t{:>STAT_WIDTH$}",
            "Task".bold(),
            task.bold().green(),
            "# of examples".bold(),
            rows.bold().green(),
        );

        println!(
            "+ {:<STAT_WIDTH$}\t{:>STAT_WIDTH$}",
            "Booster".bold(),
            self.booster.name().bold().green(),
        );
        Self::info_lines(self.booster.info());

        println!(
            "+ {:<STAT_WIDTH$}\t{:>STAT_WIDTH$}",
            "Weak Learner".bold(),
            self.weak_learner.name().bold().green(),
        );
        Self::info_lines(self.weak_learner.info());

        println!(
            "\
            + {:<STAT_WIDTH$}\t{:>STAT_WIDTH$}\n\
            {:=^FULL_WIDTH$}\n\
            ",
            "Time Limit".bold(),
            limit.bold().green(),
            "".bold(),
        );
    }


    /// One logged round.
    fn step(&mut self, iter: usize, file: &mut File, time_acc: &mut u128)
        -> Result<ControlFlow<usize>>
    {
        let now = Instant::now();
        let flow = self.booster.boost(&mut self.weak_learner, iter)?;
        *time_acc += now.elapsed().as_millis();

        let inference = self.booster.current_inference();
        let obj = self.booster.last_objective();
        let train = inference.evaluate_predictions(Dataset::Training)
            .unwrap_or(f64::NAN);
        let valid = inference.evaluate_predictions(Dataset::Validation)
            .unwrap_or(f64::NAN);
        let cache = inference.cache_size(Dataset::Training);

        let line = format!("{iter},{obj},{train},{valid},{cache},{time_acc}\n");
        file.write_all(line.as_bytes())?;

        if *time_acc > self.time_limit {
            println!(
                "{} {}\t\t{}\t{}\t{}\t{}\n",
                "[TLE]".bold().bright_red(),
                format!("{:>WIDTH$}", iter).bold().red(),
                format!("{:>WIDTH$.PREC_WIDTH$}", obj).bold().blue(),
                format!("{:>WIDTH$.PREC_WIDTH$}", train).bold().green(),
                format!("{:>WIDTH$.PREC_WIDTH$}", valid).bold().yellow(),
                time_format(*time_acc).bold().cyan(),
            );
            return Ok(ControlFlow::Break(iter));
        }

        if self.round != usize::MAX && iter % self.round == 0 {
            println!(
                "{} {}\t\t{}\t{}\t{}\t{}",
                "[LOG]".bold().magenta(),
                format!("{:>WIDTH$}", iter).red(),
                format!("{:>WIDTH$.PREC_WIDTH$}", obj).blue(),
                format!("{:>WIDTH$.PREC_WIDTH$}", train).green(),
                format!("{:>WIDTH$.PREC_WIDTH$}", valid).yellow(),
                time_format(*time_acc).bold().cyan(),
            );
        }

        if flow.is_break() && self.round != usize::MAX {
            println!(
                "{} {}\t\t{}\t{}\t{}\t{}\n",
                "[FIN]".bold().bright_green(),
                format!("{:>WIDTH$}", iter).red(),
                format!("{:>WIDTH$.PREC_WIDTH$}", obj).bold().blue(),
                format!("{:>WIDTH$.PREC_WIDTH$}", train).bold().green(),
                format!("{:>WIDTH$.PREC_WIDTH$}", valid).bold().yellow(),
                time_format(*time_acc).bold().cyan(),
            );
        }
        Ok(flow)
    }


    /// Run the given boosting algorithm with logging.
    /// Note that this method is almost the same as `Booster::run`.
    /// This method measures running time per iteration.
    /// Returns the last iteration.
    pub fn run<P: AsRef<Path>>(&mut self, filename: P) -> Result<usize> {
        let mut file = File::create(filename)?;
        file.write_all(HEADER.as_bytes())?;

        self.booster.preprocess(&mut self.weak_learner)?;
        if self.round != usize::MAX {
            self.print_stats();
            self.print_log_header();
        }

        let mut time_acc = 0;
        let flow = (1..).try_for_each(|iter| {
            match self.step(iter, &mut file, &mut time_acc) {
                Ok(ControlFlow::Continue(())) => ControlFlow::Continue(()),
                Ok(ControlFlow::Break(terminated)) => ControlFlow::Break(Ok(terminated)),
                Err(e) => ControlFlow::Break(Err(e)),
            }
        });
        let terminated = match flow {
            ControlFlow::Break(terminated) => terminated?,
            ControlFlow::Continue(()) => usize::MAX,
        };

        self.booster.postprocess(&mut self.weak_learner)?;
        Ok(terminated)
    }
}


fn time_format(millisec: u128) -> String {
    if millisec < 1_000 {
        return format!("  0.{:0>3}s", millisec);
    }
    let sec = millisec / 1_000;
    let millisec = millisec % 1_000;
    if sec < 60 {
        return format!(" {:0>2}.{:0>3}s", sec, millisec);
    }
    let min = sec / 60;
    let sec = sec % 60;
    if min < 60 {
        return format!(" {:0>2}m {:0>2}s", min, sec);
    }
    let hours = min / 60;
    let min = min % 60;
    format!(" {:0>2}h {:0>2}m", hours, min)
}


#[cfg(test)]
mod tests {
    use super::time_format;

    #[test]
    fn formats_time() {
        assert_eq!(time_format(42), "  0.042s");
        assert_eq!(time_format(61_000), " 01m 01s");
    }
}
