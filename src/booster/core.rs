//! Provides `Booster` trait.

use crate::{
    Result,
    WeakLearner,
};

use std::ops::ControlFlow;


/// The trait [`Booster`](Booster) defines the standard framework of Boosting.
/// 
/// You need to implement [`Booster::preprocess`](Booster::preprocess),
/// [`Booster::boost`](Booster::boost), 
/// and [`Booster::postprocess`](Booster::postprocess)
/// to write a new boosting algorithm.
/// The combined expression is not returned;
/// it grows inside the [`LuapeInference`](crate::LuapeInference)
/// the booster owns.
pub trait Booster {
    /// Returns the name of the boosting algorithm.
    fn name(&self) -> &str;


    /// Returns the parameters of the boosting algorithm.
    /// The default returns `None`.
    fn info(&self) -> Option<Vec<(&str, String)>> {
        None
    }


    /// A main function that runs boosting algorithm.
    /// Returns the last iteration.
    ///
    /// A failed iteration stops the run
    /// and leaves every previously grafted node in place.
    fn run<W>(&mut self, weak_learner: &mut W) -> Result<usize>
        where W: WeakLearner + ?Sized
    {
        self.preprocess(weak_learner)?;

        let flow = (1..).try_for_each(|iter| {
            match self.boost(weak_learner, iter) {
                Ok(ControlFlow::Continue(())) => ControlFlow::Continue(()),
                Ok(ControlFlow::Break(terminated)) => ControlFlow::Break(Ok(terminated)),
                Err(e) => ControlFlow::Break(Err(e)),
            }
        });
        let terminated = match flow {
            ControlFlow::Break(terminated) => terminated?,
            ControlFlow::Continue(()) => usize::MAX,
        };

        self.postprocess(weak_learner)?;
        Ok(terminated)
    }


    /// Pre-processing for `self`.
    /// As you can see in [`Booster::run`](Booster::run),
    /// This method is called before the boosting process.
    fn preprocess<W>(&mut self, weak_learner: &mut W) -> Result<()>
        where W: WeakLearner + ?Sized;


    /// Boosting step per iteration.
    /// This method returns 
    /// `ControlFlow::Continue(())` to keep boosting and
    /// `ControlFlow::Break(terminated_iter)` once a stopping criterion holds.
    fn boost<W>(&mut self, weak_learner: &mut W, iteration: usize)
        -> Result<ControlFlow<usize>>
        where W: WeakLearner + ?Sized;


    /// Post-processing.
    fn postprocess<W>(&mut self, weak_learner: &mut W) -> Result<()>
        where W: WeakLearner + ?Sized;
}
