use rand::prelude::*;

use std::sync::Arc;

use crate::{
    IndexSet,
    LuapeError,
    LuapeInference,
    NodeId,
    Result,
};
use crate::constants::{DEFAULT_MIN_EXAMPLES, DEFAULT_SEED};
use super::{
    BoostingObjective,
    CandidateGenerator,
    WeakLearner,
    scoring::{self, Scored},
};


/// Successive halving over the candidates of a generator.
///
/// Candidates are first scored on a random subsample of
/// `min_examples` rows. The better half survives and the subsample
/// doubles, until one candidate is left or every example is used.
/// Survivors are finally scored on every example.
#[derive(Debug, Clone)]
pub struct LaminatingLearner<G> {
    generator: G,
    min_examples: usize,
    contiguous: bool,
    seed: u64,
    rng: StdRng,
}


impl<G: CandidateGenerator> LaminatingLearner<G> {
    /// Halve the candidates of `generator`.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            min_examples: DEFAULT_MIN_EXAMPLES,
            contiguous: false,
            seed: DEFAULT_SEED,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
        }
    }


    /// Set the size of the first subsample.
    pub fn min_examples(mut self, n: usize) -> Self {
        assert!(n > 0, "the first subsample cannot be empty");
        self.min_examples = n;
        self
    }


    /// Draw subsamples as contiguous blocks of rows.
    pub fn contiguous(mut self, flag: bool) -> Self {
        self.contiguous = flag;
        self
    }


    /// Set the seed of the subsampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }


    fn score_all(
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        candidates: &[NodeId],
        subset: &Arc<IndexSet>,
    ) -> Vec<Scored>
    {
        let mut weak_objective = objective.weak_objective();
        candidates.iter()
            .filter_map(|&c| {
                scoring::score_candidate(inference, weak_objective.as_mut(), c, subset)
            })
            .collect()
    }
}


impl<G: CandidateGenerator> WeakLearner for LaminatingLearner<G> {
    fn name(&self) -> &str {
        "Laminating"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        Some(vec![
            ("Candidates", self.generator.name().to_string()),
            ("Min. examples", format!("{}", self.min_examples)),
            ("Seed", format!("{}", self.seed)),
        ])
    }


    fn learn(
        &mut self,
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        examples: &Arc<IndexSet>,
    ) -> Result<(NodeId, f64)>
    {
        let mut candidates = self.generator.candidates(inference)?;
        if candidates.is_empty() || examples.is_empty() {
            return Err(LuapeError::search_failure(self.name(), "nothing to score"));
        }

        let mut subset = IndexSet::new();
        let size = self.min_examples.min(examples.len());
        subset.randomly_expand_using_source(&mut self.rng, size, examples, self.contiguous);

        while candidates.len() > 1 && subset.len() < examples.len() {
            let rows = Arc::new(subset.clone());
            let mut scored = Self::score_all(inference, objective, &candidates, &rows);
            // Stable: equal objectives keep the generator order.
            scored.sort_by(|a, b| b.objective.total_cmp(&a.objective));
            scored.truncate(scored.len().div_ceil(2).max(1));
            candidates = scored.iter().map(|s| s.base).collect();
            log::debug!(
                "{} candidates survive on {} / {} examples",
                candidates.len(), subset.len(), examples.len(),
            );

            let size = (subset.len() * 2).min(examples.len());
            subset.randomly_expand_using_source(&mut self.rng, size, examples, self.contiguous);
            inference.clear_removable();
        }

        let scored = Self::score_all(inference, objective, &candidates, examples);
        let best = scored.into_iter()
            .fold(None, |best: Option<Scored>, s| match best {
                Some(b) if b.objective >= s.objective => Some(b),
                _ => Some(s),
            })
            .ok_or_else(|| {
                LuapeError::search_failure("Laminating", "no candidate has a scalar type")
            })?;
        let node = best.build(inference.universe_mut())?;
        Ok((node, best.objective))
    }
}
