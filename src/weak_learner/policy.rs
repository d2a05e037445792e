use rand::prelude::*;
use rand_distr::WeightedAliasIndex;

use std::sync::Arc;

use crate::{
    Function,
    IndexSet,
    LuapeError,
    LuapeInference,
    NodeId,
    Result,
    Universe,
};
use crate::common::{ScalarStats, checker};
use crate::constants::{
    DEFAULT_COST_PENALTY,
    DEFAULT_POLICY_CANDIDATES,
    DEFAULT_POLICY_MAX_SIZE,
    DEFAULT_SEED,
    DEFAULT_TEMPERATURE,
};
use super::{
    BoostingObjective,
    WeakLearner,
    scoring::{self, Scored},
};


#[derive(Debug, Clone, PartialEq)]
enum Action {
    Push(usize),
    Apply(Function),
    Yield,
}


/// Builds candidates as reverse Polish programs.
///
/// An episode pushes inputs, applies functions to the top of the stack,
/// and yields when a single node is left.
/// Actions are drawn from a Boltzmann distribution over the mean reward
/// of the candidates they contributed to.
/// The reward of a candidate is its objective minus
/// `cost_penalty` times its expected computing time.
#[derive(Debug, Clone)]
pub struct PolicyLearner {
    n_candidates: usize,
    max_size: usize,
    temperature: f64,
    cost_penalty: f64,
    seed: u64,
    rng: StdRng,

    actions: Vec<Action>,
    rewards: Vec<ScalarStats>,
}


impl Default for PolicyLearner {
    fn default() -> Self {
        Self::init()
    }
}


impl PolicyLearner {
    /// Construct a policy learner with the default parameters.
    pub fn init() -> Self {
        Self {
            n_candidates: DEFAULT_POLICY_CANDIDATES,
            max_size: DEFAULT_POLICY_MAX_SIZE,
            temperature: DEFAULT_TEMPERATURE,
            cost_penalty: DEFAULT_COST_PENALTY,
            seed: DEFAULT_SEED,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
            actions: Vec::new(),
            rewards: Vec::new(),
        }
    }


    /// Set the number of episodes per round.
    pub fn candidates(mut self, n: usize) -> Self {
        assert!(n > 0, "at least one episode per round is needed");
        self.n_candidates = n;
        self
    }


    /// Set the maximal number of push and apply actions per episode.
    pub fn max_size(mut self, size: usize) -> Self {
        assert!(size > 0, "episodes need at least one action");
        self.max_size = size;
        self
    }


    /// Set the temperature of the Boltzmann distribution.
    pub fn temperature(mut self, temperature: f64) -> Self {
        checker::check_temperature(temperature);
        self.temperature = temperature;
        self
    }


    /// Set the weight of the expected computing time in the reward.
    pub fn cost_penalty(mut self, penalty: f64) -> Self {
        self.cost_penalty = penalty;
        self
    }


    /// Set the seed of the action sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }


    fn build_actions(&mut self, n_inputs: usize) {
        self.actions = (0..n_inputs).map(Action::Push)
            .chain(Function::templates().into_iter().map(Action::Apply))
            .chain(std::iter::once(Action::Yield))
            .collect();
        self.rewards = vec![ScalarStats::new(); self.actions.len()];
    }


    fn is_legal(&self, action: &Action, stack: &[NodeId], step: usize, universe: &Universe)
        -> bool
    {
        let building = step < self.max_size;
        match action {
            Action::Push(_) => building,
            Action::Apply(function) => {
                let arity = function.arity();
                building
                    && stack.len() >= arity
                    && stack[stack.len() - arity..].iter()
                        .enumerate()
                        .all(|(k, a)| function.accepts(k, universe.type_of(*a)))
            },
            Action::Yield => stack.len() == 1,
        }
    }


    /// Draw a legal action. Unvisited actions count as the best visited one.
    fn sample_action(&mut self, legal: &[usize]) -> Option<usize> {
        let best = self.rewards.iter()
            .filter(|s| s.count() > 0)
            .map(|s| s.mean())
            .fold(f64::NEG_INFINITY, f64::max);
        let best = if best.is_finite() { best } else { 0.0 };
        let weights = legal.iter()
            .map(|&a| {
                let stats = &self.rewards[a];
                let mean = if stats.count() > 0 { stats.mean() } else { best };
                ((mean - best) / self.temperature).exp()
            })
            .collect::<Vec<_>>();
        let dist = WeightedAliasIndex::new(weights).ok()?;
        Some(legal[dist.sample(&mut self.rng)])
    }


    /// Run one episode and return the yielded node with the taken actions.
    fn episode(&mut self, inference: &mut LuapeInference) -> Option<(NodeId, Vec<usize>)> {
        let inputs = inference.inputs().to_vec();
        let mut stack = Vec::new();
        let mut taken = Vec::new();

        for step in 0..=self.max_size {
            let universe = inference.universe();
            let legal = (0..self.actions.len())
                .filter(|&a| self.is_legal(&self.actions[a], &stack, step, universe))
                .collect::<Vec<_>>();
            if legal.is_empty() {
                return None;
            }
            let a = self.sample_action(&legal)?;
            taken.push(a);

            match self.actions[a].clone() {
                Action::Push(i) => stack.push(inputs[i]),
                Action::Apply(function) => {
                    let arguments = stack.split_off(stack.len() - function.arity());
                    let node = inference.universe_mut()
                        .make_function_node(function, arguments)
                        .ok()?;
                    stack.push(node);
                },
                Action::Yield => return stack.pop().map(|node| (node, taken)),
            }
        }
        None
    }
}


impl WeakLearner for PolicyLearner {
    fn name(&self) -> &str {
        "Policy"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        Some(vec![
            ("# of episodes", format!("{}", self.n_candidates)),
            ("Max size", format!("{}", self.max_size)),
            ("Temperature", format!("{}", self.temperature)),
            ("Cost penalty", format!("{}", self.cost_penalty)),
            ("Seed", format!("{}", self.seed)),
        ])
    }


    fn initialize(&mut self, inference: &mut LuapeInference) -> Result<()> {
        self.build_actions(inference.inputs().len());
        Ok(())
    }


    fn learn(
        &mut self,
        inference: &mut LuapeInference,
        objective: &dyn BoostingObjective,
        examples: &Arc<IndexSet>,
    ) -> Result<(NodeId, f64)>
    {
        let n_inputs = inference.inputs().len();
        if n_inputs == 0 {
            return Err(LuapeError::search_failure(self.name(), "no input variable"));
        }
        let n_pushes = self.actions.iter()
            .filter(|a| matches!(a, Action::Push(_)))
            .count();
        if n_pushes != n_inputs {
            self.build_actions(n_inputs);
        }

        let mut weak_objective = objective.weak_objective();
        let mut best: Option<(Scored, f64)> = None;
        for _ in 0..self.n_candidates {
            let Some((node, taken)) = self.episode(inference) else { continue };
            let Some(scored) = scoring::score_candidate(
                inference, weak_objective.as_mut(), node, examples,
            ) else { continue };

            let cost = inference.universe().expected_computing_time(node);
            let reward = scored.objective - self.cost_penalty * cost;
            if reward.is_finite() {
                taken.iter().for_each(|&a| self.rewards[a].push(reward));
            }
            if best.map_or(true, |(_, r)| reward > r) {
                best = Some((scored, reward));
            }
        }

        let (best, _) = best.ok_or_else(|| {
            LuapeError::search_failure("Policy", "no episode yielded a scalar node")
        })?;
        let node = best.build(inference.universe_mut())?;
        Ok((node, best.objective))
    }
}
