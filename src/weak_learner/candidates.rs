//! Enumerators of candidate nodes for finite weak learners.
use rand::prelude::*;

use std::collections::HashSet;

use crate::{
    Function,
    LuapeInference,
    NodeId,
    Result,
    Universe,
};
use crate::constants::{DEFAULT_RANDOM_CANDIDATES, DEFAULT_SEED};


/// Produces the nodes a finite weak learner scores at each round.
pub trait CandidateGenerator {
    /// Returns the name of the generator.
    fn name(&self) -> &str;


    /// Returns the parameters of the generator.
    fn info(&self) -> Option<Vec<(&str, String)>> {
        None
    }


    /// Candidate nodes, allocated in `inference.universe_mut()`.
    fn candidates(&mut self, inference: &mut LuapeInference) -> Result<Vec<NodeId>>;
}


/// The input variables themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputVariables;


impl CandidateGenerator for InputVariables {
    fn name(&self) -> &str {
        "Input Variables"
    }


    fn candidates(&mut self, inference: &mut LuapeInference) -> Result<Vec<NodeId>> {
        Ok(inference.inputs().to_vec())
    }
}


/// Every well-typed function application up to `max_depth` levels
/// above the inputs.
/// Level `d` applies each function to at least one node of level `d - 1`.
/// The candidate list is built once per set of inputs.
#[derive(Debug, Clone)]
pub struct ExhaustiveFunctions {
    max_depth: usize,
    built: Option<(usize, Vec<NodeId>)>,
}


impl ExhaustiveFunctions {
    /// Enumerate applications up to depth `max_depth`.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth, built: None }
    }


    fn build(&self, universe: &mut Universe, inputs: &[NodeId]) -> Result<Vec<NodeId>> {
        let mut pool = inputs.to_vec();
        let mut seen = pool.iter().copied().collect::<HashSet<_>>();
        let mut previous = pool.clone();

        for _ in 0..self.max_depth {
            let fresh = previous.iter().copied().collect::<HashSet<_>>();
            let mut level = Vec::new();
            for function in Function::templates() {
                let mut applications = Vec::new();
                if function.arity() == 1 {
                    for &a in previous.iter() {
                        if function.accepts(0, universe.type_of(a)) {
                            applications.push(vec![a]);
                        }
                    }
                } else {
                    for (i, &a) in pool.iter().enumerate() {
                        for (j, &b) in pool.iter().enumerate() {
                            if i == j || (function.is_commutative() && j < i) {
                                continue;
                            }
                            if !fresh.contains(&a) && !fresh.contains(&b) {
                                continue;
                            }
                            if function.accepts(0, universe.type_of(a))
                                && function.accepts(1, universe.type_of(b))
                            {
                                applications.push(vec![a, b]);
                            }
                        }
                    }
                }

                for arguments in applications {
                    let node = universe.make_function_node(function.clone(), arguments)?;
                    if seen.insert(node) {
                        level.push(node);
                    }
                }
            }
            if level.is_empty() {
                break;
            }
            pool.extend(level.iter().copied());
            previous = level;
        }
        log::debug!("enumerated {} candidates up to depth {}", pool.len(), self.max_depth);
        Ok(pool)
    }
}


impl CandidateGenerator for ExhaustiveFunctions {
    fn name(&self) -> &str {
        "Exhaustive Functions"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        Some(vec![("Max depth", format!("{}", self.max_depth))])
    }


    fn candidates(&mut self, inference: &mut LuapeInference) -> Result<Vec<NodeId>> {
        let n_inputs = inference.inputs().len();
        if let Some((n, nodes)) = &self.built {
            if *n == n_inputs {
                return Ok(nodes.clone());
            }
        }
        let inputs = inference.inputs().to_vec();
        let nodes = self.build(inference.universe_mut(), &inputs)?;
        self.built = Some((n_inputs, nodes.clone()));
        Ok(nodes)
    }
}


/// The inputs plus `count` random function applications
/// of depth at most `max_depth`, drawn anew at each round.
#[derive(Debug, Clone)]
pub struct RandomFunctions {
    count: usize,
    max_depth: usize,
    seed: u64,
    rng: StdRng,
}


impl RandomFunctions {
    /// Draw `count` candidates per round.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            max_depth: 2,
            seed: DEFAULT_SEED,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
        }
    }


    /// Set the maximal depth of the candidates.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }


    /// Set the seed of the generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }


    fn random_node(&mut self, universe: &mut Universe, inputs: &[NodeId], depth: usize)
        -> Option<NodeId>
    {
        if depth == 0 || self.rng.gen_bool(0.3) {
            return inputs.choose(&mut self.rng).copied();
        }

        let templates = Function::templates();
        let function = templates.choose(&mut self.rng)?.clone();
        let mut arguments = Vec::with_capacity(function.arity());
        for k in 0..function.arity() {
            // A few attempts to find an argument of an accepted type.
            let mut argument = None;
            for _ in 0..4 {
                let Some(a) = self.random_node(universe, inputs, depth - 1)
                    else { continue };
                if function.accepts(k, universe.type_of(a)) {
                    argument = Some(a);
                    break;
                }
            }
            arguments.push(argument?);
        }
        universe.make_function_node(function, arguments).ok()
    }
}


impl Default for RandomFunctions {
    fn default() -> Self {
        Self::new(DEFAULT_RANDOM_CANDIDATES)
    }
}


impl CandidateGenerator for RandomFunctions {
    fn name(&self) -> &str {
        "Random Functions"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        Some(vec![
            ("# of candidates", format!("{}", self.count)),
            ("Max depth", format!("{}", self.max_depth)),
            ("Seed", format!("{}", self.seed)),
        ])
    }


    fn candidates(&mut self, inference: &mut LuapeInference) -> Result<Vec<NodeId>> {
        let inputs = inference.inputs().to_vec();
        let mut nodes = inputs.clone();
        let mut seen = nodes.iter().copied().collect::<HashSet<_>>();
        if inputs.is_empty() {
            return Ok(nodes);
        }
        let universe = inference.universe_mut();
        for _ in 0..self.count {
            if let Some(node) = self.random_node(universe, &inputs, self.max_depth) {
                if seen.insert(node) {
                    nodes.push(node);
                }
            }
        }
        Ok(nodes)
    }
}
