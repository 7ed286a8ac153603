use std::collections::HashSet;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::optimisation::evaluator::cache_key;
use crate::optimisation::models::OptimisationResult;
use crate::optimisation::space::RelaxationAction;
use crate::optimisation::strategies::{SearchContext, SearchStrategy};
use crate::optimisation::OptimisationError;

pub const DEFAULT_MAX_RUNS: usize = 200;

/// Random walks from the baseline, biased toward low-priority actions.
///
/// Each run takes between one and `max_total_changes` steps, choosing each
/// action with weight `1 / (1 + priority)`. A fixed `seed` makes the walk
/// sequence reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonteCarloStrategy {
    max_runs: usize,
    seed: Option<u64>,
}

impl MonteCarloStrategy {
    pub fn new(max_runs: Option<usize>, seed: Option<u64>) -> Self {
        Self {
            max_runs: max_runs.unwrap_or(DEFAULT_MAX_RUNS),
            seed,
        }
    }
}

impl SearchStrategy for MonteCarloStrategy {
    fn name(&self) -> &'static str {
        "monte_carlo"
    }

    fn run(
        &self,
        context: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<OptimisationResult>, OptimisationError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let max_steps = context.config.constraints.max_total_changes.max(1);

        let baseline = context.baseline_result()?;
        let mut visited = HashSet::from([cache_key(&baseline.scenario)]);
        let mut results = vec![baseline];

        for _ in 0..self.max_runs {
            let mut scenario = context.baseline.clone();
            let mut changes = Vec::new();
            let mut cost = 0.0;

            for _ in 0..rng.gen_range(1..=max_steps) {
                let actions = context.space.list_actions(&scenario, &changes);
                let Some(action) = weighted_pick(&actions, &mut rng) else {
                    break;
                };
                scenario = context.space.apply_action(&scenario, action);
                changes.push(action.to_change());
                cost += action.cost;
            }

            if !visited.insert(cache_key(&scenario)) {
                continue;
            }
            results.push(context.evaluator.make_result(scenario, changes, cost)?);
        }

        debug!(
            runs = self.max_runs,
            distinct = results.len(),
            "monte carlo sampling finished"
        );
        Ok(results)
    }
}

fn weighted_pick<'a, R: Rng>(actions: &'a [RelaxationAction], rng: &mut R) -> Option<&'a RelaxationAction> {
    let weights = actions
        .iter()
        .map(|action| 1.0 / (1.0 + f64::from(action.priority)));
    let index = WeightedIndex::new(weights).ok()?;
    actions.get(index.sample(rng))
}
