//! Search strategies behind one interface, and the factory resolving them by name.

pub mod beam;
pub mod greedy;
pub mod monte_carlo;

use std::cmp::Ordering;

use crate::optimisation::evaluator::ScenarioEvaluator;
use crate::optimisation::models::{OptimisationConfig, OptimisationResult, StrategySpec};
use crate::optimisation::space::RelaxationSpace;
use crate::optimisation::OptimisationError;
use crate::payload::{self, Errors};
use crate::what_if::Scenario;

pub use beam::BeamStrategy;
pub use greedy::GreedyStrategy;
pub use monte_carlo::MonteCarloStrategy;

/// Orders two results for a given target count; `Less` ranks first.
pub type Ranker = fn(&OptimisationResult, &OptimisationResult, usize) -> Ordering;

/// Everything a strategy may touch during one run.
pub struct SearchContext<'s, 'a> {
    pub space: &'s RelaxationSpace<'a>,
    pub evaluator: &'s mut ScenarioEvaluator<'a>,
    pub config: &'a OptimisationConfig,
    pub target_count: usize,
    pub ranker: Ranker,
    pub baseline: Scenario,
}

impl SearchContext<'_, '_> {
    pub fn compare(&self, a: &OptimisationResult, b: &OptimisationResult) -> Ordering {
        (self.ranker)(a, b, self.target_count)
    }

    pub fn baseline_result(&mut self) -> Result<OptimisationResult, OptimisationError> {
        self.evaluator.make_result(self.baseline.clone(), Vec::new(), 0.0)
    }
}

pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    /// Returns every result the strategy wants ranked, baseline included.
    fn run(
        &self,
        context: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<OptimisationResult>, OptimisationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    Greedy(GreedyStrategy),
    Beam(BeamStrategy),
    MonteCarlo(MonteCarloStrategy),
}

impl Strategy {
    /// Resolves a validated strategy spec. Unknown names and malformed
    /// options are configuration errors.
    pub fn from_spec(spec: &StrategySpec) -> Result<Self, OptimisationError> {
        let mut errors: Errors = Vec::new();
        let option = |key: &str| spec.options.get(key);

        let strategy = match spec.name.as_str() {
            "greedy" => Strategy::Greedy(GreedyStrategy),
            "beam" => {
                let beam_width = payload::positive_integer(
                    option("beam_width"),
                    "strategy.options.beam_width",
                    &mut errors,
                );
                Strategy::Beam(BeamStrategy::new(beam_width.map(|width| width as usize)))
            }
            "monte_carlo" => {
                let max_runs = payload::positive_integer(
                    option("max_runs"),
                    "strategy.options.max_runs",
                    &mut errors,
                );
                let seed = payload::integer(
                    option("seed"),
                    "strategy.options.seed",
                    &mut errors,
                    i64::MIN,
                    i64::MAX,
                );
                Strategy::MonteCarlo(MonteCarloStrategy::new(
                    max_runs.map(|runs| runs as usize),
                    // Negative seeds reinterpret their bits.
                    seed.map(|seed| seed as u64),
                ))
            }
            other => {
                return Err(OptimisationError::configuration(format!(
                    "Unknown strategy: {other}."
                )))
            }
        };

        if errors.is_empty() {
            Ok(strategy)
        } else {
            Err(OptimisationError::Configuration(errors))
        }
    }
}

impl SearchStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Greedy(inner) => inner.name(),
            Strategy::Beam(inner) => inner.name(),
            Strategy::MonteCarlo(inner) => inner.name(),
        }
    }

    fn run(
        &self,
        context: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<OptimisationResult>, OptimisationError> {
        match self {
            Strategy::Greedy(inner) => inner.run(context),
            Strategy::Beam(inner) => inner.run(context),
            Strategy::MonteCarlo(inner) => inner.run(context),
        }
    }
}
