use std::collections::HashSet;

use tracing::debug;

use crate::optimisation::evaluator::cache_key;
use crate::optimisation::models::OptimisationResult;
use crate::optimisation::strategies::{SearchContext, SearchStrategy};
use crate::optimisation::OptimisationError;

pub const DEFAULT_BEAM_WIDTH: usize = 5;

/// Breadth-limited search keeping the `beam_width` best plans per round.
///
/// Every distinct scenario reached is returned, not only the final beam, so
/// cheap partial solutions found early still compete in the final ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamStrategy {
    beam_width: usize,
}

impl BeamStrategy {
    pub fn new(beam_width: Option<usize>) -> Self {
        Self {
            beam_width: beam_width.unwrap_or(DEFAULT_BEAM_WIDTH),
        }
    }
}

impl SearchStrategy for BeamStrategy {
    fn name(&self) -> &'static str {
        "beam"
    }

    fn run(
        &self,
        context: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<OptimisationResult>, OptimisationError> {
        let baseline = context.baseline_result()?;
        let mut visited = HashSet::from([cache_key(&baseline.scenario)]);
        let mut all_results = vec![baseline.clone()];
        let mut beam = vec![baseline];

        for round in 0..context.config.constraints.max_total_changes {
            let mut candidates = Vec::new();

            for plan in &beam {
                for action in context.space.list_actions(&plan.scenario, &plan.changes) {
                    let scenario = context.space.apply_action(&plan.scenario, &action);
                    if !visited.insert(cache_key(&scenario)) {
                        continue;
                    }
                    let mut changes = plan.changes.clone();
                    changes.push(action.to_change());
                    let result =
                        context
                            .evaluator
                            .make_result(scenario, changes, plan.cost + action.cost)?;
                    all_results.push(result.clone());
                    candidates.push(result);
                }
            }

            if candidates.is_empty() {
                debug!(round, "beam search found no unvisited scenarios");
                break;
            }

            candidates.sort_by(|a, b| context.compare(a, b));
            candidates.truncate(self.beam_width);
            beam = candidates;
        }

        Ok(all_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{complete, run_strategy, three_of_four};
    use crate::optimisation::strategies::GreedyStrategy;
    use crate::optimisation::RelaxationKind;
    use serde_json::json;

    fn payload(strategy: &str) -> serde_json::Value {
        json!({
            "target": {"candidate_count": 2},
            "strategy": {"name": strategy},
            "constraints": {"max_total_changes": 2}
        })
    }

    #[test]
    fn test_single_removal_reaches_target() {
        let applications = vec![complete(1, "Kim"), three_of_four(2, "Sam")];
        let (results, _) = run_strategy(
            &BeamStrategy::new(None),
            json!({
                "target": {"candidate_count": 2},
                "strategy": {"name": "beam"},
                "constraints": {"max_total_changes": 1, "allowed_relaxations": ["remove_must_have"]}
            }),
            &applications,
        );

        assert_eq!(results[0].candidate_count, 1);
        // Baseline plus one result per must-have skill.
        assert_eq!(results.len(), 5);
        assert!(results.iter().any(|result| result.candidate_count == 2
            && result.changes[0].kind == RelaxationKind::RemoveMustHave));
    }

    #[test]
    fn test_beam_results_are_distinct_scenarios() {
        let applications = vec![complete(1, "Kim"), three_of_four(2, "Sam")];
        let (results, stats) = run_strategy(&BeamStrategy::new(Some(3)), payload("beam"), &applications);

        let keys: HashSet<_> = results.iter().map(|result| cache_key(&result.scenario)).collect();
        assert_eq!(keys.len(), results.len());
        assert_eq!(stats.scoring_runs, stats.distinct_scenarios);
        assert_eq!(stats.distinct_scenarios, results.len());
    }

    #[test]
    fn test_greedy_evaluates_fewer_results_than_beam() {
        let applications = vec![complete(1, "Kim"), three_of_four(2, "Sam")];
        let (greedy, _) = run_strategy(&GreedyStrategy, payload("greedy"), &applications);
        let (beam, _) = run_strategy(&BeamStrategy::new(None), payload("beam"), &applications);
        assert!(greedy.len() < beam.len());
    }
}
