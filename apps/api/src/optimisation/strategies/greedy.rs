use tracing::debug;

use crate::optimisation::models::OptimisationResult;
use crate::optimisation::strategies::{SearchContext, SearchStrategy};
use crate::optimisation::OptimisationError;

/// Takes the single best-ranked action at each step.
///
/// Returns the baseline followed by the chosen result of each step; stops at
/// the target count, the change budget, or when nothing is left to relax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreedyStrategy;

impl SearchStrategy for GreedyStrategy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn run(
        &self,
        context: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<OptimisationResult>, OptimisationError> {
        let mut current = context.baseline_result()?;
        let mut results = vec![current.clone()];

        for step in 0..context.config.constraints.max_total_changes {
            let actions = context.space.list_actions(&current.scenario, &current.changes);
            let mut best: Option<OptimisationResult> = None;

            for action in &actions {
                let scenario = context.space.apply_action(&current.scenario, action);
                let mut changes = current.changes.clone();
                changes.push(action.to_change());
                let candidate =
                    context
                        .evaluator
                        .make_result(scenario, changes, current.cost + action.cost)?;

                // Ties keep the earlier action, so enumeration order decides.
                best = match best {
                    Some(leader) if context.compare(&candidate, &leader).is_ge() => Some(leader),
                    _ => Some(candidate),
                };
            }

            let Some(best) = best else {
                debug!(step, "greedy search exhausted the relaxation space");
                break;
            };
            let reached = best.candidate_count >= context.target_count;
            results.push(best.clone());
            current = best;
            if reached {
                break;
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{complete, run_strategy, three_of_four};
    use crate::optimisation::RelaxationKind;
    use serde_json::json;

    #[test]
    fn test_greedy_stops_once_target_met() {
        let applications = vec![complete(1, "Kim"), three_of_four(2, "Sam")];
        let (results, _) = run_strategy(
            &GreedyStrategy,
            json!({
                "target": {"candidate_count": 2},
                "strategy": {"name": "greedy"},
                "constraints": {"allowed_relaxations": ["remove_must_have", "lower_coverage_min"]}
            }),
            &applications,
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].candidate_count, 1);
        assert!(results[0].changes.is_empty());
        let best = &results[1];
        assert_eq!(best.candidate_count, 2);
        assert_eq!(best.changes.len(), 1);
        // Lowering coverage to 0.9 is cheaper but still leaves Sam gated out.
        assert_eq!(best.changes[0].kind, RelaxationKind::RemoveMustHave);
        assert_eq!(best.changes[0].detail, json!({"skill": "Skill D"}));
        assert_eq!(best.cost, 3.0);
    }

    #[test]
    fn test_greedy_walks_until_budget_without_target() {
        let applications = vec![three_of_four(1, "Sam")];
        let (results, stats) = run_strategy(
            &GreedyStrategy,
            json!({
                "target": {"candidate_count": 5},
                "strategy": {"name": "greedy"},
                "constraints": {"max_total_changes": 2, "allowed_relaxations": ["lower_threshold"]}
            }),
            &applications,
        );

        assert_eq!(results.len(), 3);
        assert_eq!(results[2].changes.len(), 2);
        assert_eq!(results[2].scenario.optimization_params.overall_score_threshold, 40.0);
        assert_eq!(stats.scoring_runs, stats.distinct_scenarios);
    }
}
