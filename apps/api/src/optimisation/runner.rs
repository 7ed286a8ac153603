//! Optimisation orchestration: validate, resolve target, search, rank, report.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::models::{Application, JobRequirements};
use crate::optimisation::evaluator::{EvaluationStats, ScenarioEvaluator};
use crate::optimisation::models::{load_optimisation_config, OptimisationResult, TargetMode};
use crate::optimisation::space::RelaxationSpace;
use crate::optimisation::strategies::{SearchContext, SearchStrategy, Strategy};
use crate::optimisation::OptimisationError;
use crate::what_if::evaluator::{CandidateResult, SummaryRow};
use crate::what_if::{
    build_shock_report, evaluate_applications, EvaluationOptions, EvaluationSummary, Scenario,
    ShockReport,
};

/// Ranks results for `target`: target-meeting first, then cheaper, then more
/// passing candidates, then higher average score.
pub fn compare_results(a: &OptimisationResult, b: &OptimisationResult, target: usize) -> Ordering {
    let misses = |result: &OptimisationResult| result.candidate_count < target;
    misses(a)
        .cmp(&misses(b))
        .then(a.cost.total_cmp(&b.cost))
        .then(b.candidate_count.cmp(&a.candidate_count))
        .then(b.summary.average_score.total_cmp(&a.summary.average_score))
}

fn default_best_only() -> bool {
    true
}

/// Caller-supplied knobs layered over the optimisation payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimisationRequestOptions {
    #[serde(default)]
    pub candidate_count: Option<i64>,
    #[serde(default)]
    pub top_k: Option<i64>,
    #[serde(default)]
    pub include_details: bool,
    #[serde(default)]
    pub include_summary_table: bool,
    /// Attach details to the top result only.
    #[serde(default = "default_best_only")]
    pub best_only: bool,
}

impl Default for OptimisationRequestOptions {
    fn default() -> Self {
        Self {
            candidate_count: None,
            top_k: None,
            include_details: false,
            include_summary_table: false,
            best_only: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub candidate_count: usize,
    pub mode: TargetMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaselineReport {
    pub candidate_count: usize,
    pub summary: EvaluationSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub result: OptimisationResult,
    pub shock_report: ShockReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<CandidateResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_table: Option<Vec<SummaryRow>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimisationReport {
    pub target: TargetReport,
    pub baseline: BaselineReport,
    pub strategy: &'static str,
    pub results: Vec<RankedResult>,
    pub evaluation: EvaluationStats,
}

/// Runs one relaxation search. Every configuration problem is reported
/// before any scoring happens.
pub fn run_optimisation(
    job: &JobRequirements,
    applications: &[Application],
    payload: &Value,
    options: &OptimisationRequestOptions,
) -> Result<OptimisationReport, OptimisationError> {
    let config = load_optimisation_config(payload)?;

    let target_count = match options.candidate_count {
        Some(count) if count > 0 => count as usize,
        Some(_) => {
            return Err(OptimisationError::configuration(
                "candidate_count override must be positive.",
            ))
        }
        None => config.target.candidate_count.ok_or_else(|| {
            OptimisationError::configuration(
                "target.candidate_count is required (or provide an override).",
            )
        })?,
    };
    let top_k = match options.top_k {
        Some(top_k) if top_k > 0 => top_k as usize,
        Some(_) => {
            return Err(OptimisationError::configuration(
                "top_k override must be positive.",
            ))
        }
        None => config.top_k,
    };
    let strategy = Strategy::from_spec(&config.strategy)?;

    let space = RelaxationSpace::new(job, &config);
    let mut evaluator = ScenarioEvaluator::new(job, applications);
    let baseline = evaluator.make_result(Scenario::default(), Vec::new(), 0.0)?;

    let mut results = {
        let mut context = SearchContext {
            space: &space,
            evaluator: &mut evaluator,
            config: &config,
            target_count,
            ranker: compare_results,
            baseline: Scenario::default(),
        };
        strategy.run(&mut context)?
    };
    results.sort_by(|a, b| compare_results(a, b, target_count));
    results.truncate(top_k);

    let detail_options = EvaluationOptions {
        include_details: options.include_details,
        include_summary_table: options.include_summary_table,
    };
    let wants_details = options.include_details || options.include_summary_table;

    let mut ranked = Vec::with_capacity(results.len());
    for (index, result) in results.into_iter().enumerate() {
        let (candidates, summary_table) = if wants_details && (index == 0 || !options.best_only) {
            let evaluation =
                evaluate_applications(applications, job, &result.scenario, detail_options)?;
            (evaluation.candidates, evaluation.summary_table)
        } else {
            (None, None)
        };
        ranked.push(RankedResult {
            shock_report: build_shock_report(job, &result.scenario),
            result,
            candidates,
            summary_table,
        });
    }

    let evaluation = evaluator.stats();
    info!(
        strategy = strategy.name(),
        target = target_count,
        baseline = baseline.candidate_count,
        best = ranked.first().map(|best| best.result.candidate_count),
        results = ranked.len(),
        scoring_runs = evaluation.scoring_runs,
        cache_requests = evaluation.requested,
        "optimisation finished"
    );

    Ok(OptimisationReport {
        target: TargetReport {
            candidate_count: target_count,
            mode: config.target.mode,
        },
        baseline: BaselineReport {
            candidate_count: baseline.candidate_count,
            summary: baseline.summary,
        },
        strategy: strategy.name(),
        results: ranked,
        evaluation,
    })
}
