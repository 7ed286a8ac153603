//! Memoizing scenario evaluator: at most one scoring pass per distinct
//! scenario key within a run.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Application, JobRequirements};
use crate::optimisation::models::{OptimisationResult, RelaxationChange};
use crate::optimisation::OptimisationError;
use crate::what_if::scenario::{GateMode, MatchMode};
use crate::what_if::{evaluate_applications, EvaluationOptions, EvaluationSummary, Scenario};

/// Scoring-relevant projection of a scenario.
///
/// Skill lists are sorted and floats are quantized to micro-units, so two
/// scenarios that score identically share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    min_years_override: Option<u32>,
    education_required_override: Option<bool>,
    add_must_have: Vec<String>,
    add_nice_to_have: Vec<String>,
    remove_must_have: Vec<String>,
    remove_nice_to_have: Vec<String>,
    match_mode: MatchMode,
    partial_match_weight: i64,
    must_have_gate_mode: GateMode,
    must_have_coverage_min: i64,
    include_nice_to_have: bool,
    weights_override: Option<[i64; 4]>,
    overall_score_threshold: i64,
}

pub fn cache_key(scenario: &Scenario) -> CacheKey {
    let edits = &scenario.requirement_edits;
    let rules = &scenario.evaluation_rules;
    let sorted = |skills: &[String]| {
        let mut skills = skills.to_vec();
        skills.sort();
        skills.dedup();
        skills
    };

    CacheKey {
        min_years_override: edits.min_years_override,
        education_required_override: edits.education_required_override,
        add_must_have: sorted(&edits.skills_add.must_have),
        add_nice_to_have: sorted(&edits.skills_add.nice_to_have),
        remove_must_have: sorted(&edits.skills_remove.must_have),
        remove_nice_to_have: sorted(&edits.skills_remove.nice_to_have),
        match_mode: rules.match_mode,
        partial_match_weight: quantize(rules.partial_match_weight),
        must_have_gate_mode: rules.must_have_gate_mode,
        must_have_coverage_min: quantize(rules.must_have_coverage_min),
        include_nice_to_have: rules.include_nice_to_have,
        weights_override: rules.weights_override.map(|weights| {
            [
                quantize(weights.must_have),
                quantize(weights.nice_to_have),
                quantize(weights.experience),
                quantize(weights.education),
            ]
        }),
        overall_score_threshold: quantize(scenario.optimization_params.overall_score_threshold),
    }
}

fn quantize(value: f64) -> i64 {
    (value * 1_000_000.0).round() as i64
}

#[derive(Debug, Clone, Copy)]
struct ScenarioOutcome {
    summary: EvaluationSummary,
    candidate_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationStats {
    /// Lookups, including cache hits.
    pub requested: usize,
    /// Population scoring passes actually run.
    pub scoring_runs: usize,
    pub distinct_scenarios: usize,
}

pub struct ScenarioEvaluator<'a> {
    job: &'a JobRequirements,
    applications: &'a [Application],
    cache: HashMap<CacheKey, ScenarioOutcome>,
    requested: usize,
    scoring_runs: usize,
}

impl<'a> ScenarioEvaluator<'a> {
    pub fn new(job: &'a JobRequirements, applications: &'a [Application]) -> Self {
        Self {
            job,
            applications,
            cache: HashMap::new(),
            requested: 0,
            scoring_runs: 0,
        }
    }

    fn outcome(&mut self, scenario: &Scenario) -> Result<ScenarioOutcome, OptimisationError> {
        self.requested += 1;
        let key = cache_key(scenario);
        if let Some(outcome) = self.cache.get(&key) {
            return Ok(*outcome);
        }

        let evaluation = evaluate_applications(
            self.applications,
            self.job,
            scenario,
            EvaluationOptions::default(),
        )?;
        self.scoring_runs += 1;

        let outcome = ScenarioOutcome {
            summary: evaluation.summary,
            candidate_count: evaluation.summary.applications_passed,
        };
        self.cache.insert(key, outcome);
        Ok(outcome)
    }

    /// Scores `scenario` (or reuses a cached score) and packages it as a result.
    pub fn make_result(
        &mut self,
        scenario: Scenario,
        changes: Vec<RelaxationChange>,
        cost: f64,
    ) -> Result<OptimisationResult, OptimisationError> {
        let outcome = self.outcome(&scenario)?;
        Ok(OptimisationResult {
            candidate_count: outcome.candidate_count,
            cost,
            changes,
            scenario,
            summary: outcome.summary,
        })
    }

    pub fn stats(&self) -> EvaluationStats {
        EvaluationStats {
            requested: self.requested,
            scoring_runs: self.scoring_runs,
            distinct_scenarios: self.cache.len(),
        }
    }
}
