//! Scoring Engine: deterministic re-scoring of stored match data.
//!
//! Every score is derived from the candidate's stored skill classification,
//! experience years and education entries; nothing here calls out to an LLM.
//! Rounding is half-to-even throughout, and bucket scores are rounded before
//! they are weighted into the overall score.

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{Application, EducationEntry, JobRequirements, MatchBucket, SkillMatch};
use crate::what_if::projector::{apply_skill_edits, effective_min_years};
use crate::what_if::scenario::{EvaluationRules, GateMode, MatchMode, ScoreWeights};
use crate::what_if::{EffectiveRequirements, Scenario, WhatIfError};

const NEUTRAL_SCORE: f64 = 50.0;
const MAX_SCORE: f64 = 100.0;
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";

// ────────────────────────────────────────────────────────────────────────────
// Result types
// ────────────────────────────────────────────────────────────────────────────

/// Classification of one requirement bucket against the effective skill list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketScore {
    pub score: f64,
    /// Rounded to 3 decimals; the gate compares this rounded value.
    pub coverage: f64,
    pub total: usize,
    pub full_count: usize,
    pub partial_count: usize,
    pub missing_count: usize,
    pub full_matches: Vec<String>,
    pub partial_matches: Vec<String>,
    pub missing_skills: Vec<String>,
    pub legacy_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceDetail {
    pub candidate_years: f64,
    pub required_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationDetail {
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateDetails {
    pub must_have: BucketScore,
    pub nice_to_have: BucketScore,
    pub experience: ExperienceDetail,
    pub education: EducationDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    pub candidate_id: Option<i64>,
    pub candidate_name: Option<String>,
    pub overall_score: f64,
    pub passed: bool,
    pub threshold: f64,
    pub must_have_gate_pass: bool,
    pub must_have_score: f64,
    pub nice_to_have_score: f64,
    pub experience_score: f64,
    pub education_score: f64,
    #[serde(flatten)]
    pub details: Option<CandidateDetails>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub applications_total: usize,
    pub applications_passed: usize,
    pub applications_failed: usize,
    pub average_score: f64,
    pub min_score: f64,
    pub max_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub id: i64,
    pub candidate: String,
    pub job_title: String,
    pub company: String,
    pub recommendation: String,
    pub created: String,
    pub original_score: f64,
    pub scenario_score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationOptions {
    pub include_details: bool,
    pub include_summary_table: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulationEvaluation {
    pub summary: EvaluationSummary,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<CandidateResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_table: Option<Vec<SummaryRow>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Population
// ────────────────────────────────────────────────────────────────────────────

/// Scores every application under `scenario` and summarizes the population.
///
/// Fails on the first application whose match data cannot support the
/// scenario; no partial result is returned.
pub fn evaluate_applications(
    applications: &[Application],
    job: &JobRequirements,
    scenario: &Scenario,
    options: EvaluationOptions,
) -> Result<PopulationEvaluation, WhatIfError> {
    let effective = apply_skill_edits(job, scenario);
    let mut warnings = Vec::new();
    let mut results = Vec::with_capacity(applications.len());
    let mut table = Vec::new();

    for application in applications {
        let result = evaluate_candidate(
            application,
            job,
            scenario,
            &effective,
            options.include_details,
            &mut warnings,
        )?;

        if options.include_summary_table {
            table.push(summary_row(application, result.overall_score));
        }
        results.push(result);
    }

    let summary = summarize(&results);
    debug!(
        total = summary.applications_total,
        passed = summary.applications_passed,
        average = summary.average_score,
        "population evaluated"
    );

    let summary_table = options.include_summary_table.then(|| {
        table.sort_by(|a, b| b.original_score.total_cmp(&a.original_score));
        table
    });

    Ok(PopulationEvaluation {
        summary,
        warnings,
        candidates: options.include_details.then_some(results),
        summary_table,
    })
}

fn summarize(results: &[CandidateResult]) -> EvaluationSummary {
    if results.is_empty() {
        return EvaluationSummary::default();
    }

    let scores = results.iter().map(|result| result.overall_score);
    let passed = results.iter().filter(|result| result.passed).count();
    let total: f64 = scores.clone().sum();

    EvaluationSummary {
        applications_total: results.len(),
        applications_passed: passed,
        applications_failed: results.len() - passed,
        average_score: round_to(total / results.len() as f64, 1),
        min_score: scores.clone().fold(f64::INFINITY, f64::min),
        max_score: scores.fold(f64::NEG_INFINITY, f64::max),
    }
}

fn summary_row(application: &Application, scenario_score: f64) -> SummaryRow {
    let recommendation = application
        .match_data
        .as_ref()
        .and_then(|data| data.recommendation.clone())
        .unwrap_or_else(|| "N/A".to_string());

    SummaryRow {
        id: application.id,
        candidate: application.candidate_name.clone().unwrap_or_default(),
        job_title: application.job_title.clone(),
        company: application.company.clone(),
        recommendation,
        created: application
            .created_at
            .map(|created| created.format(CREATED_FORMAT).to_string())
            .unwrap_or_default(),
        original_score: application.overall_score.unwrap_or(0.0),
        scenario_score,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Candidate
// ────────────────────────────────────────────────────────────────────────────

/// Scores one application against precomputed effective requirements.
///
/// Legacy-bucket warnings are appended to `warnings` once per bucket label.
pub fn evaluate_candidate(
    application: &Application,
    job: &JobRequirements,
    scenario: &Scenario,
    effective: &EffectiveRequirements,
    include_details: bool,
    warnings: &mut Vec<String>,
) -> Result<CandidateResult, WhatIfError> {
    let match_data = application.match_data.as_ref().ok_or_else(|| {
        WhatIfError::Integrity(format!(
            "Application {} is missing match_data.",
            application.id
        ))
    })?;
    let rules = &scenario.evaluation_rules;

    let must_have = score_bucket(
        &effective.must_have,
        match_data.must_have_skills.as_ref(),
        rules,
        "must_have_skills",
        warnings,
    )?;
    let nice_to_have = score_bucket(
        &effective.nice_to_have,
        match_data.nice_to_have_skills.as_ref(),
        rules,
        "nice_to_have_skills",
        warnings,
    )?;
    let gate_pass = gate_passes(&must_have, rules);

    let experience = ExperienceDetail {
        candidate_years: match_data
            .minimum_years_experience
            .as_ref()
            .and_then(|experience| experience.candidate_years)
            .unwrap_or(0.0),
        required_years: effective_min_years(job, scenario),
    };
    let experience_score = score_experience(&experience);
    let (education_score, education) = score_education(&application.education, job, scenario);

    let overall_score = score_overall(
        must_have.score,
        nice_to_have.score,
        experience_score,
        education_score,
        rules,
    );
    let threshold = scenario.optimization_params.overall_score_threshold;

    Ok(CandidateResult {
        candidate_id: application.candidate_id,
        candidate_name: application.candidate_name.clone(),
        overall_score,
        passed: gate_pass && overall_score >= threshold,
        threshold,
        must_have_gate_pass: gate_pass,
        must_have_score: must_have.score,
        nice_to_have_score: nice_to_have.score,
        experience_score,
        education_score,
        details: include_details.then(|| CandidateDetails {
            must_have,
            nice_to_have,
            experience,
            education,
        }),
    })
}

fn score_bucket(
    requirements: &[String],
    bucket: Option<&MatchBucket>,
    rules: &EvaluationRules,
    label: &str,
    warnings: &mut Vec<String>,
) -> Result<BucketScore, WhatIfError> {
    let bucket = bucket.ok_or_else(|| {
        WhatIfError::Integrity(format!("match_data.{label} is missing or invalid."))
    })?;

    let legacy_mode = bucket.is_legacy();
    if legacy_mode {
        if rules.match_mode == MatchMode::FullOnly {
            return Err(WhatIfError::Integrity(format!(
                "{label} lacks full/partial data; rerun matching for full_only mode."
            )));
        }
        let warning = format!("{label} uses legacy matched_skills only; partials cannot be separated.");
        if !warnings.contains(&warning) {
            warn!(bucket = label, "scoring legacy match data");
            warnings.push(warning);
        }
    }

    let index = bucket.index();
    let mut full_matches = Vec::new();
    let mut partial_matches = Vec::new();
    let mut missing_skills = Vec::new();
    for requirement in requirements {
        match index.classify(requirement) {
            SkillMatch::Full => full_matches.push(requirement.clone()),
            SkillMatch::Partial => partial_matches.push(requirement.clone()),
            SkillMatch::Missing => missing_skills.push(requirement.clone()),
        }
    }

    let total = requirements.len();
    let (score, coverage) = if total == 0 {
        (NEUTRAL_SCORE, 1.0)
    } else {
        let covered = match rules.match_mode {
            MatchMode::PartialOk => {
                full_matches.len() as f64 + partial_matches.len() as f64 * rules.partial_match_weight
            }
            MatchMode::FullOnly => full_matches.len() as f64,
        };
        let coverage = covered / total as f64;
        ((MAX_SCORE * coverage).round_ties_even(), coverage)
    };

    Ok(BucketScore {
        score,
        coverage: round_to(coverage, 3),
        total,
        full_count: full_matches.len(),
        partial_count: partial_matches.len(),
        missing_count: missing_skills.len(),
        full_matches,
        partial_matches,
        missing_skills,
        legacy_mode,
    })
}

fn gate_passes(must_have: &BucketScore, rules: &EvaluationRules) -> bool {
    if must_have.total == 0 {
        return true;
    }
    match (rules.must_have_gate_mode, rules.match_mode) {
        (GateMode::All, MatchMode::FullOnly) => must_have.full_count == must_have.total,
        (GateMode::All, MatchMode::PartialOk) => must_have.missing_count == 0,
        (GateMode::CoverageMin, _) => must_have.coverage >= rules.must_have_coverage_min,
    }
}

fn score_experience(experience: &ExperienceDetail) -> f64 {
    if experience.required_years == 0.0 {
        return NEUTRAL_SCORE;
    }
    let ratio = MAX_SCORE * experience.candidate_years / experience.required_years;
    ratio.round_ties_even().min(MAX_SCORE)
}

fn score_education(
    entries: &[EducationEntry],
    job: &JobRequirements,
    scenario: &Scenario,
) -> (f64, EducationDetail) {
    let required = job.required_level().map(str::to_string);
    let detail = |reason, candidate: Option<String>, required: Option<String>| EducationDetail {
        reason,
        candidate,
        required,
    };

    match scenario.requirement_edits.education_required_override {
        Some(false) => return (NEUTRAL_SCORE, detail("Education requirement disabled.", None, None)),
        None if !job.education_required() => {
            return (
                NEUTRAL_SCORE,
                detail("No education requirement in base job.", None, None),
            )
        }
        _ => {}
    }

    let required_rank = degree_rank(job.required_level());
    if required_rank == 0 {
        return (NEUTRAL_SCORE, detail("Education level is unclear.", None, required));
    }

    let Some(best) = best_education(entries) else {
        return (0.0, detail("No education found.", None, required));
    };

    let summary = Some(best.summary);
    if best.rank >= required_rank && field_matches(&best.area, job.required_field()) {
        (MAX_SCORE, detail("Meets education requirement.", summary, required))
    } else if best.rank < required_rank {
        (0.0, detail("Education level below requirement.", summary, required))
    } else {
        (NEUTRAL_SCORE, detail("Education field match is unclear.", summary, required))
    }
}

struct BestEducation {
    rank: u8,
    summary: String,
    area: String,
}

/// Highest-ranked entry; the first one wins among equal ranks.
fn best_education(entries: &[EducationEntry]) -> Option<BestEducation> {
    let mut best: Option<BestEducation> = None;
    for entry in entries {
        let study_type = entry.study_type.as_deref().unwrap_or_default();
        let area = entry.area.as_deref().unwrap_or_default();
        let rank = degree_rank(Some(study_type));
        if rank > best.as_ref().map_or(0, |current| current.rank) {
            best = Some(BestEducation {
                rank,
                summary: format!("{study_type} in {area}").trim().to_string(),
                area: area.to_string(),
            });
        }
    }
    best
}

/// Ordinal rank of a free-text degree: 5 doctorate down to 1 secondary, 0 unknown.
pub fn degree_rank(level: Option<&str>) -> u8 {
    let Some(level) = level else { return 0 };
    let text = level.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));

    if has(&["phd", "doctor"]) {
        5
    } else if has(&["master", "msc", "mba"]) {
        4
    } else if has(&["bachelor", "bsc", "ba", "bs"]) {
        3
    } else if has(&["associate"]) {
        2
    } else if has(&["high school", "secondary"]) {
        1
    } else {
        0
    }
}

pub fn field_matches(candidate_area: &str, required_field: Option<&str>) -> bool {
    let required = match required_field {
        Some(field) if !field.is_empty() => field.to_lowercase(),
        _ => return true,
    };
    if required.contains("related") {
        return !candidate_area.is_empty();
    }
    if candidate_area.is_empty() {
        return false;
    }

    let candidate = candidate_area.to_lowercase();
    required
        .split(['/', ','])
        .map(str::trim)
        .any(|token| !token.is_empty() && candidate.contains(token))
}

fn score_overall(must: f64, nice: f64, experience: f64, education: f64, rules: &EvaluationRules) -> f64 {
    let weights = effective_weights(rules);
    let weighted = must * weights.must_have
        + nice * weights.nice_to_have
        + experience * weights.experience
        + education * weights.education;
    round_to(weighted / 100.0, 1)
}

/// Override or default weights; excluding nice-to-have renormalizes the rest to 100.
pub fn effective_weights(rules: &EvaluationRules) -> ScoreWeights {
    let weights = rules.weights_override.unwrap_or_default();
    if rules.include_nice_to_have {
        return weights;
    }

    let remaining = weights.must_have + weights.experience + weights.education;
    if remaining == 0.0 {
        return ScoreWeights {
            must_have: 0.0,
            nice_to_have: 0.0,
            experience: 0.0,
            education: 0.0,
        };
    }
    ScoreWeights {
        must_have: weights.must_have / remaining * 100.0,
        nice_to_have: 0.0,
        experience: weights.experience / remaining * 100.0,
        education: weights.education / remaining * 100.0,
    }
}

/// Half-to-even rounding to `places` decimals.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round_ties_even() / factor
}
