//! Shared test data: one job with four must-have and two nice-to-have skills,
//! and applications built from explicit full/partial/missing lists.

use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::models::{
    application::ExperienceMatch, Application, EducationEntry, JobRequirements, MatchBucket,
    MatchData, RequiredEducation,
};
use crate::optimisation::evaluator::{EvaluationStats, ScenarioEvaluator};
use crate::optimisation::runner::compare_results;
use crate::optimisation::strategies::{SearchContext, SearchStrategy};
use crate::optimisation::{load_optimisation_config, OptimisationResult, RelaxationSpace};
use crate::what_if::Scenario;

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn job() -> JobRequirements {
    JobRequirements {
        must_have_skills: owned(&["Skill A", "Skill B", "Skill C", "Skill D"]),
        nice_to_have_skills: owned(&["Skill E", "Skill F"]),
        minimum_years_experience: Some(3.0),
        required_education: Some(RequiredEducation {
            level: Some("Bachelor's degree".to_string()),
            field: Some("Computer Science or related".to_string()),
            required: true,
        }),
    }
}

pub fn bucket(full: &[&str], partial: &[&str], missing: &[&str]) -> MatchBucket {
    MatchBucket::Classified {
        full_matches: owned(full),
        partial_matches: owned(partial),
        missing_skills: owned(missing),
    }
}

pub fn match_data(must: MatchBucket, nice: MatchBucket) -> MatchData {
    MatchData {
        must_have_skills: Some(must),
        nice_to_have_skills: Some(nice),
        minimum_years_experience: Some(ExperienceMatch {
            candidate_years: Some(3.0),
        }),
        recommendation: Some("Consider".to_string()),
    }
}

pub fn application(id: i64, name: &str, data: MatchData, original_score: f64) -> Application {
    Application {
        id,
        candidate_id: Some(id),
        candidate_name: Some(name.to_string()),
        job_title: "DevOps".to_string(),
        company: "CloudScale".to_string(),
        match_data: Some(data),
        education: vec![EducationEntry {
            study_type: Some("Bachelor's degree".to_string()),
            area: Some("Computer Science".to_string()),
        }],
        overall_score: Some(original_score),
        created_at: Utc.with_ymd_and_hms(2024, 1, id as u32, 12, 0, 0).single(),
    }
}

/// Candidate covering A, B and C fully and missing D, with no nice-to-haves.
pub fn three_of_four(id: i64, name: &str) -> Application {
    application(
        id,
        name,
        match_data(
            bucket(&["Skill A", "Skill B", "Skill C"], &[], &["Skill D"]),
            bucket(&[], &[], &["Skill E", "Skill F"]),
        ),
        40.0,
    )
}

/// Candidate covering every must-have skill and both nice-to-haves.
pub fn complete(id: i64, name: &str) -> Application {
    application(
        id,
        name,
        match_data(
            bucket(&["Skill A", "Skill B", "Skill C", "Skill D"], &[], &[]),
            bucket(&["Skill E", "Skill F"], &[], &[]),
        ),
        90.0,
    )
}

/// Runs one strategy over `applications` with a config parsed from `payload`.
pub fn run_strategy(
    strategy: &impl SearchStrategy,
    payload: Value,
    applications: &[Application],
) -> (Vec<OptimisationResult>, EvaluationStats) {
    let job = job();
    let config = load_optimisation_config(&payload).unwrap();
    let target_count = config.target.candidate_count.unwrap_or(1);
    let space = RelaxationSpace::new(&job, &config);
    let mut evaluator = ScenarioEvaluator::new(&job, applications);

    let results = {
        let mut context = SearchContext {
            space: &space,
            evaluator: &mut evaluator,
            config: &config,
            target_count,
            ranker: compare_results,
            baseline: Scenario::default(),
        };
        strategy.run(&mut context).unwrap()
    };
    (results, evaluator.stats())
}
