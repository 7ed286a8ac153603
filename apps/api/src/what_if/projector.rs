//! Requirement Projector: effective requirements under a scenario, and the
//! shock report diffing them against the base job.

use serde::Serialize;

use crate::models::JobRequirements;
use crate::what_if::Scenario;

/// Must-have and nice-to-have lists after a scenario's skill edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveRequirements {
    pub must_have: Vec<String>,
    pub nice_to_have: Vec<String>,
}

/// Removals first (union of both remove lists), then additions.
///
/// Base order is preserved and additions append in edit order. Adding a
/// nice-to-have skill to must-have promotes it; a nice-to-have addition is
/// skipped when the skill is already required.
pub fn apply_skill_edits(job: &JobRequirements, scenario: &Scenario) -> EffectiveRequirements {
    let add = &scenario.requirement_edits.skills_add;
    let remove = &scenario.requirement_edits.skills_remove;
    let removed =
        |skill: &&String| remove.must_have.contains(skill) || remove.nice_to_have.contains(skill);

    let mut must_have: Vec<String> = job
        .must_have_skills
        .iter()
        .filter(|skill| !removed(skill))
        .cloned()
        .collect();
    let mut nice_to_have: Vec<String> = job
        .nice_to_have_skills
        .iter()
        .filter(|skill| !removed(skill))
        .cloned()
        .collect();

    for skill in &add.must_have {
        if !must_have.contains(skill) {
            must_have.push(skill.clone());
        }
        nice_to_have.retain(|existing| existing != skill);
    }
    for skill in &add.nice_to_have {
        if !nice_to_have.contains(skill) && !must_have.contains(skill) {
            nice_to_have.push(skill.clone());
        }
    }

    EffectiveRequirements {
        must_have,
        nice_to_have,
    }
}

/// Minimum years in force: the override when set, otherwise the job's value.
pub fn effective_min_years(job: &JobRequirements, scenario: &Scenario) -> f64 {
    scenario
        .requirement_edits
        .min_years_override
        .map(f64::from)
        .unwrap_or_else(|| job.base_min_years())
}

pub fn effective_education_required(job: &JobRequirements, scenario: &Scenario) -> bool {
    scenario
        .requirement_edits
        .education_required_override
        .unwrap_or_else(|| job.education_required())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinYearsShift {
    pub from: f64,
    pub to: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationShift {
    pub from: bool,
    pub to: bool,
}

/// How a scenario changes the base requirements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShockReport {
    pub min_years: MinYearsShift,
    pub education_required: EducationShift,
    pub must_have_added: Vec<String>,
    pub must_have_removed: Vec<String>,
    pub nice_to_have_added: Vec<String>,
    pub nice_to_have_removed: Vec<String>,
}

pub fn build_shock_report(job: &JobRequirements, scenario: &Scenario) -> ShockReport {
    let effective = apply_skill_edits(job, scenario);
    let base_years = job.base_min_years();
    let years = effective_min_years(job, scenario);

    ShockReport {
        min_years: MinYearsShift {
            from: base_years,
            to: years,
            delta: years - base_years,
        },
        education_required: EducationShift {
            from: job.education_required(),
            to: effective_education_required(job, scenario),
        },
        must_have_added: difference(&effective.must_have, &job.must_have_skills),
        must_have_removed: difference(&job.must_have_skills, &effective.must_have),
        nice_to_have_added: difference(&effective.nice_to_have, &job.nice_to_have_skills),
        nice_to_have_removed: difference(&job.nice_to_have_skills, &effective.nice_to_have),
    }
}

/// Items of `left` absent from `right`, in `left` order.
fn difference(left: &[String], right: &[String]) -> Vec<String> {
    left.iter()
        .filter(|skill| !right.contains(skill))
        .cloned()
        .collect()
}
