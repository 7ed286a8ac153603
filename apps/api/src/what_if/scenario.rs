//! Scenario Model: canonical what-if scenario, defaults, and normalization of
//! loosely typed payloads against a job's skill catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::JobRequirements;
use crate::payload::{self, Errors};
use crate::what_if::WhatIfError;

// ────────────────────────────────────────────────────────────────────────────
// Canonical scenario types
// ────────────────────────────────────────────────────────────────────────────

pub const MIN_YEARS_OVERRIDE_MAX: i64 = 40;
pub const WEIGHTS_TOTAL: f64 = 100.0;
pub const WEIGHTS_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    FullOnly,
    PartialOk,
}

impl MatchMode {
    /// Accepts the canonical names plus the legacy shorthands `full` and `partial`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "full_only" | "full" => Some(MatchMode::FullOnly),
            "partial_ok" | "partial" => Some(MatchMode::PartialOk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    All,
    CoverageMin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    MaximizeCandidateCount,
}

/// Relative weights of the four sub-scores. Always sums to 100 once validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub must_have: f64,
    pub nice_to_have: f64,
    pub experience: f64,
    pub education: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            must_have: 45.0,
            nice_to_have: 20.0,
            experience: 20.0,
            education: 15.0,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.must_have + self.nice_to_have + self.experience + self.education
    }
}

/// Skill names per requirement bucket. Only canonical job skill names appear here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEdits {
    pub must_have: Vec<String>,
    pub nice_to_have: Vec<String>,
}

impl SkillEdits {
    pub fn is_empty(&self) -> bool {
        self.must_have.is_empty() && self.nice_to_have.is_empty()
    }

    /// Dedupes and sorts both lists so equal edit sets compare equal.
    pub fn canonicalize(&mut self) {
        for list in [&mut self.must_have, &mut self.nice_to_have] {
            list.sort();
            list.dedup();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementEdits {
    pub min_years_override: Option<u32>,
    pub education_required_override: Option<bool>,
    pub skills_add: SkillEdits,
    pub skills_remove: SkillEdits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRules {
    pub match_mode: MatchMode,
    pub partial_match_weight: f64,
    pub must_have_gate_mode: GateMode,
    pub must_have_coverage_min: f64,
    pub include_nice_to_have: bool,
    pub weights_override: Option<ScoreWeights>,
}

impl Default for EvaluationRules {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::PartialOk,
            partial_match_weight: 0.5,
            must_have_gate_mode: GateMode::CoverageMin,
            must_have_coverage_min: 1.0,
            include_nice_to_have: true,
            weights_override: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationParams {
    pub objective: Objective,
    pub overall_score_threshold: f64,
}

impl Default for OptimizationParams {
    fn default() -> Self {
        Self {
            objective: Objective::MaximizeCandidateCount,
            overall_score_threshold: 50.0,
        }
    }
}

/// Fully specified set of hypothetical edits and scoring-rule overrides.
///
/// A value type: every transformation returns a new `Scenario`, so branches of
/// a search never share mutable state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub requirement_edits: RequirementEdits,
    pub evaluation_rules: EvaluationRules,
    pub optimization_params: OptimizationParams,
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

const EDITS_BLOCK: (&str, &str) = ("requirement_edits", "scenario");
const RULES_BLOCK: (&str, &str) = ("evaluation_rules", "evaluation");
const PARAMS_BLOCK: (&str, &str) = ("optimization_params", "optimization");

/// Validates a raw scenario payload and fills every omitted field with its default.
///
/// Returns the canonical scenario plus non-fatal warnings. Validation problems are
/// collected exhaustively; with `strict` they fail the call as one
/// `WhatIfError::Validation`, otherwise the offending fields keep their defaults
/// and each problem is reported as an `ignored: …` warning.
pub fn normalize_scenario(
    raw: &Value,
    job: &JobRequirements,
    strict: bool,
) -> Result<(Scenario, Vec<String>), WhatIfError> {
    let Value::Object(raw) = raw else {
        return Err(WhatIfError::Validation(vec![
            "Scenario payload must be an object.".to_string(),
        ]));
    };

    let mut errors: Errors = Vec::new();
    let mut warnings = Vec::new();
    let mut scenario = Scenario::default();
    let catalog = SkillCatalog::from_job(job);

    let edits_raw = block(raw, EDITS_BLOCK, &mut errors);
    let rules_raw = block(raw, RULES_BLOCK, &mut errors);
    let params_raw = block(raw, PARAMS_BLOCK, &mut errors);

    // Requirement edits
    let edits = &mut scenario.requirement_edits;
    edits.min_years_override = payload::integer(
        edits_raw.get("min_years_override"),
        "min_years_override",
        &mut errors,
        0,
        MIN_YEARS_OVERRIDE_MAX,
    )
    .map(|years| years as u32);
    edits.education_required_override = payload::boolean(
        edits_raw.get("education_required_override"),
        "education_required_override",
        &mut errors,
    );
    edits.skills_add =
        normalize_skill_block(edits_raw.get("skills_add"), "skills_add", &catalog, &mut errors);
    edits.skills_remove = normalize_skill_block(
        edits_raw.get("skills_remove"),
        "skills_remove",
        &catalog,
        &mut errors,
    );

    // Evaluation rules
    let rules = &mut scenario.evaluation_rules;
    if let Some(mode) = payload::choice(
        rules_raw.get("match_mode"),
        "match_mode",
        &["full_only", "partial_ok", "full", "partial"],
        &mut errors,
    ) {
        if let Some(mode) = MatchMode::parse(&mode) {
            rules.match_mode = mode;
        }
    }

    let partial_weight = payload::number(
        rules_raw.get("partial_match_weight"),
        "partial_match_weight",
        &mut errors,
        0.0,
        1.0,
    );
    if let Some(weight) = partial_weight {
        rules.partial_match_weight = weight;
    }

    match payload::choice(
        rules_raw.get("must_have_gate_mode"),
        "must_have_gate_mode",
        &["all", "coverage_min"],
        &mut errors,
    )
    .as_deref()
    {
        Some("all") => rules.must_have_gate_mode = GateMode::All,
        Some("coverage_min") => rules.must_have_gate_mode = GateMode::CoverageMin,
        _ => {}
    }

    let coverage_min = payload::number(
        rules_raw.get("must_have_coverage_min"),
        "must_have_coverage_min",
        &mut errors,
        0.0,
        1.0,
    );
    if let Some(minimum) = coverage_min {
        rules.must_have_coverage_min = minimum;
    }

    if let Some(include) = payload::boolean(
        rules_raw.get("include_nice_to_have"),
        "include_nice_to_have",
        &mut errors,
    ) {
        rules.include_nice_to_have = include;
    }

    rules.weights_override = normalize_weights(
        rules_raw.get("weights_override"),
        "weights_override",
        &mut errors,
    );

    // Optimization parameters
    payload::choice(
        params_raw.get("objective"),
        "objective",
        &["maximize_candidate_count"],
        &mut errors,
    );
    if let Some(threshold) = payload::number(
        params_raw.get("overall_score_threshold"),
        "overall_score_threshold",
        &mut errors,
        0.0,
        100.0,
    ) {
        scenario.optimization_params.overall_score_threshold = threshold;
    }

    if scenario.evaluation_rules.match_mode == MatchMode::FullOnly && partial_weight.is_some() {
        warnings.push("partial_match_weight is ignored because match_mode is full_only.".to_string());
    }
    if scenario.evaluation_rules.must_have_gate_mode == GateMode::All && coverage_min.is_some() {
        warnings.push(
            "must_have_coverage_min is ignored because must_have_gate_mode is all.".to_string(),
        );
    }
    warn_on_skill_moves(&scenario.requirement_edits, job, &mut warnings);

    if !errors.is_empty() {
        if strict {
            return Err(WhatIfError::Validation(errors));
        }
        warnings.extend(errors.into_iter().map(|error| format!("ignored: {error}")));
    }

    Ok((scenario, warnings))
}

/// Validates a four-part weight object that must sum to 100 (± 0.01).
pub(crate) fn normalize_weights(
    value: Option<&Value>,
    label: &str,
    errors: &mut Errors,
) -> Option<ScoreWeights> {
    let map = match value {
        None | Some(Value::Null) => return None,
        Some(Value::Object(map)) => map,
        Some(_) => {
            errors.push(format!("{label} must be an object or null."));
            return None;
        }
    };

    let mut parts = [0.0_f64; 4];
    let mut complete = true;
    let mut any_parsed = false;
    for (slot, key) in parts
        .iter_mut()
        .zip(["must_have", "nice_to_have", "experience", "education"])
    {
        match map.get(key) {
            None => {
                errors.push(format!("{label} must include {key}."));
                complete = false;
            }
            Some(Value::Number(number)) => match number.as_f64() {
                Some(weight) if weight >= 0.0 => {
                    *slot = weight;
                    any_parsed = true;
                }
                _ => {
                    errors.push(format!("{label}.{key} must be a non-negative number."));
                    complete = false;
                }
            },
            Some(_) => {
                errors.push(format!("{label}.{key} must be a number."));
                complete = false;
            }
        }
    }

    let weights = ScoreWeights {
        must_have: parts[0],
        nice_to_have: parts[1],
        experience: parts[2],
        education: parts[3],
    };
    if any_parsed && (weights.total() - WEIGHTS_TOTAL).abs() > WEIGHTS_TOLERANCE {
        errors.push(format!("{label} weights must sum to 100."));
        return None;
    }
    complete.then_some(weights)
}

/// Resolves a top-level block by canonical name, falling back to its legacy name.
fn block<'a>(
    raw: &'a Map<String, Value>,
    (canonical, legacy): (&str, &str),
    errors: &mut Errors,
) -> &'a Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

    let (label, value) = match raw.get(canonical) {
        Some(value) if !value.is_null() => (canonical, Some(value)),
        _ => (legacy, raw.get(legacy)),
    };
    payload::object(value, label, errors).unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}

/// Case/whitespace-insensitive lookup from any spelling to the job's canonical name.
struct SkillCatalog {
    by_key: HashMap<String, String>,
}

impl SkillCatalog {
    fn from_job(job: &JobRequirements) -> Self {
        let mut by_key = HashMap::new();
        for skill in job.must_have_skills.iter().chain(&job.nice_to_have_skills) {
            let key = skill_key(skill);
            if !key.is_empty() {
                by_key.insert(key, skill.clone());
            }
        }
        Self { by_key }
    }

    fn canonical(&self, raw: &str) -> Option<&str> {
        self.by_key.get(&skill_key(raw)).map(String::as_str)
    }
}

/// Lowercased with internal whitespace collapsed to single spaces.
pub fn skill_key(skill: &str) -> String {
    skill
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_skill_block(
    value: Option<&Value>,
    label: &str,
    catalog: &SkillCatalog,
    errors: &mut Errors,
) -> SkillEdits {
    let mut edits = SkillEdits::default();
    let Some(map) = payload::object(value, label, errors) else {
        return edits;
    };

    for (key, list) in [
        ("must_have", &mut edits.must_have),
        ("nice_to_have", &mut edits.nice_to_have),
    ] {
        let items = match map.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => items,
            Some(_) => {
                errors.push(format!("{label}.{key} must be a list."));
                continue;
            }
        };

        for item in items {
            let Value::String(raw_skill) = item else {
                errors.push(format!("{label}.{key} items must be strings."));
                continue;
            };
            match catalog.canonical(raw_skill) {
                Some(canonical) => {
                    if !list.iter().any(|existing| existing == canonical) {
                        list.push(canonical.to_string());
                    }
                }
                None => errors.push(format!("{label}.{key} contains unknown skill: {raw_skill}.")),
            }
        }
    }
    edits
}

fn warn_on_skill_moves(edits: &RequirementEdits, job: &JobRequirements, warnings: &mut Vec<String>) {
    let in_must = |skill: &String| job.must_have_skills.contains(skill);
    let in_nice = |skill: &String| job.nice_to_have_skills.contains(skill);

    for skill in &edits.skills_add.must_have {
        if in_nice(skill) && !in_must(skill) {
            warnings.push(format!("Skill moved from nice_to_have to must_have: {skill}"));
        }
    }
    for skill in &edits.skills_add.nice_to_have {
        if in_must(skill) && !in_nice(skill) {
            warnings.push(format!("Skill moved from must_have to nice_to_have: {skill}"));
        }
    }
    for skill in edits
        .skills_remove
        .must_have
        .iter()
        .chain(&edits.skills_remove.nice_to_have)
    {
        if in_must(skill) || in_nice(skill) {
            warnings.push(format!("Skill removed from requirements: {skill}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::job;
    use serde_json::json;

    fn validation_errors(result: Result<(Scenario, Vec<String>), WhatIfError>) -> Vec<String> {
        match result {
            Err(WhatIfError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_payload_yields_defaults() {
        let (scenario, warnings) = normalize_scenario(&json!({}), &job(), true).unwrap();
        assert_eq!(scenario, Scenario::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let errors = validation_errors(normalize_scenario(&json!([]), &job(), false));
        assert_eq!(errors, vec!["Scenario payload must be an object.".to_string()]);
    }

    #[test]
    fn test_skill_names_canonicalized_to_job_casing() {
        let raw = json!({
            "requirement_edits": {
                "skills_remove": {"must_have": ["  skill   a ", "SKILL A"], "nice_to_have": []}
            }
        });
        let (scenario, warnings) = normalize_scenario(&raw, &job(), true).unwrap();
        assert_eq!(
            scenario.requirement_edits.skills_remove.must_have,
            vec!["Skill A".to_string()]
        );
        assert_eq!(warnings, vec!["Skill removed from requirements: Skill A".to_string()]);
    }

    #[test]
    fn test_unknown_skill_is_named_in_error() {
        let raw = json!({
            "scenario": {"skills_add": {"must_have": ["Cobol"], "nice_to_have": []}}
        });
        let errors = validation_errors(normalize_scenario(&raw, &job(), true));
        assert_eq!(
            errors,
            vec!["skills_add.must_have contains unknown skill: Cobol.".to_string()]
        );
    }

    #[test]
    fn test_all_errors_collected_together() {
        let raw = json!({
            "scenario": {"min_years_override": 99, "education_required_override": "yes"},
            "evaluation": {
                "partial_match_weight": 1.5,
                "must_have_gate_mode": "sometimes",
                "weights_override": {"must_have": 50, "nice_to_have": 20, "experience": 20, "education": 20}
            },
            "optimization": {"overall_score_threshold": -1}
        });
        let errors = validation_errors(normalize_scenario(&raw, &job(), true));
        assert_eq!(errors.len(), 6, "{errors:?}");
        assert!(errors.contains(&"min_years_override must be between 0 and 40.".to_string()));
        assert!(errors.contains(&"weights_override weights must sum to 100.".to_string()));
    }

    #[test]
    fn test_non_strict_keeps_defaults_and_reports_ignored() {
        let raw = json!({"evaluation": {"partial_match_weight": 3}});
        let (scenario, warnings) = normalize_scenario(&raw, &job(), false).unwrap();
        assert_eq!(scenario.evaluation_rules.partial_match_weight, 0.5);
        assert_eq!(
            warnings,
            vec!["ignored: partial_match_weight must be between 0 and 1.".to_string()]
        );
    }

    #[test]
    fn test_match_mode_synonyms() {
        for (raw_mode, expected) in [
            ("full", MatchMode::FullOnly),
            ("FULL_ONLY", MatchMode::FullOnly),
            ("partial", MatchMode::PartialOk),
            ("partial_ok", MatchMode::PartialOk),
        ] {
            let raw = json!({"evaluation_rules": {"match_mode": raw_mode}});
            let (scenario, _) = normalize_scenario(&raw, &job(), true).unwrap();
            assert_eq!(scenario.evaluation_rules.match_mode, expected, "{raw_mode}");
        }
    }

    #[test]
    fn test_ignored_field_warnings() {
        let raw = json!({
            "evaluation": {
                "match_mode": "full_only",
                "partial_match_weight": 0.7,
                "must_have_gate_mode": "all",
                "must_have_coverage_min": 0.5
            }
        });
        let (_, warnings) = normalize_scenario(&raw, &job(), true).unwrap();
        assert_eq!(
            warnings,
            vec![
                "partial_match_weight is ignored because match_mode is full_only.".to_string(),
                "must_have_coverage_min is ignored because must_have_gate_mode is all.".to_string(),
            ]
        );
    }

    #[test]
    fn test_skill_move_warnings() {
        let raw = json!({
            "scenario": {
                "skills_add": {"must_have": ["skill e"], "nice_to_have": ["Skill B"]}
            }
        });
        let (_, warnings) = normalize_scenario(&raw, &job(), true).unwrap();
        assert_eq!(
            warnings,
            vec![
                "Skill moved from nice_to_have to must_have: Skill E".to_string(),
                "Skill moved from must_have to nice_to_have: Skill B".to_string(),
            ]
        );
    }

    #[test]
    fn test_integral_float_years_accepted() {
        let raw = json!({"scenario": {"min_years_override": 2.0}});
        let (scenario, _) = normalize_scenario(&raw, &job(), true).unwrap();
        assert_eq!(scenario.requirement_edits.min_years_override, Some(2));
    }

    #[test]
    fn test_weights_sum_tolerance() {
        let mut errors = Vec::new();
        let near = json!({"must_have": 45.005, "nice_to_have": 20, "experience": 20, "education": 15});
        assert!(normalize_weights(Some(&near), "w", &mut errors).is_some());
        let off = json!({"must_have": 45.02, "nice_to_have": 20, "experience": 20, "education": 15});
        assert!(normalize_weights(Some(&off), "w", &mut errors).is_none());
        assert_eq!(errors, vec!["w weights must sum to 100.".to_string()]);
    }

    #[test]
    fn test_weights_missing_key_reported() {
        let mut errors = Vec::new();
        let partial = json!({"must_have": 80, "nice_to_have": 20});
        assert!(normalize_weights(Some(&partial), "w", &mut errors).is_none());
        assert!(errors.contains(&"w must include experience.".to_string()));
        assert!(errors.contains(&"w must include education.".to_string()));
    }

    #[test]
    fn test_canonical_block_name_wins_over_legacy() {
        let raw = json!({
            "evaluation_rules": {"must_have_coverage_min": 0.4},
            "evaluation": {"must_have_coverage_min": 0.9}
        });
        let (scenario, _) = normalize_scenario(&raw, &job(), true).unwrap();
        assert_eq!(scenario.evaluation_rules.must_have_coverage_min, 0.4);
    }

    #[test]
    fn test_normalized_scenario_roundtrips_through_serde() {
        let raw = json!({
            "scenario": {"min_years_override": 1, "skills_remove": {"must_have": ["Skill D"]}},
            "evaluation": {"weights_override": {"must_have": 40, "nice_to_have": 10, "experience": 30, "education": 20}}
        });
        let (scenario, _) = normalize_scenario(&raw, &job(), true).unwrap();
        let echoed = serde_json::to_value(&scenario).unwrap();
        let (again, _) = normalize_scenario(&echoed, &job(), true).unwrap();
        assert_eq!(again, scenario);
    }
}
