//! Optimisation payload model and its exhaustive validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::optimisation::OptimisationError;
use crate::payload::{self, Errors};
use crate::what_if::scenario::{normalize_weights, ScoreWeights};
use crate::what_if::{EvaluationSummary, Scenario};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_TOTAL_CHANGES: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Relaxation kinds
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxationKind {
    RemoveNiceToHave,
    RemoveMustHave,
    DemoteMustToNice,
    LowerMinYears,
    DisableEducation,
    AllowPartials,
    IncreasePartialWeight,
    LowerCoverageMin,
    LowerThreshold,
    WeightsOverride,
}

impl RelaxationKind {
    pub const ALL: [RelaxationKind; 10] = [
        RelaxationKind::RemoveNiceToHave,
        RelaxationKind::RemoveMustHave,
        RelaxationKind::DemoteMustToNice,
        RelaxationKind::LowerMinYears,
        RelaxationKind::DisableEducation,
        RelaxationKind::AllowPartials,
        RelaxationKind::IncreasePartialWeight,
        RelaxationKind::LowerCoverageMin,
        RelaxationKind::LowerThreshold,
        RelaxationKind::WeightsOverride,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelaxationKind::RemoveNiceToHave => "remove_nice_to_have",
            RelaxationKind::RemoveMustHave => "remove_must_have",
            RelaxationKind::DemoteMustToNice => "demote_must_to_nice",
            RelaxationKind::LowerMinYears => "lower_min_years",
            RelaxationKind::DisableEducation => "disable_education",
            RelaxationKind::AllowPartials => "allow_partials",
            RelaxationKind::IncreasePartialWeight => "increase_partial_weight",
            RelaxationKind::LowerCoverageMin => "lower_coverage_min",
            RelaxationKind::LowerThreshold => "lower_threshold",
            RelaxationKind::WeightsOverride => "weights_override",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }

    /// Enumeration order only; lower comes first. Never affects cost.
    pub fn priority(self) -> u8 {
        match self {
            RelaxationKind::RemoveNiceToHave => 1,
            RelaxationKind::DemoteMustToNice => 2,
            RelaxationKind::RemoveMustHave => 3,
            RelaxationKind::WeightsOverride => 5,
            _ => 4,
        }
    }

    pub fn default_cost(self) -> f64 {
        match self {
            RelaxationKind::RemoveMustHave => 3.0,
            RelaxationKind::DemoteMustToNice
            | RelaxationKind::DisableEducation
            | RelaxationKind::WeightsOverride => 2.0,
            _ => 1.0,
        }
    }

    /// Kinds that count against `max_skill_changes`.
    pub fn touches_skills(self) -> bool {
        matches!(
            self,
            RelaxationKind::RemoveNiceToHave
                | RelaxationKind::RemoveMustHave
                | RelaxationKind::DemoteMustToNice
        )
    }
}

impl fmt::Display for RelaxationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost per relaxation kind, defaults filled in for every kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CostTable(BTreeMap<RelaxationKind, f64>);

impl Default for CostTable {
    fn default() -> Self {
        Self(
            RelaxationKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.default_cost()))
                .collect(),
        )
    }
}

impl CostTable {
    pub fn cost(&self, kind: RelaxationKind) -> f64 {
        self.0.get(&kind).copied().unwrap_or(1.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Bounds for one stepped scalar. `None` means unbounded, or no step at all
/// (in which case the matching relaxation is never offered).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RangeConstraint {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

impl RangeConstraint {
    fn floor_step(min: f64, step: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
            step: Some(step),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimisationConstraints {
    pub max_total_changes: usize,
    pub max_skill_changes: Option<usize>,
    pub allowed_relaxations: Vec<RelaxationKind>,
    pub min_years_override: RangeConstraint,
    pub overall_score_threshold: RangeConstraint,
    pub partial_match_weight: RangeConstraint,
    pub must_have_coverage_min: RangeConstraint,
    pub weights_override_options: Vec<ScoreWeights>,
}

impl Default for OptimisationConstraints {
    fn default() -> Self {
        Self {
            max_total_changes: DEFAULT_MAX_TOTAL_CHANGES,
            max_skill_changes: None,
            allowed_relaxations: RelaxationKind::ALL.to_vec(),
            min_years_override: RangeConstraint::floor_step(0.0, 1.0),
            overall_score_threshold: RangeConstraint::floor_step(0.0, 5.0),
            partial_match_weight: RangeConstraint {
                min: None,
                max: Some(1.0),
                step: Some(0.1),
            },
            must_have_coverage_min: RangeConstraint::floor_step(0.0, 0.1),
            weights_override_options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    #[default]
    AtLeast,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimisationTarget {
    pub candidate_count: Option<usize>,
    pub mode: TargetMode,
}

/// Strategy name (trimmed, lowercased) and its raw options. Resolved by the
/// strategy factory, which owns option validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategySpec {
    pub name: String,
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimisationConfig {
    pub target: OptimisationTarget,
    pub strategy: StrategySpec,
    pub constraints: OptimisationConstraints,
    pub costs: CostTable,
    pub top_k: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Search records
// ────────────────────────────────────────────────────────────────────────────

/// One applied relaxation, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelaxationChange {
    #[serde(rename = "type")]
    pub kind: RelaxationKind,
    pub detail: Value,
    pub cost: f64,
}

/// A scored point in the search space. Built once by the evaluator and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimisationResult {
    pub candidate_count: usize,
    pub cost: f64,
    pub changes: Vec<RelaxationChange>,
    #[serde(rename = "normalized_scenario")]
    pub scenario: Scenario,
    pub summary: EvaluationSummary,
}

// ────────────────────────────────────────────────────────────────────────────
// Loading
// ────────────────────────────────────────────────────────────────────────────

/// Parses and validates a raw optimisation payload, collecting every problem.
pub fn load_optimisation_config(raw: &Value) -> Result<OptimisationConfig, OptimisationError> {
    let Value::Object(raw) = raw else {
        return Err(OptimisationError::Validation(vec![
            "Optimisation payload must be an object.".to_string(),
        ]));
    };
    let mut errors: Errors = Vec::new();

    let target = parse_target(raw.get("target"), &mut errors);
    let strategy = parse_strategy(raw.get("strategy"), &mut errors);
    let constraints = parse_constraints(raw.get("constraints"), &mut errors);
    let costs = parse_costs(raw.get("costs"), &mut errors);
    let top_k = payload::positive_integer(raw.get("top_k"), "top_k", &mut errors)
        .map_or(DEFAULT_TOP_K, |top_k| top_k as usize);

    if !errors.is_empty() {
        return Err(OptimisationError::Validation(errors));
    }

    Ok(OptimisationConfig {
        target,
        strategy,
        constraints,
        costs,
        top_k,
    })
}

fn parse_target(raw: Option<&Value>, errors: &mut Errors) -> OptimisationTarget {
    let mut target = OptimisationTarget::default();
    let Some(raw) = payload::object(raw, "target", errors) else {
        return target;
    };

    target.candidate_count = payload::positive_integer(
        raw.get("candidate_count"),
        "target.candidate_count",
        errors,
    )
    .map(|count| count as usize);

    match raw.get("mode") {
        None | Some(Value::Null) => {}
        Some(Value::String(mode)) if mode.trim().eq_ignore_ascii_case("at_least") => {}
        Some(Value::String(_)) => errors.push("target.mode must be at_least.".to_string()),
        Some(_) => errors.push("target.mode must be a string.".to_string()),
    }
    target
}

fn parse_strategy(raw: Option<&Value>, errors: &mut Errors) -> StrategySpec {
    let Some(Value::Object(raw)) = raw else {
        errors.push("strategy must be an object.".to_string());
        return StrategySpec::default();
    };

    let name = match raw.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_lowercase(),
        _ => {
            errors.push("strategy.name is required.".to_string());
            String::new()
        }
    };
    let options = payload::object(raw.get("options"), "strategy.options", errors)
        .cloned()
        .unwrap_or_default();

    StrategySpec { name, options }
}

fn parse_constraints(raw: Option<&Value>, errors: &mut Errors) -> OptimisationConstraints {
    let mut constraints = OptimisationConstraints::default();
    let Some(raw) = payload::object(raw, "constraints", errors) else {
        return constraints;
    };

    if let Some(max_total) = payload::positive_integer(
        raw.get("max_total_changes"),
        "constraints.max_total_changes",
        errors,
    ) {
        constraints.max_total_changes = max_total as usize;
    }
    constraints.max_skill_changes = payload::positive_integer(
        raw.get("max_skill_changes"),
        "constraints.max_skill_changes",
        errors,
    )
    .map(|max_skill| max_skill as usize);

    match raw.get("allowed_relaxations") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            let mut allowed = Vec::new();
            for item in items {
                let Value::String(name) = item else {
                    errors.push("constraints.allowed_relaxations items must be strings.".to_string());
                    continue;
                };
                match RelaxationKind::parse(name) {
                    Some(kind) if !allowed.contains(&kind) => allowed.push(kind),
                    Some(_) => {}
                    None => errors.push(format!("Unknown relaxation: {name}.")),
                }
            }
            if !allowed.is_empty() {
                constraints.allowed_relaxations = allowed;
            }
        }
        Some(_) => errors.push("constraints.allowed_relaxations must be a list.".to_string()),
    }

    for (key, range) in [
        ("min_years_override", &mut constraints.min_years_override),
        ("overall_score_threshold", &mut constraints.overall_score_threshold),
        ("partial_match_weight", &mut constraints.partial_match_weight),
        ("must_have_coverage_min", &mut constraints.must_have_coverage_min),
    ] {
        *range = parse_range(raw.get(key), &format!("constraints.{key}"), *range, errors);
    }

    match raw.get("weights_override_options") {
        None | Some(Value::Null) => {}
        Some(Value::Array(options)) => {
            for (index, option) in options.iter().enumerate() {
                if !option.is_object() {
                    errors.push(
                        "constraints.weights_override_options items must be objects.".to_string(),
                    );
                    continue;
                }
                let label = format!("constraints.weights_override_options[{index}]");
                if let Some(weights) = normalize_weights(Some(option), &label, errors) {
                    constraints.weights_override_options.push(weights);
                }
            }
        }
        Some(_) => errors.push("constraints.weights_override_options must be a list.".to_string()),
    }

    constraints
}

/// An absent bound keeps its default; an explicit `null` clears it.
fn parse_range(
    raw: Option<&Value>,
    label: &str,
    default: RangeConstraint,
    errors: &mut Errors,
) -> RangeConstraint {
    let Some(raw) = payload::object(raw, label, errors) else {
        return default;
    };

    let bound = |key: &str, fallback: Option<f64>, errors: &mut Errors| match raw.get(key) {
        None => fallback,
        Some(Value::Null) => None,
        Some(Value::Number(number)) => number.as_f64(),
        Some(_) => {
            errors.push(format!("{label}.{key} must be a number."));
            fallback
        }
    };

    let range = RangeConstraint {
        min: bound("min", default.min, errors),
        max: bound("max", default.max, errors),
        step: bound("step", default.step, errors),
    };
    if matches!(range.step, Some(step) if step <= 0.0) {
        errors.push(format!("{label}.step must be positive."));
        return default;
    }
    range
}

fn parse_costs(raw: Option<&Value>, errors: &mut Errors) -> CostTable {
    let mut costs = CostTable::default();
    let Some(raw) = payload::object(raw, "costs", errors) else {
        return costs;
    };

    for (key, value) in raw {
        let Some(kind) = RelaxationKind::parse(key) else {
            errors.push(format!("Unknown cost key: {key}."));
            continue;
        };
        if let Some(cost) = payload::optional_number(Some(value), &format!("costs.{key}"), errors) {
            costs.0.insert(kind, cost);
        }
    }
    costs
}
