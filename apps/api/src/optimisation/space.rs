//! Relaxation Space: legal next relaxations for a scenario, and their effect.

use serde_json::{json, Value};

use crate::models::JobRequirements;
use crate::optimisation::models::{
    OptimisationConfig, RangeConstraint, RelaxationChange, RelaxationKind,
};
use crate::what_if::projector::{apply_skill_edits, effective_min_years};
use crate::what_if::scenario::{MatchMode, ScoreWeights};
use crate::what_if::Scenario;

/// One parameterized relaxation.
#[derive(Debug, Clone, PartialEq)]
pub enum Relaxation {
    RemoveNiceToHave { skill: String },
    RemoveMustHave { skill: String },
    DemoteMustToNice { skill: String },
    LowerMinYears { from: f64, to: u32 },
    DisableEducation,
    AllowPartials,
    IncreasePartialWeight { from: f64, to: f64 },
    LowerCoverageMin { from: f64, to: f64 },
    LowerThreshold { from: f64, to: f64 },
    WeightsOverride { weights: ScoreWeights },
}

impl Relaxation {
    pub fn kind(&self) -> RelaxationKind {
        match self {
            Relaxation::RemoveNiceToHave { .. } => RelaxationKind::RemoveNiceToHave,
            Relaxation::RemoveMustHave { .. } => RelaxationKind::RemoveMustHave,
            Relaxation::DemoteMustToNice { .. } => RelaxationKind::DemoteMustToNice,
            Relaxation::LowerMinYears { .. } => RelaxationKind::LowerMinYears,
            Relaxation::DisableEducation => RelaxationKind::DisableEducation,
            Relaxation::AllowPartials => RelaxationKind::AllowPartials,
            Relaxation::IncreasePartialWeight { .. } => RelaxationKind::IncreasePartialWeight,
            Relaxation::LowerCoverageMin { .. } => RelaxationKind::LowerCoverageMin,
            Relaxation::LowerThreshold { .. } => RelaxationKind::LowerThreshold,
            Relaxation::WeightsOverride { .. } => RelaxationKind::WeightsOverride,
        }
    }

    /// Caller-facing detail object.
    pub fn detail(&self) -> Value {
        match self {
            Relaxation::RemoveNiceToHave { skill }
            | Relaxation::RemoveMustHave { skill }
            | Relaxation::DemoteMustToNice { skill } => json!({ "skill": skill }),
            Relaxation::LowerMinYears { from, to } => json!({ "from": whole_years(*from), "to": to }),
            Relaxation::DisableEducation | Relaxation::AllowPartials => json!({}),
            Relaxation::IncreasePartialWeight { from, to }
            | Relaxation::LowerCoverageMin { from, to }
            | Relaxation::LowerThreshold { from, to } => json!({ "from": from, "to": to }),
            Relaxation::WeightsOverride { weights } => json!({ "weights": weights }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationAction {
    pub relaxation: Relaxation,
    pub cost: f64,
    pub priority: u8,
}

impl RelaxationAction {
    pub fn kind(&self) -> RelaxationKind {
        self.relaxation.kind()
    }

    pub fn to_change(&self) -> RelaxationChange {
        RelaxationChange {
            kind: self.kind(),
            detail: self.relaxation.detail(),
            cost: self.cost,
        }
    }
}

/// Enumerates and applies relaxations for one job under one configuration.
pub struct RelaxationSpace<'a> {
    job: &'a JobRequirements,
    config: &'a OptimisationConfig,
}

impl<'a> RelaxationSpace<'a> {
    pub fn new(job: &'a JobRequirements, config: &'a OptimisationConfig) -> Self {
        Self { job, config }
    }

    /// Legal next actions, ordered by (priority, cost, kind name).
    pub fn list_actions(
        &self,
        scenario: &Scenario,
        changes: &[RelaxationChange],
    ) -> Vec<RelaxationAction> {
        let allowed = &self.config.constraints.allowed_relaxations;
        let skills_open = self.skill_changes_open(changes);
        let effective = apply_skill_edits(self.job, scenario);
        let mut relaxations = Vec::new();

        if skills_open {
            if allowed.contains(&RelaxationKind::RemoveNiceToHave) {
                relaxations.extend(effective.nice_to_have.iter().map(|skill| {
                    Relaxation::RemoveNiceToHave {
                        skill: skill.clone(),
                    }
                }));
            }
            if allowed.contains(&RelaxationKind::DemoteMustToNice) {
                relaxations.extend(effective.must_have.iter().map(|skill| {
                    Relaxation::DemoteMustToNice {
                        skill: skill.clone(),
                    }
                }));
            }
            if allowed.contains(&RelaxationKind::RemoveMustHave) {
                relaxations.extend(effective.must_have.iter().map(|skill| {
                    Relaxation::RemoveMustHave {
                        skill: skill.clone(),
                    }
                }));
            }
        }

        let scalar = [
            (RelaxationKind::LowerMinYears, self.lower_min_years(scenario)),
            (RelaxationKind::DisableEducation, self.disable_education(scenario)),
            (RelaxationKind::AllowPartials, allow_partials(scenario)),
            (
                RelaxationKind::IncreasePartialWeight,
                self.increase_partial_weight(scenario),
            ),
            (RelaxationKind::LowerCoverageMin, self.lower_coverage_min(scenario)),
            (RelaxationKind::LowerThreshold, self.lower_threshold(scenario)),
        ];
        relaxations.extend(
            scalar
                .into_iter()
                .filter(|(kind, _)| allowed.contains(kind))
                .filter_map(|(_, relaxation)| relaxation),
        );

        if allowed.contains(&RelaxationKind::WeightsOverride) {
            let current = scenario.evaluation_rules.weights_override;
            relaxations.extend(
                self.config
                    .constraints
                    .weights_override_options
                    .iter()
                    .filter(|option| Some(**option) != current)
                    .map(|option| Relaxation::WeightsOverride { weights: *option }),
            );
        }

        let mut actions: Vec<RelaxationAction> = relaxations
            .into_iter()
            .map(|relaxation| {
                let kind = relaxation.kind();
                RelaxationAction {
                    relaxation,
                    cost: self.config.costs.cost(kind),
                    priority: kind.priority(),
                }
            })
            .collect();

        actions.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.cost.total_cmp(&b.cost))
                .then(a.kind().as_str().cmp(b.kind().as_str()))
        });
        actions
    }

    /// Returns a new scenario with exactly one relaxation applied and every
    /// skill list sorted and deduplicated.
    pub fn apply_action(&self, scenario: &Scenario, action: &RelaxationAction) -> Scenario {
        let mut updated = scenario.clone();
        let edits = &mut updated.requirement_edits;
        let rules = &mut updated.evaluation_rules;

        match &action.relaxation {
            Relaxation::RemoveNiceToHave { skill } => {
                edits.skills_remove.nice_to_have.push(skill.clone());
                edits.skills_add.nice_to_have.retain(|existing| existing != skill);
            }
            Relaxation::RemoveMustHave { skill } => {
                edits.skills_remove.must_have.push(skill.clone());
                edits.skills_remove.nice_to_have.push(skill.clone());
                edits.skills_add.must_have.retain(|existing| existing != skill);
                edits.skills_add.nice_to_have.retain(|existing| existing != skill);
            }
            Relaxation::DemoteMustToNice { skill } => {
                edits.skills_remove.must_have.push(skill.clone());
                edits.skills_add.nice_to_have.push(skill.clone());
            }
            Relaxation::LowerMinYears { to, .. } => edits.min_years_override = Some(*to),
            Relaxation::DisableEducation => edits.education_required_override = Some(false),
            Relaxation::AllowPartials => rules.match_mode = MatchMode::PartialOk,
            Relaxation::IncreasePartialWeight { to, .. } => rules.partial_match_weight = *to,
            Relaxation::LowerCoverageMin { to, .. } => rules.must_have_coverage_min = *to,
            Relaxation::LowerThreshold { to, .. } => {
                updated.optimization_params.overall_score_threshold = *to
            }
            Relaxation::WeightsOverride { weights } => rules.weights_override = Some(*weights),
        }

        updated.requirement_edits.skills_add.canonicalize();
        updated.requirement_edits.skills_remove.canonicalize();
        updated
    }

    fn skill_changes_open(&self, changes: &[RelaxationChange]) -> bool {
        let Some(max_skill) = self.config.constraints.max_skill_changes else {
            return true;
        };
        let used = changes.iter().filter(|change| change.kind.touches_skills()).count();
        used < max_skill
    }

    fn lower_min_years(&self, scenario: &Scenario) -> Option<Relaxation> {
        let current = effective_min_years(self.job, scenario);
        let next = step_down(current, &self.config.constraints.min_years_override)?.trunc();
        // Negative years and non-decreasing steps are never offered.
        if next < 0.0 || next >= current {
            return None;
        }
        Some(Relaxation::LowerMinYears {
            from: current,
            to: next as u32,
        })
    }

    fn disable_education(&self, scenario: &Scenario) -> Option<Relaxation> {
        match scenario.requirement_edits.education_required_override {
            Some(false) => None,
            None if !self.job.education_required() => None,
            _ => Some(Relaxation::DisableEducation),
        }
    }

    fn increase_partial_weight(&self, scenario: &Scenario) -> Option<Relaxation> {
        let rules = &scenario.evaluation_rules;
        if rules.match_mode != MatchMode::PartialOk {
            return None;
        }
        let constraint = &self.config.constraints.partial_match_weight;
        let (step, max) = constraint.step.zip(constraint.max)?;
        let from = rules.partial_match_weight;
        let to = (from + step).min(max);
        (to > from).then_some(Relaxation::IncreasePartialWeight { from, to })
    }

    fn lower_coverage_min(&self, scenario: &Scenario) -> Option<Relaxation> {
        let from = scenario.evaluation_rules.must_have_coverage_min;
        let to = step_down(from, &self.config.constraints.must_have_coverage_min)?;
        Some(Relaxation::LowerCoverageMin { from, to })
    }

    fn lower_threshold(&self, scenario: &Scenario) -> Option<Relaxation> {
        let from = scenario.optimization_params.overall_score_threshold;
        let to = step_down(from, &self.config.constraints.overall_score_threshold)?;
        Some(Relaxation::LowerThreshold { from, to })
    }
}

fn allow_partials(scenario: &Scenario) -> Option<Relaxation> {
    (scenario.evaluation_rules.match_mode != MatchMode::PartialOk)
        .then_some(Relaxation::AllowPartials)
}

/// Integral years serialize as integers.
fn whole_years(years: f64) -> Value {
    if years.fract() == 0.0 && years.abs() < i64::MAX as f64 {
        json!(years as i64)
    } else {
        json!(years)
    }
}

/// Next value one step down, or `None` without a step or below the floor
/// (floor defaults to 0).
fn step_down(current: f64, range: &RangeConstraint) -> Option<f64> {
    let step = range.step?;
    let next = current - step;
    (next >= range.min.unwrap_or(0.0)).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::job;
    use crate::optimisation::models::OptimisationConstraints;
    use crate::optimisation::load_optimisation_config;
    use crate::what_if::scenario::GateMode;
    use serde_json::json;

    fn config(constraints: Value) -> OptimisationConfig {
        load_optimisation_config(&json!({
            "strategy": {"name": "greedy"},
            "constraints": constraints
        }))
        .unwrap()
    }

    fn kinds(actions: &[RelaxationAction]) -> Vec<RelaxationKind> {
        actions.iter().map(RelaxationAction::kind).collect()
    }

    #[test]
    fn test_actions_sorted_by_priority_then_cost_then_name() {
        let config = config(json!({}));
        let job = job();
        let space = RelaxationSpace::new(&job, &config);
        let actions = space.list_actions(&Scenario::default(), &[]);

        let first_must = actions
            .iter()
            .position(|action| action.kind() == RelaxationKind::DemoteMustToNice)
            .unwrap();
        let last_nice = actions
            .iter()
            .rposition(|action| action.kind() == RelaxationKind::RemoveNiceToHave)
            .unwrap();
        assert!(last_nice < first_must);

        let scalar: Vec<RelaxationKind> = kinds(&actions)
            .into_iter()
            .filter(|kind| kind.priority() == 4)
            .collect();
        // Cost 1.0 kinds alphabetically, then disable_education at 2.0.
        assert_eq!(
            scalar,
            vec![
                RelaxationKind::IncreasePartialWeight,
                RelaxationKind::LowerCoverageMin,
                RelaxationKind::LowerMinYears,
                RelaxationKind::LowerThreshold,
                RelaxationKind::DisableEducation,
            ]
        );
    }

    #[test]
    fn test_allowed_list_filters_kinds() {
        let config = config(json!({"allowed_relaxations": ["remove_must_have"]}));
        let job = job();
        let space = RelaxationSpace::new(&job, &config);
        let actions = space.list_actions(&Scenario::default(), &[]);
        assert_eq!(actions.len(), 4);
        assert!(actions
            .iter()
            .all(|action| action.kind() == RelaxationKind::RemoveMustHave && action.cost == 3.0));
    }

    #[test]
    fn test_skill_changes_capped() {
        let config = config(json!({"max_skill_changes": 1}));
        let job = job();
        let space = RelaxationSpace::new(&job, &config);
        let change = RelaxationChange {
            kind: RelaxationKind::RemoveNiceToHave,
            detail: json!({"skill": "Skill E"}),
            cost: 1.0,
        };
        let actions = space.list_actions(&Scenario::default(), &[change]);
        assert!(!actions.is_empty());
        assert!(actions.iter().all(|action| !action.kind().touches_skills()));
    }

    #[test]
    fn test_range_floors_suppress_actions() {
        let config = config(json!({}));
        let job = job();
        let space = RelaxationSpace::new(&job, &config);
        let mut scenario = Scenario::default();
        scenario.requirement_edits.min_years_override = Some(0);
        scenario.evaluation_rules.must_have_coverage_min = 0.05;
        scenario.evaluation_rules.partial_match_weight = 1.0;
        scenario.optimization_params.overall_score_threshold = 4.0;

        let found = kinds(&space.list_actions(&scenario, &[]));
        for kind in [
            RelaxationKind::LowerMinYears,
            RelaxationKind::LowerCoverageMin,
            RelaxationKind::IncreasePartialWeight,
            RelaxationKind::LowerThreshold,
            RelaxationKind::AllowPartials,
        ] {
            assert!(!found.contains(&kind), "{kind} should be suppressed");
        }
    }

    #[test]
    fn test_mode_dependent_actions() {
        let config = config(json!({}));
        let job = job();
        let space = RelaxationSpace::new(&job, &config);
        let mut scenario = Scenario::default();
        scenario.evaluation_rules.match_mode = MatchMode::FullOnly;

        let found = kinds(&space.list_actions(&scenario, &[]));
        assert!(found.contains(&RelaxationKind::AllowPartials));
        assert!(!found.contains(&RelaxationKind::IncreasePartialWeight));
    }

    #[test]
    fn test_disable_education_offered_only_when_required() {
        let config = config(json!({}));
        let mut unrequired = job();
        unrequired.required_education = None;
        let space = RelaxationSpace::new(&unrequired, &config);
        let found = kinds(&space.list_actions(&Scenario::default(), &[]));
        assert!(!found.contains(&RelaxationKind::DisableEducation));

        let mut forced = Scenario::default();
        forced.requirement_edits.education_required_override = Some(true);
        let found = kinds(&space.list_actions(&forced, &[]));
        assert!(found.contains(&RelaxationKind::DisableEducation));
    }

    #[test]
    fn test_lower_min_years_detail() {
        let config = config(json!({"min_years_override": {"step": 1.5}}));
        let job = job();
        let space = RelaxationSpace::new(&job, &config);
        let action = space
            .list_actions(&Scenario::default(), &[])
            .into_iter()
            .find(|action| action.kind() == RelaxationKind::LowerMinYears)
            .unwrap();
        assert_eq!(action.relaxation, Relaxation::LowerMinYears { from: 3.0, to: 1 });
        assert_eq!(action.to_change().detail, json!({"from": 3, "to": 1}));
    }

    fn lower_min_years(space: &RelaxationSpace<'_>, scenario: &Scenario) -> Option<Relaxation> {
        space
            .list_actions(scenario, &[])
            .into_iter()
            .find(|action| action.kind() == RelaxationKind::LowerMinYears)
            .map(|action| action.relaxation)
    }

    #[test]
    fn test_lower_min_years_takes_exactly_one_step_above_override_cap() {
        let config = config(json!({}));
        let mut senior = job();
        senior.minimum_years_experience = Some(45.0);
        let space = RelaxationSpace::new(&senior, &config);

        assert_eq!(
            lower_min_years(&space, &Scenario::default()),
            Some(Relaxation::LowerMinYears { from: 45.0, to: 44 })
        );
    }

    #[test]
    fn test_lower_min_years_omitted_at_zero_with_negative_floor() {
        let config = config(json!({"min_years_override": {"min": -3, "step": 1}}));
        let job = job();
        let space = RelaxationSpace::new(&job, &config);

        let mut scenario = Scenario::default();
        scenario.requirement_edits.min_years_override = Some(1);
        assert_eq!(
            lower_min_years(&space, &scenario),
            Some(Relaxation::LowerMinYears { from: 1.0, to: 0 })
        );

        scenario.requirement_edits.min_years_override = Some(0);
        assert_eq!(lower_min_years(&space, &scenario), None);
    }

    #[test]
    fn test_weights_options_skip_active_override() {
        let heavy = json!({"must_have": 70, "nice_to_have": 0, "experience": 20, "education": 10});
        let light = json!({"must_have": 30, "nice_to_have": 30, "experience": 20, "education": 20});
        let config = config(json!({"weights_override_options": [heavy, light]}));
        let job = job();
        let space = RelaxationSpace::new(&job, &config);

        let mut scenario = Scenario::default();
        scenario.evaluation_rules.weights_override = Some(config.constraints.weights_override_options[0]);
        let weights: Vec<RelaxationAction> = space
            .list_actions(&scenario, &[])
            .into_iter()
            .filter(|action| action.kind() == RelaxationKind::WeightsOverride)
            .collect();
        assert_eq!(weights.len(), 1);
        assert_eq!(
            weights[0].relaxation,
            Relaxation::WeightsOverride { weights: config.constraints.weights_override_options[1] }
        );
        assert_eq!(weights[0].priority, 5);
    }

    #[test]
    fn test_apply_actions_edit_skill_lists() {
        let config = OptimisationConfig {
            target: Default::default(),
            strategy: Default::default(),
            constraints: OptimisationConstraints::default(),
            costs: Default::default(),
            top_k: 5,
        };
        let job = job();
        let space = RelaxationSpace::new(&job, &config);
        let action = |relaxation: Relaxation| RelaxationAction {
            cost: 1.0,
            priority: relaxation.kind().priority(),
            relaxation,
        };

        let demoted = space.apply_action(
            &Scenario::default(),
            &action(Relaxation::DemoteMustToNice { skill: "Skill D".into() }),
        );
        assert_eq!(demoted.requirement_edits.skills_remove.must_have, vec!["Skill D".to_string()]);
        assert_eq!(demoted.requirement_edits.skills_add.nice_to_have, vec!["Skill D".to_string()]);

        let removed = space.apply_action(
            &demoted,
            &action(Relaxation::RemoveMustHave { skill: "Skill D".into() }),
        );
        let edits = &removed.requirement_edits;
        assert_eq!(edits.skills_remove.must_have, vec!["Skill D".to_string()]);
        assert_eq!(edits.skills_remove.nice_to_have, vec!["Skill D".to_string()]);
        assert!(edits.skills_add.is_empty());

        let relaxed = space.apply_action(
            &removed,
            &action(Relaxation::RemoveNiceToHave { skill: "Skill E".into() }),
        );
        assert_eq!(
            relaxed.requirement_edits.skills_remove.nice_to_have,
            vec!["Skill D".to_string(), "Skill E".to_string()]
        );
        assert_eq!(relaxed.evaluation_rules.must_have_gate_mode, GateMode::CoverageMin);

        let lowered = space.apply_action(
            &relaxed,
            &action(Relaxation::LowerThreshold { from: 50.0, to: 45.0 }),
        );
        assert_eq!(lowered.optimization_params.overall_score_threshold, 45.0);
        assert_eq!(relaxed.optimization_params.overall_score_threshold, 50.0);
    }
}
