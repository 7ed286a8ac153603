//! What-if orchestration: normalize, apply caller overrides, project, evaluate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::models::{Application, JobRequirements};
use crate::payload::{self, Errors};
use crate::what_if::evaluator::{CandidateResult, PopulationEvaluation, SummaryRow};
use crate::what_if::scenario::MatchMode;
use crate::what_if::{
    build_shock_report, evaluate_applications, normalize_scenario, EvaluationOptions,
    EvaluationSummary, Scenario, ShockReport, WhatIfError,
};

/// Rule overrides applied on top of the normalized scenario.
///
/// Kept loosely typed so bad values are reported with the same messages as
/// scenario validation instead of failing request deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhatIfOverrides {
    #[serde(default)]
    pub match_mode: Option<Value>,
    #[serde(default)]
    pub partial_match_weight: Option<Value>,
    #[serde(default)]
    pub overall_score_threshold: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhatIfReport {
    pub normalized_scenario: Scenario,
    pub shock_report: ShockReport,
    pub warnings: Vec<String>,
    pub summary: EvaluationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<CandidateResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_table: Option<Vec<SummaryRow>>,
}

/// Runs one scenario end to end. Normalization is always strict here.
pub fn run_what_if(
    job: &JobRequirements,
    applications: &[Application],
    raw_scenario: &Value,
    overrides: &WhatIfOverrides,
    options: EvaluationOptions,
) -> Result<WhatIfReport, WhatIfError> {
    let (normalized, mut warnings) = normalize_scenario(raw_scenario, job, true)?;
    let scenario = apply_overrides(normalized, overrides)?;
    let shock_report = build_shock_report(job, &scenario);

    let PopulationEvaluation {
        summary,
        warnings: evaluation_warnings,
        candidates,
        summary_table,
    } = evaluate_applications(applications, job, &scenario, options)?;
    warnings.extend(evaluation_warnings);

    info!(
        applications = summary.applications_total,
        passed = summary.applications_passed,
        warnings = warnings.len(),
        "what-if scenario evaluated"
    );

    Ok(WhatIfReport {
        normalized_scenario: scenario,
        shock_report,
        warnings,
        summary,
        candidates,
        summary_table,
    })
}

/// Returns a new scenario with every valid override applied, or all errors at once.
pub fn apply_overrides(
    mut scenario: Scenario,
    overrides: &WhatIfOverrides,
) -> Result<Scenario, WhatIfError> {
    let mut errors: Errors = Vec::new();

    match overrides.match_mode.as_ref() {
        None | Some(Value::Null) => {}
        Some(Value::String(raw)) if raw.trim().is_empty() => {}
        Some(Value::String(raw)) => match MatchMode::parse(raw) {
            Some(mode) => scenario.evaluation_rules.match_mode = mode,
            None => errors.push("match_mode must be full or partial.".to_string()),
        },
        Some(_) => errors.push("match_mode must be full or partial.".to_string()),
    }

    if let Some(weight) = payload::number(
        overrides.partial_match_weight.as_ref(),
        "partial_match_weight",
        &mut errors,
        0.0,
        1.0,
    ) {
        scenario.evaluation_rules.partial_match_weight = weight;
    }

    if let Some(threshold) = payload::number(
        overrides.overall_score_threshold.as_ref(),
        "overall_score_threshold",
        &mut errors,
        0.0,
        100.0,
    ) {
        scenario.optimization_params.overall_score_threshold = threshold;
    }

    if errors.is_empty() {
        Ok(scenario)
    } else {
        Err(WhatIfError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{complete, job, three_of_four};
    use serde_json::json;

    #[test]
    fn test_overrides_replace_rules() {
        let overrides = WhatIfOverrides {
            match_mode: Some(json!("Full")),
            partial_match_weight: Some(json!(0.25)),
            overall_score_threshold: Some(json!(70)),
        };
        let scenario = apply_overrides(Scenario::default(), &overrides).unwrap();
        assert_eq!(scenario.evaluation_rules.match_mode, MatchMode::FullOnly);
        assert_eq!(scenario.evaluation_rules.partial_match_weight, 0.25);
        assert_eq!(scenario.optimization_params.overall_score_threshold, 70.0);
    }

    #[test]
    fn test_override_errors_collected() {
        let overrides = WhatIfOverrides {
            match_mode: Some(json!("sometimes")),
            partial_match_weight: Some(json!("high")),
            overall_score_threshold: Some(json!(150)),
        };
        let error = apply_overrides(Scenario::default(), &overrides).unwrap_err();
        let WhatIfError::Validation(errors) = error else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors,
            vec![
                "match_mode must be full or partial.".to_string(),
                "partial_match_weight must be a number.".to_string(),
                "overall_score_threshold must be between 0 and 100.".to_string(),
            ]
        );
    }

    #[test]
    fn test_run_what_if_reports_shock_and_summary() {
        let raw = json!({
            "requirement_edits": {"skills_remove": {"must_have": ["skill d"]}},
            "evaluation_rules": {"must_have_gate_mode": "all"}
        });
        let applications = vec![three_of_four(1, "Sam"), complete(2, "Kim")];

        let report = run_what_if(
            &job(),
            &applications,
            &raw,
            &WhatIfOverrides::default(),
            EvaluationOptions {
                include_details: false,
                include_summary_table: true,
            },
        )
        .unwrap();

        assert_eq!(report.shock_report.must_have_removed, vec!["Skill D".to_string()]);
        assert_eq!(report.summary.applications_total, 2);
        assert_eq!(report.summary.applications_passed, 2);
        assert!(report.candidates.is_none());
        assert_eq!(report.summary_table.map(|table| table.len()), Some(2));
        assert_eq!(
            report.warnings,
            vec!["Skill removed from requirements: Skill D".to_string()]
        );
    }

    #[test]
    fn test_run_what_if_is_strict() {
        let raw = json!({"scenario": {"min_years_override": 50}});
        let error = run_what_if(
            &job(),
            &[],
            &raw,
            &WhatIfOverrides::default(),
            EvaluationOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(error, WhatIfError::Validation(_)));
    }
}
