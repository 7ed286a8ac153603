//! Axum route handlers for the What-If API.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Application, JobRequirements};
use crate::what_if::runner::{run_what_if, WhatIfOverrides, WhatIfReport};
use crate::what_if::{build_shock_report, normalize_scenario, EvaluationOptions, Scenario, ShockReport};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn strict_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct WhatIfRequest {
    pub job: JobRequirements,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default = "empty_object")]
    pub scenario: Value,
    #[serde(flatten)]
    pub overrides: WhatIfOverrides,
    #[serde(default)]
    pub include_details: bool,
    /// Summary-table view; mutually exclusive with `include_details`.
    #[serde(default)]
    pub summary: bool,
}

#[derive(Debug, Serialize)]
pub struct WhatIfResponse {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: WhatIfReport,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub job: JobRequirements,
    #[serde(default = "empty_object")]
    pub scenario: Value,
    #[serde(default = "strict_default")]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub normalized_scenario: Scenario,
    pub warnings: Vec<String>,
    pub shock_report: ShockReport,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/what-if
///
/// Re-scores the posted applications under one scenario plus rule overrides.
pub async fn handle_what_if(
    Json(request): Json<WhatIfRequest>,
) -> Result<Json<WhatIfResponse>, AppError> {
    if request.summary && request.include_details {
        return Err(AppError::BadRequest(
            "summary cannot be combined with include_details".to_string(),
        ));
    }

    let options = EvaluationOptions {
        include_details: request.include_details,
        include_summary_table: request.summary,
    };
    let report = run_what_if(
        &request.job,
        &request.applications,
        &request.scenario,
        &request.overrides,
        options,
    )?;

    Ok(Json(WhatIfResponse {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        report,
    }))
}

/// POST /api/v1/what-if/normalize
///
/// Validates a scenario against the job without scoring anyone.
/// With `strict: false` problems come back as `ignored: …` warnings.
pub async fn handle_normalize(
    Json(request): Json<NormalizeRequest>,
) -> Result<Json<NormalizeResponse>, AppError> {
    let (normalized_scenario, warnings) =
        normalize_scenario(&request.scenario, &request.job, request.strict)?;
    let shock_report = build_shock_report(&request.job, &normalized_scenario);

    Ok(Json(NormalizeResponse {
        normalized_scenario,
        warnings,
        shock_report,
    }))
}
