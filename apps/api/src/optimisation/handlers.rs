//! Axum route handlers for the Optimisation API.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Application, JobRequirements};
use crate::optimisation::runner::{run_optimisation, OptimisationReport, OptimisationRequestOptions};
use crate::optimisation::strategies::{SearchStrategy, Strategy};
use crate::optimisation::{load_optimisation_config, OptimisationConfig};
use crate::what_if::handlers::empty_object;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OptimisationRequest {
    pub job: JobRequirements,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default = "empty_object")]
    pub optimisation: Value,
    #[serde(default)]
    pub candidate_count: Option<i64>,
    #[serde(default)]
    pub top_k: Option<i64>,
    #[serde(default)]
    pub include_details: bool,
    #[serde(default)]
    pub summary: bool,
    #[serde(default)]
    pub best_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct OptimisationResponse {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: OptimisationReport,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default = "empty_object")]
    pub optimisation: Value,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub strategy: &'static str,
    pub config: OptimisationConfig,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/optimisation
///
/// Searches for the cheapest relaxations that admit the target count.
/// The search is CPU-bound and runs on the blocking pool.
pub async fn handle_optimise(
    Json(request): Json<OptimisationRequest>,
) -> Result<Json<OptimisationResponse>, AppError> {
    if request.summary && request.include_details {
        return Err(AppError::BadRequest(
            "summary cannot be combined with include_details".to_string(),
        ));
    }

    let options = OptimisationRequestOptions {
        candidate_count: request.candidate_count,
        top_k: request.top_k,
        include_details: request.include_details,
        include_summary_table: request.summary,
        best_only: request.best_only.unwrap_or(true),
    };
    let OptimisationRequest {
        job,
        applications,
        optimisation,
        ..
    } = request;

    let report = tokio::task::spawn_blocking(move || {
        run_optimisation(&job, &applications, &optimisation, &options)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in optimisation: {e}")))??;

    Ok(Json(OptimisationResponse {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        report,
    }))
}

/// POST /api/v1/optimisation/validate
///
/// Checks an optimisation payload and echoes the resolved configuration.
pub async fn handle_validate(
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, AppError> {
    let config = load_optimisation_config(&request.optimisation)?;
    let strategy = Strategy::from_spec(&config.strategy)?;

    Ok(Json(ValidateResponse {
        valid: true,
        strategy: strategy.name(),
        config,
    }))
}
