// What-if analysis: deterministic re-scoring of stored match data under
// hypothetical requirement edits and scoring-rule overrides.
// No LLM calls happen here; match data is consumed as produced upstream.

pub mod evaluator;
pub mod handlers;
pub mod projector;
pub mod runner;
pub mod scenario;

use thiserror::Error;

pub use evaluator::{evaluate_applications, EvaluationOptions, EvaluationSummary};
pub use projector::{apply_skill_edits, build_shock_report, EffectiveRequirements, ShockReport};
pub use scenario::{normalize_scenario, Scenario};

/// Failures raised while normalizing or evaluating a scenario.
#[derive(Debug, Error)]
pub enum WhatIfError {
    /// Every problem found in the payload, collected in one pass.
    #[error("Scenario validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    /// Stored match data cannot support the requested evaluation.
    #[error("Data integrity error: {0}")]
    Integrity(String),
}
