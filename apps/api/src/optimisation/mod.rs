// Relaxation search: find the cheapest set of requirement relaxations that
// admits a target number of passing candidates.
// The search space, memoizing evaluator and strategies are synchronous and
// perform no I/O; callers run them on a blocking thread.

pub mod evaluator;
pub mod handlers;
pub mod models;
pub mod runner;
pub mod space;
pub mod strategies;

use thiserror::Error;

use crate::what_if::WhatIfError;

pub use models::{load_optimisation_config, OptimisationConfig, OptimisationResult, RelaxationKind};
pub use space::RelaxationSpace;

#[derive(Debug, Error)]
pub enum OptimisationError {
    /// Malformed optimisation payload; every problem is listed.
    #[error("Optimisation validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    /// Well-formed payload that cannot drive a search.
    #[error("Optimisation configuration error: {}", .0.join(" "))]
    Configuration(Vec<String>),

    #[error(transparent)]
    Evaluation(#[from] WhatIfError),
}

impl OptimisationError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        OptimisationError::Configuration(vec![message.into()])
    }
}
