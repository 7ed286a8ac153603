pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::optimisation::handlers as optimisation;
use crate::what_if::handlers as what_if;

/// Every handler is stateless: requests carry the job and its applications.
pub fn build_router() -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // What-if API
        .route("/api/v1/what-if", post(what_if::handle_what_if))
        .route("/api/v1/what-if/normalize", post(what_if::handle_normalize))
        // Optimisation API
        .route("/api/v1/optimisation", post(optimisation::handle_optimise))
        .route(
            "/api/v1/optimisation/validate",
            post(optimisation::handle_validate),
        )
}
