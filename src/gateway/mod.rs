//! HTTP gateway (Axum) for dispatching and polling prompt test batches.
//!
//! This module is primarily used by the `promptbench` server binary.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{get_test_results_handler, retry_tests_handler, start_tests_handler};
pub use state::HandlerState;

use crate::provider::{CompletionProvider, EmbeddingProvider};
use crate::store::ResultStore;

pub fn create_router_with_state<C, E, S>(state: HandlerState<C, E, S>) -> Router
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/v1/tests/start", post(start_tests_handler))
        .route("/v1/tests/retry", post(retry_tests_handler))
        .route("/v1/tests/{batch_id}", get(get_test_results_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}
