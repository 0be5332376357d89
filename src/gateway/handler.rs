use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, instrument};

use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::provider::{CompletionProvider, EmbeddingProvider};
use crate::store::ResultStore;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub batch_id: String,
    pub message: String,
}

/// Kicks off a batch run of every test case against a prompt.
///
/// Responds `202 Accepted` once dispatch is initiated; results land in the
/// result store and are visible via [`get_test_results_handler`].
#[instrument(skip(state, request))]
pub async fn start_tests_handler<C, E, S>(
    State(state): State<HandlerState<C, E, S>>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError>
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    let prompt_id = required_string_field(&request, "promptId")?;

    let batch = state.orchestrator.start(&prompt_id).await?;
    info!(batch_id = %batch.id, prompt_id, "accepted start request");

    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchResponse {
            batch_id: batch.id,
            message: format!("started tests for prompt {prompt_id}"),
        }),
    )
        .into_response())
}

/// Re-runs the failed units of an existing batch in a fresh batch.
///
/// `failedUnitIds` is optional; when absent or empty every unit's prior
/// result is copied forward without any provider calls.
#[instrument(skip(state, request))]
pub async fn retry_tests_handler<C, E, S>(
    State(state): State<HandlerState<C, E, S>>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError>
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    let batch_id = required_string_field(&request, "batchId")?;
    let failed_unit_ids = optional_string_array(&request, "failedUnitIds")?;

    let batch = state.orchestrator.retry(&batch_id, &failed_unit_ids).await?;
    info!(
        batch_id = %batch.id,
        source_batch_id = batch_id,
        "accepted retry request"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchResponse {
            batch_id: batch.id,
            message: format!("retrying tests from batch {batch_id}"),
        }),
    )
        .into_response())
}

/// Returns the current state of a batch, including every unit result.
#[instrument(skip(state))]
pub async fn get_test_results_handler<C, E, S>(
    State(state): State<HandlerState<C, E, S>>,
    Path(batch_id): Path<String>,
) -> Result<Response, GatewayError>
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    let mut batch = state
        .results
        .get_batch(&batch_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("batch {batch_id} not found")))?;

    // Batch-level status and average are derived from the units at read
    // time; units settle independently of any request.
    batch.status = batch.derived_status();
    batch.average_cosine_similarity_score = batch.average_cosine_similarity();

    Ok((StatusCode::OK, Json(batch)).into_response())
}

fn required_string_field(request: &serde_json::Value, field: &str) -> Result<String, GatewayError> {
    let value = request
        .get(field)
        .ok_or_else(|| GatewayError::InvalidRequest(format!("no {field} parameter provided")))?;
    let text = value
        .as_str()
        .ok_or_else(|| GatewayError::InvalidRequest(format!("{field} must be a string")))?;
    if text.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(format!(
            "{field} must not be empty"
        )));
    }
    Ok(text.to_string())
}

fn optional_string_array(
    request: &serde_json::Value,
    field: &str,
) -> Result<Vec<String>, GatewayError> {
    let Some(value) = request.get(field) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| GatewayError::InvalidRequest(format!("{field} must be an array")))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                GatewayError::InvalidRequest(format!("{field} must contain only strings"))
            })
        })
        .collect()
}
