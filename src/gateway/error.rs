use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::orchestrator::OrchestratorError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<OrchestratorError> for GatewayError {
    fn from(error: OrchestratorError) -> Self {
        match error {
            OrchestratorError::InvalidRequest(message) => GatewayError::InvalidRequest(message),
            OrchestratorError::PromptNotFound { .. }
            | OrchestratorError::BatchNotFound { .. }
            | OrchestratorError::NoTestCases => GatewayError::InvalidRequest(error.to_string()),
            OrchestratorError::AlreadyDispatched { .. } | OrchestratorError::Store(_) => {
                GatewayError::Internal(error.to_string())
            }
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(error: StoreError) -> Self {
        GatewayError::Internal(error.to_string())
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
