use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("prompt with id {id} not found")]
    PromptNotFound { id: String },

    #[error("batch with id {id} not found")]
    BatchNotFound { id: String },

    #[error("no test cases available to evaluate")]
    NoTestCases,

    #[error("batch {id} was already dispatched")]
    AlreadyDispatched { id: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
