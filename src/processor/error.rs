use thiserror::Error;

use crate::provider::ProviderError;
use crate::retry::RetryError;
use crate::scoring::ScoringError;

/// Failure of a single evaluation unit. Absorbed into that unit's `Error`
/// status, never raised to the orchestrator.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("completion request failed: {0}")]
    Completion(#[source] RetryError<ProviderError>),

    #[error("embedding request failed: {0}")]
    Embedding(#[source] RetryError<ProviderError>),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
