use thiserror::Error;

use crate::retry::{RetryClass, RetryClassify, is_retryable_status};

/// Failure reported by a completion or embedding provider.
///
/// HTTP-style failures keep their status code so the retry policy can
/// classify them; 429/500/503 are transient, everything else is fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: HTTP {status}: {message}")]
    Http {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider}: transport error: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: malformed response: {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider}: {message}")]
    Other {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Builds an HTTP-status error. Authorization failures get a fixed
    /// message so credential material from the upstream body never leaks
    /// into logs or persisted unit errors.
    pub fn http(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        let message = if status == 401 || status == 403 {
            "authorization error, check your API credentials".to_string()
        } else {
            message.into()
        };
        ProviderError::Http {
            provider,
            status,
            message,
        }
    }

    /// The HTTP status, when this failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl RetryClassify for ProviderError {
    fn retry_class(&self) -> RetryClass {
        match self.status() {
            Some(status) if is_retryable_status(status) => RetryClass::Retryable,
            _ => RetryClass::Fatal,
        }
    }
}
