//! Bounded retry with fixed backoff for transient provider failures.
//!
//! Externally-hosted model providers routinely return 429/500/503 under
//! load; those are retried after a fixed wait. Everything else (notably
//! authorization failures) propagates immediately, since retrying cannot
//! succeed and would only burn quota.


use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// HTTP statuses treated as transient.
pub const RETRYABLE_STATUSES: [u16; 3] = [429, 500, 503];

/// Whether a failed attempt should be retried or propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Fatal,
}

/// Classifies an error for the retry loop.
pub trait RetryClassify {
    fn retry_class(&self) -> RetryClass;
}

/// Returns `true` for HTTP statuses the retry loop treats as transient.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    /// All attempts were consumed; carries the most recent error.
    #[error("max retries ({attempts}) reached, most recent error: {source}")]
    Exhausted { attempts: u32, source: E },

    /// A non-retryable error; propagated without further attempts.
    #[error("{0}")]
    Fatal(#[source] E),
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// The underlying provider error, whichever way the retry loop ended.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
            RetryError::Fatal(source) => source,
        }
    }
}

/// Runs `operation` up to `max_attempts` times, sleeping `wait` between
/// retryable failures. Fatal failures propagate immediately.
pub async fn with_retry<T, E, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    wait: Duration,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + RetryClassify + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts,
                        source: error,
                    });
                }
                match error.retry_class() {
                    RetryClass::Retryable => {
                        warn!(
                            remaining = max_attempts - attempts,
                            error = %error,
                            "transient failure, will retry"
                        );
                        debug!(wait_secs = wait.as_secs_f64(), "waiting before retry");
                        tokio::time::sleep(wait).await;
                    }
                    RetryClass::Fatal => {
                        warn!(error = %error, "non-retryable failure, giving up");
                        return Err(RetryError::Fatal(error));
                    }
                }
            }
        }
    }
}
