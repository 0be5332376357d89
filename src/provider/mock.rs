//! Mock providers for tests and the `mock` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::{CompletionProvider, EmbeddingProvider, ProviderError};

/// Scripted [`CompletionProvider`].
///
/// Returns a fixed set of completions, optionally failing the first calls
/// with scripted HTTP statuses, and optionally blocking each call on a
/// gate semaphore so tests can observe dispatch before any unit resolves.
pub struct MockCompletionProvider {
    completions: Vec<String>,
    scripted_failures: Mutex<VecDeque<u16>>,
    failure_when_contains: Option<(String, u16)>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl MockCompletionProvider {
    pub fn new(completions: Vec<String>) -> Self {
        Self {
            completions,
            scripted_failures: Mutex::new(VecDeque::new()),
            failure_when_contains: None,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails any call whose prompt text contains `needle`. Unlike scripted
    /// failures this is deterministic under concurrent units.
    pub fn with_failure_when_contains(mut self, needle: &str, status: u16) -> Self {
        self.failure_when_contains = Some((needle.to_string(), status));
        self
    }

    /// Fails the next calls with the given statuses, in order, before
    /// succeeding.
    pub fn with_scripted_failures(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.scripted_failures = Mutex::new(statuses.into_iter().collect());
        self
    }

    /// Blocks every call until a permit is added to `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn generate(
        &self,
        prompt_text: &str,
        _model: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Vec<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| ProviderError::Other {
                provider: "MockCompletion",
                message: "gate closed".to_string(),
            })?;
            permit.forget();
        }

        if let Some((needle, status)) = &self.failure_when_contains {
            if prompt_text.contains(needle) {
                return Err(ProviderError::http(
                    "MockCompletion",
                    *status,
                    "targeted failure",
                ));
            }
        }

        let failure = self.scripted_failures.lock().pop_front();
        if let Some(status) = failure {
            return Err(ProviderError::http(
                "MockCompletion",
                status,
                "scripted failure",
            ));
        }

        Ok(self.completions.clone())
    }
}

/// Deterministic [`EmbeddingProvider`].
///
/// Each text maps to a fixed vector derived from its bytes (all components
/// positive, so cosine scores stay within `(0, 1]`), unless an explicit
/// mapping overrides it.
pub struct MockEmbeddingProvider {
    overrides: HashMap<String, Vec<f32>>,
    scripted_failures: Mutex<VecDeque<u16>>,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            scripted_failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Forces specific texts to embed to specific vectors.
    pub fn with_override(mut self, text: &str, embedding: Vec<f32>) -> Self {
        self.overrides.insert(text.to_string(), embedding);
        self
    }

    /// Fails the next calls with the given statuses, in order.
    pub fn with_scripted_failures(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.scripted_failures = Mutex::new(statuses.into_iter().collect());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector a given text embeds to.
    pub fn embedding_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.overrides.get(text) {
            return vector.clone();
        }
        deterministic_embedding(text)
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, texts: &[String], _model: &str) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failure = self.scripted_failures.lock().pop_front();
        if let Some(status) = failure {
            return Err(ProviderError::http(
                "MockEmbedding",
                status,
                "scripted failure",
            ));
        }

        if texts.is_empty() {
            return Err(ProviderError::MalformedResponse {
                provider: "MockEmbedding",
                reason: "no input texts".to_string(),
            });
        }

        Ok(texts.iter().map(|t| self.embedding_for(t)).collect())
    }
}

fn deterministic_embedding(text: &str) -> Vec<f32> {
    let bytes = text.as_bytes();
    let len = bytes.len() as f32;
    let sum: u32 = bytes.iter().map(|b| u32::from(*b)).sum();
    vec![len + 1.0, (sum % 97) as f32 + 1.0, 1.0]
}
