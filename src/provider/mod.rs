//! External collaborators: completion and embedding providers.
//!
//! Both providers sit behind `async_trait` seams so the processor and
//! orchestrator can be exercised against mocks. Real implementations talk
//! to the OpenAI chat API ([`OpenAiCompletionProvider`]) and the Hugging
//! Face inference API ([`HuggingFaceEmbeddingProvider`]).

mod error;
pub mod huggingface;
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::ProviderError;
pub use huggingface::{DEFAULT_HF_BASE_URL, HuggingFaceEmbeddingProvider};
pub use openai::OpenAiCompletionProvider;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCompletionProvider, MockEmbeddingProvider};

use async_trait::async_trait;

/// Produces raw text completions for a fully formatted prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    async fn generate(
        &self,
        prompt_text: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Produces one embedding vector per input text, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + 'static {
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, ProviderError>;
}
