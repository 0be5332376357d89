//! Promptbench library crate (used by the server binary and integration tests).
//!
//! Batch prompt evaluation engine: candidate prompts are run against a suite
//! of test cases, their completions are embedded alongside reference
//! completions, and each unit is scored by the cosine similarity of the two
//! mean vectors.
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`PromptCandidate`], [`TestCase`], [`TestBatch`], [`UnitResult`],
//!   [`UnitStatus`] - The evaluation domain model
//!
//! ## Engine
//! - [`Orchestrator`] - Batch dispatch, retry, and rollback
//! - [`TestCaseProcessor`] - The per-unit evaluation pipeline
//! - [`TaskRegistry`] - Observability over fire-and-forget unit tasks
//!
//! ## Scoring
//! - [`average_of_vectors`], [`cosine_similarity`], [`ensure_score_in_range`]
//!
//! ## Providers
//! - [`CompletionProvider`], [`EmbeddingProvider`] - Provider seams
//! - [`OpenAiCompletionProvider`], [`HuggingFaceEmbeddingProvider`] - Real
//!   implementations
//!
//! ## Stores
//! - [`PromptStore`], [`TestCaseStore`], [`ResultStore`] - Persistence seams
//! - [`MemoryPromptStore`], [`MemoryTestCaseStore`], [`MemoryResultStore`] -
//!   In-memory implementations
//!
//! ## Test/Mock Support
//! Mock providers are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod gateway;
pub mod model;
pub mod orchestrator;
pub mod processor;
pub mod provider;
pub mod retry;
pub mod scoring;
pub mod store;

pub use config::{
    Config, ConfigError, DEFAULT_EMBEDDINGS_MODEL, DEFAULT_LLM_MODEL, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
pub use gateway::{GatewayError, HandlerState, create_router_with_state};
pub use model::{
    BatchConfig, Bio, Context, NewTestBatch, NewTestCase, PromptCandidate, TestBatch, TestCase,
    UnitResult, UnitStatus,
};
pub use orchestrator::{Orchestrator, OrchestratorError, TaskRegistry};
pub use processor::{
    CaseEvaluation, DEFAULT_MAX_RETRY, DEFAULT_RETRY_WAIT_SECS, ProcessorError, RetrySettings,
    TestCaseProcessor, format_prompt,
};
pub use provider::{
    CompletionProvider, DEFAULT_HF_BASE_URL, EmbeddingProvider, HuggingFaceEmbeddingProvider,
    OpenAiCompletionProvider, ProviderError,
};
pub use retry::{RETRYABLE_STATUSES, RetryClass, RetryClassify, RetryError, with_retry};
pub use scoring::{ScoringError, average_of_vectors, cosine_similarity, ensure_score_in_range};
pub use store::{
    MemoryPromptStore, MemoryResultStore, MemoryTestCaseStore, PromptStore, ResultStore,
    StoreError, TestCaseStore,
};

#[cfg(any(test, feature = "mock"))]
pub use provider::{MockCompletionProvider, MockEmbeddingProvider};
