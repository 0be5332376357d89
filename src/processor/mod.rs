//! Evaluation of one (prompt, test case) pair.
//!
//! A unit runs strictly sequentially: mark in-progress, format the
//! template, fetch completions, embed both completion sets, score, persist.
//! Every failure is absorbed into the unit's own status record; sibling
//! units and the orchestrator never see it.

mod error;

#[cfg(test)]
mod tests;

pub use error::ProcessorError;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::model::{BatchConfig, PromptCandidate, TestBatch, TestCase, UnitResult, UnitStatus};
use crate::provider::{CompletionProvider, EmbeddingProvider};
use crate::retry::with_retry;
use crate::scoring::{average_of_vectors, cosine_similarity, ensure_score_in_range};
use crate::store::ResultStore;

/// Default retry budget against provider failures, per call site.
pub const DEFAULT_MAX_RETRY: u32 = 4;
/// Default wait between retryable failures.
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 5;

/// Retry parameters applied to each provider call.
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub wait: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY,
            wait: Duration::from_secs(DEFAULT_RETRY_WAIT_SECS),
        }
    }
}

/// The scored outcome of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseEvaluation {
    pub completions: Vec<String>,
    pub score: f32,
}

/// Evaluates one test case against a prompt and writes the outcome through
/// the result store.
pub struct TestCaseProcessor<C, E, S> {
    completion: Arc<C>,
    embedding: Arc<E>,
    store: Arc<S>,
    retry: RetrySettings,
}

impl<C, E, S> TestCaseProcessor<C, E, S>
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    pub fn new(completion: Arc<C>, embedding: Arc<E>, store: Arc<S>) -> Self {
        Self {
            completion,
            embedding,
            store,
            retry: RetrySettings::default(),
        }
    }

    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the unit for `test_case` within `batch` and persists the
    /// outcome. Failures are recorded on the unit, never returned.
    pub async fn process(&self, prompt: &PromptCandidate, test_case: &TestCase, batch: &TestBatch) {
        if let Err(e) = self
            .store
            .update_unit_status(&batch.id, &test_case.id, UnitStatus::InProgress, None)
            .await
        {
            error!(
                batch_id = %batch.id,
                unit_id = %test_case.id,
                error = %e,
                "failed to mark unit in progress"
            );
            return;
        }

        debug!(
            unit_id = %test_case.id,
            prompt_id = %prompt.id,
            "running test case against prompt"
        );

        match self.evaluate(prompt, test_case, &batch.config()).await {
            Ok(evaluation) => {
                info!(
                    unit_id = %test_case.id,
                    score = evaluation.score,
                    "test case completed"
                );
                let result =
                    UnitResult::complete(&test_case.id, evaluation.score, evaluation.completions);
                if let Err(e) = self
                    .store
                    .set_unit_result(&batch.id, &test_case.id, result)
                    .await
                {
                    error!(
                        batch_id = %batch.id,
                        unit_id = %test_case.id,
                        error = %e,
                        "failed to persist unit result"
                    );
                }
            }
            Err(e) => {
                error!(unit_id = %test_case.id, error = %e, "test case failed");
                if let Err(store_err) = self
                    .store
                    .update_unit_status(
                        &batch.id,
                        &test_case.id,
                        UnitStatus::Error,
                        Some(e.to_string()),
                    )
                    .await
                {
                    error!(
                        batch_id = %batch.id,
                        unit_id = %test_case.id,
                        error = %store_err,
                        "failed to record unit error"
                    );
                }
            }
        }
    }

    /// The provider/scoring pipeline for one unit: completions, embeddings
    /// for both completion sets, averaged cosine similarity, range check.
    pub async fn evaluate(
        &self,
        prompt: &PromptCandidate,
        test_case: &TestCase,
        config: &BatchConfig,
    ) -> Result<CaseEvaluation, ProcessorError> {
        let formatted = format_prompt(&prompt.prompt, test_case);

        let completions = with_retry(
            || {
                self.completion.generate(
                    &formatted,
                    &config.llm_model,
                    config.temperature,
                    config.max_tokens,
                )
            },
            self.retry.max_attempts,
            self.retry.wait,
        )
        .await
        .map_err(ProcessorError::Completion)?;

        let generated_embeddings = with_retry(
            || self.embedding.embed(&completions, &config.embeddings_model),
            self.retry.max_attempts,
            self.retry.wait,
        )
        .await
        .map_err(ProcessorError::Embedding)?;

        let reference_embeddings = with_retry(
            || {
                self.embedding
                    .embed(&test_case.good_completions, &config.embeddings_model)
            },
            self.retry.max_attempts,
            self.retry.wait,
        )
        .await
        .map_err(ProcessorError::Embedding)?;

        let avg_generated = average_of_vectors(&generated_embeddings)?;
        let avg_reference = average_of_vectors(&reference_embeddings)?;
        let score = cosine_similarity(&avg_generated, &avg_reference)?;
        ensure_score_in_range(score)?;

        Ok(CaseEvaluation {
            completions,
            score,
        })
    }
}

/// Substitutes every known placeholder token with the matching test-case
/// field. Unmatched placeholders stay literal; that is not an error here.
pub fn format_prompt(template: &str, test_case: &TestCase) -> String {
    let replacements = [
        ("{name}", test_case.bio.name.clone()),
        ("{age}", test_case.bio.age.to_string()),
        ("{about_me}", test_case.bio.about_me.clone()),
        (
            "{conversation_type}",
            test_case.context.conversation_type.clone(),
        ),
        ("{setting}", test_case.context.setting.clone()),
        ("{tone}", test_case.context.tone.clone()),
        ("{utterance}", test_case.utterance.clone()),
    ];

    let mut result = template.to_string();
    for (token, value) in &replacements {
        result = result.replace(token, value);
    }
    result
}
