//! Batch orchestration: create a test run, dispatch its units, return.
//!
//! [`Orchestrator::start`] validates the request, creates the batch record,
//! and spawns one independent task per test case. The call returns as soon
//! as dispatch is initiated — unit outcomes land in the result store and
//! are visible by polling the batch afterwards.
//!
//! [`Orchestrator::retry`] re-dispatches only the failed units of an
//! existing batch into a fresh batch, copying forward the untouched units'
//! scores and completions verbatim so previously-successful work is never
//! re-paid (or re-randomized).

mod error;
mod registry;


pub use error::OrchestratorError;
pub use registry::TaskRegistry;

use std::sync::Arc;

use tracing::{error, info};

use crate::model::{BatchConfig, NewTestBatch, PromptCandidate, TestBatch, TestCase, UnitResult, UnitStatus};
use crate::processor::{RetrySettings, TestCaseProcessor};
use crate::provider::{CompletionProvider, EmbeddingProvider};
use crate::store::{PromptStore, ResultStore, TestCaseStore};

/// How one unit of a dispatch should run.
enum UnitPlan {
    /// Full evaluation pipeline.
    Evaluate,
    /// Copy score + completions from a source batch without provider calls.
    CopyFrom { source_batch_id: String },
}

pub struct Orchestrator<C, E, S> {
    prompts: Arc<dyn PromptStore>,
    test_cases: Arc<dyn TestCaseStore>,
    store: Arc<S>,
    completion: Arc<C>,
    embedding: Arc<E>,
    processor: Arc<TestCaseProcessor<C, E, S>>,
    config: BatchConfig,
    registry: TaskRegistry,
}

impl<C, E, S> Orchestrator<C, E, S>
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    pub fn new(
        prompts: Arc<dyn PromptStore>,
        test_cases: Arc<dyn TestCaseStore>,
        store: Arc<S>,
        completion: Arc<C>,
        embedding: Arc<E>,
        config: BatchConfig,
    ) -> Self {
        let processor = Arc::new(TestCaseProcessor::new(
            completion.clone(),
            embedding.clone(),
            store.clone(),
        ));
        Self {
            prompts,
            test_cases,
            store,
            completion,
            embedding,
            processor,
            config,
            registry: TaskRegistry::new(),
        }
    }

    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.processor = Arc::new(
            TestCaseProcessor::new(
                self.completion.clone(),
                self.embedding.clone(),
                self.store.clone(),
            )
            .with_retry_settings(retry),
        );
        self
    }

    /// The task registry, for observability of dispatched batches.
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Starts a batch run of every test case against `prompt_id`.
    ///
    /// Returns the created batch as soon as all units are dispatched; no
    /// unit has necessarily begun (let alone finished) when this returns.
    pub async fn start(&self, prompt_id: &str) -> Result<TestBatch, OrchestratorError> {
        if prompt_id.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "no promptId provided".to_string(),
            ));
        }

        let prompt = self
            .prompts
            .get(prompt_id)
            .await?
            .ok_or_else(|| OrchestratorError::PromptNotFound {
                id: prompt_id.to_string(),
            })?;

        let test_cases = self.test_cases.get_all().await?;
        if test_cases.is_empty() {
            return Err(OrchestratorError::NoTestCases);
        }

        let batch = self
            .store
            .create_batch(NewTestBatch {
                prompt_id: prompt_id.to_string(),
                config: self.config.clone(),
                test_case_ids: test_cases.iter().map(|c| c.id.clone()).collect(),
            })
            .await?;

        info!(
            batch_id = %batch.id,
            prompt_id,
            units = test_cases.len(),
            "starting prompt tests"
        );

        let plan = |_case: &TestCase| UnitPlan::Evaluate;
        if let Err(e) = self.dispatch(&prompt, &test_cases, &batch, plan) {
            self.rollback(&batch.id).await;
            return Err(e);
        }

        Ok(batch)
    }

    /// Re-runs the failed units of `batch_id` in a fresh batch, copying all
    /// other units' results forward without re-invoking any provider.
    pub async fn retry(
        &self,
        batch_id: &str,
        failed_unit_ids: &[String],
    ) -> Result<TestBatch, OrchestratorError> {
        if batch_id.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "no batchId provided".to_string(),
            ));
        }

        let source = self
            .store
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| OrchestratorError::BatchNotFound {
                id: batch_id.to_string(),
            })?;

        let prompt = self
            .prompts
            .get(&source.prompt_id)
            .await?
            .ok_or_else(|| OrchestratorError::PromptNotFound {
                id: source.prompt_id.clone(),
            })?;

        let test_cases = self.test_cases.get_all().await?;
        if test_cases.is_empty() {
            return Err(OrchestratorError::NoTestCases);
        }

        // The new batch inherits the source batch's generation parameters,
        // not the orchestrator's current defaults.
        let batch = self
            .store
            .create_batch(NewTestBatch {
                prompt_id: source.prompt_id.clone(),
                config: source.config(),
                test_case_ids: test_cases.iter().map(|c| c.id.clone()).collect(),
            })
            .await?;

        info!(
            batch_id = %batch.id,
            source_batch_id = %source.id,
            rerun_units = failed_unit_ids.len(),
            total_units = test_cases.len(),
            "retrying prompt tests"
        );

        let source_id = source.id.clone();
        let plan = |case: &TestCase| {
            if failed_unit_ids.contains(&case.id) {
                UnitPlan::Evaluate
            } else {
                UnitPlan::CopyFrom {
                    source_batch_id: source_id.clone(),
                }
            }
        };
        if let Err(e) = self.dispatch(&prompt, &test_cases, &batch, plan) {
            self.rollback(&batch.id).await;
            return Err(e);
        }

        Ok(batch)
    }

    /// Spawns one task per test case without awaiting any of them.
    fn dispatch(
        &self,
        prompt: &PromptCandidate,
        test_cases: &[TestCase],
        batch: &TestBatch,
        plan: impl Fn(&TestCase) -> UnitPlan,
    ) -> Result<(), OrchestratorError> {
        if !self.registry.begin_batch(&batch.id) {
            return Err(OrchestratorError::AlreadyDispatched {
                id: batch.id.clone(),
            });
        }

        for case in test_cases {
            let handle = match plan(case) {
                UnitPlan::Evaluate => {
                    let processor = Arc::clone(&self.processor);
                    let prompt = prompt.clone();
                    let case = case.clone();
                    let batch = batch.clone();
                    tokio::spawn(async move {
                        processor.process(&prompt, &case, &batch).await;
                    })
                }
                UnitPlan::CopyFrom { source_batch_id } => {
                    let store = Arc::clone(&self.store);
                    let new_batch_id = batch.id.clone();
                    let unit_id = case.id.clone();
                    tokio::spawn(async move {
                        copy_unit(store, &source_batch_id, &new_batch_id, &unit_id).await;
                    })
                }
            };
            self.registry.record(&batch.id, handle);
        }

        Ok(())
    }

    /// Best-effort cleanup when dispatch fails after the batch record was
    /// created: delete the record, falling back to marking it errored.
    async fn rollback(&self, batch_id: &str) {
        if let Err(delete_err) = self.store.delete_batch(batch_id).await {
            error!(batch_id, error = %delete_err, "failed to delete batch after dispatch error");
            if let Err(status_err) = self
                .store
                .update_batch_status(batch_id, UnitStatus::Error)
                .await
            {
                error!(batch_id, error = %status_err, "failed to mark batch errored");
            }
        }
    }
}

/// Copies one unit's prior successful result from `source_batch_id` into
/// the new batch. A source unit without a successful result records an
/// error on the new unit rather than a fabricated score.
async fn copy_unit<S: ResultStore>(
    store: Arc<S>,
    source_batch_id: &str,
    new_batch_id: &str,
    unit_id: &str,
) {
    let copied: Result<UnitResult, String> = match store.get_batch(source_batch_id).await {
        Err(e) => Err(format!("failed to load source batch: {e}")),
        Ok(None) => Err(format!("source batch {source_batch_id} not found")),
        Ok(Some(source)) => match source.unit_results.get(unit_id) {
            None => Err(format!("unit {unit_id} not present in source batch")),
            Some(unit) => match (unit.status, unit.cosine_similarity_score) {
                (UnitStatus::Complete, Some(score)) => Ok(UnitResult::complete(
                    unit_id,
                    score,
                    unit.llm_completions.clone().unwrap_or_default(),
                )),
                _ => Err(format!(
                    "no prior successful result to copy for unit {unit_id} (status: {})",
                    unit.status
                )),
            },
        },
    };

    match copied {
        Ok(result) => {
            if let Err(e) = store.set_unit_result(new_batch_id, unit_id, result).await {
                error!(batch_id = new_batch_id, unit_id, error = %e, "failed to persist copied unit");
            }
        }
        Err(message) => {
            error!(batch_id = new_batch_id, unit_id, %message, "copy failed");
            if let Err(e) = store
                .update_unit_status(new_batch_id, unit_id, UnitStatus::Error, Some(message))
                .await
            {
                error!(batch_id = new_batch_id, unit_id, error = %e, "failed to record copy error");
            }
        }
    }
}
