//! In-memory store implementations.
//!
//! The default backend for the server binary and for tests. Records live in
//! `parking_lot`-guarded maps; ids are v4 UUIDs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::model::{
    NewTestBatch, NewTestCase, PromptCandidate, TestBatch, TestCase, UnitResult, UnitStatus,
    unix_timestamp,
};

use super::error::StoreError;
use super::{PromptStore, ResultStore, TestCaseStore};

#[derive(Default)]
pub struct MemoryResultStore {
    batches: RwLock<HashMap<String, TestBatch>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn create_batch(&self, new_batch: NewTestBatch) -> Result<TestBatch, StoreError> {
        let now = unix_timestamp();
        let unit_results: HashMap<String, UnitResult> = new_batch
            .test_case_ids
            .iter()
            .map(|id| (id.clone(), UnitResult::not_started(id)))
            .collect();

        let batch = TestBatch {
            id: Uuid::new_v4().to_string(),
            status: UnitStatus::InProgress,
            prompt_id: new_batch.prompt_id,
            llm_model: new_batch.config.llm_model,
            embeddings_model: new_batch.config.embeddings_model,
            temperature: new_batch.config.temperature,
            max_tokens: new_batch.config.max_tokens,
            unit_results,
            date_created_utc: now,
            date_updated_utc: now,
            average_cosine_similarity_score: None,
        };

        debug!(batch_id = %batch.id, units = batch.unit_results.len(), "created batch record");
        self.batches
            .write()
            .insert(batch.id.clone(), batch.clone());
        Ok(batch)
    }

    async fn get_batch(&self, id: &str) -> Result<Option<TestBatch>, StoreError> {
        Ok(self.batches.read().get(id).cloned())
    }

    async fn update_batch_status(&self, id: &str, status: UnitStatus) -> Result<(), StoreError> {
        let mut batches = self.batches.write();
        let batch = batches.get_mut(id).ok_or_else(|| StoreError::BatchNotFound {
            id: id.to_string(),
        })?;
        batch.status = status;
        batch.date_updated_utc = unix_timestamp();
        Ok(())
    }

    async fn set_unit_result(
        &self,
        batch_id: &str,
        unit_id: &str,
        result: UnitResult,
    ) -> Result<(), StoreError> {
        let mut batches = self.batches.write();
        let batch = batches
            .get_mut(batch_id)
            .ok_or_else(|| StoreError::BatchNotFound {
                id: batch_id.to_string(),
            })?;
        let unit = batch
            .unit_results
            .get_mut(unit_id)
            .ok_or_else(|| StoreError::UnitNotFound {
                batch_id: batch_id.to_string(),
                unit_id: unit_id.to_string(),
            })?;
        *unit = result;
        Ok(())
    }

    async fn update_unit_status(
        &self,
        batch_id: &str,
        unit_id: &str,
        status: UnitStatus,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        debug!(batch_id, unit_id, status = %status, "updating unit status");
        let mut batches = self.batches.write();
        let batch = batches
            .get_mut(batch_id)
            .ok_or_else(|| StoreError::BatchNotFound {
                id: batch_id.to_string(),
            })?;
        let unit = batch
            .unit_results
            .get_mut(unit_id)
            .ok_or_else(|| StoreError::UnitNotFound {
                batch_id: batch_id.to_string(),
                unit_id: unit_id.to_string(),
            })?;

        unit.status = status;
        unit.error = if status == UnitStatus::Error {
            error
        } else {
            None
        };
        if status != UnitStatus::Complete {
            unit.cosine_similarity_score = None;
        }
        unit.date_updated_utc = unix_timestamp();
        Ok(())
    }

    async fn delete_batch(&self, id: &str) -> Result<(), StoreError> {
        let removed = self.batches.write().remove(id);
        if removed.is_none() {
            return Err(StoreError::BatchNotFound { id: id.to_string() });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPromptStore {
    prompts: RwLock<HashMap<String, PromptCandidate>>,
}

impl MemoryPromptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromptStore for MemoryPromptStore {
    async fn add(&self, prompt_text: &str) -> Result<PromptCandidate, StoreError> {
        let now = unix_timestamp();
        let prompt = PromptCandidate {
            id: Uuid::new_v4().to_string(),
            prompt: prompt_text.to_string(),
            date_created_utc: now,
            date_updated_utc: now,
        };
        self.prompts
            .write()
            .insert(prompt.id.clone(), prompt.clone());
        Ok(prompt)
    }

    async fn get(&self, id: &str) -> Result<Option<PromptCandidate>, StoreError> {
        Ok(self.prompts.read().get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<PromptCandidate>, StoreError> {
        Ok(self.prompts.read().values().cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryTestCaseStore {
    cases: RwLock<HashMap<String, TestCase>>,
}

impl MemoryTestCaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TestCaseStore for MemoryTestCaseStore {
    async fn add(&self, new_case: NewTestCase) -> Result<TestCase, StoreError> {
        let now = unix_timestamp();
        let case = TestCase {
            id: Uuid::new_v4().to_string(),
            utterance: new_case.utterance,
            good_completions: new_case.good_completions,
            bio: new_case.bio,
            context: new_case.context,
            date_created_utc: now,
            date_updated_utc: now,
        };
        self.cases.write().insert(case.id.clone(), case.clone());
        Ok(case)
    }

    async fn get_all(&self) -> Result<Vec<TestCase>, StoreError> {
        Ok(self.cases.read().values().cloned().collect())
    }
}
