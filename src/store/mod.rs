//! Persistence abstractions for batches, prompts, and test cases.
//!
//! The logical layout is hierarchical: a batch record at
//! `/results/{batchId}` and one unit record per test case under
//! `/results/{batchId}/unitResults/{unitId}`. Every unit-level write is
//! scoped to its own `(batch, unit)` pair, so concurrently running units
//! never contend for the same location.
//!
//! Stores are injected into the orchestrator and processor explicitly;
//! there is no global database handle.

mod error;
mod memory;

#[cfg(test)]
mod tests;

pub use error::StoreError;
pub use memory::{MemoryPromptStore, MemoryResultStore, MemoryTestCaseStore};

use async_trait::async_trait;

use crate::model::{NewTestBatch, NewTestCase, PromptCandidate, TestBatch, TestCase, UnitResult, UnitStatus};

/// Persistence for batch and per-unit records.
#[async_trait]
pub trait ResultStore: Send + Sync + 'static {
    /// Atomically creates a batch with one `NotStarted` unit per test-case
    /// id, assigning the batch id and timestamps.
    async fn create_batch(&self, new_batch: NewTestBatch) -> Result<TestBatch, StoreError>;

    async fn get_batch(&self, id: &str) -> Result<Option<TestBatch>, StoreError>;

    /// Updates the batch-level status field only.
    async fn update_batch_status(&self, id: &str, status: UnitStatus) -> Result<(), StoreError>;

    /// Full overwrite of one unit record; used when a unit completes.
    async fn set_unit_result(
        &self,
        batch_id: &str,
        unit_id: &str,
        result: UnitResult,
    ) -> Result<(), StoreError>;

    /// Partial update of one unit's status. `error` is persisted only when
    /// the status is [`UnitStatus::Error`]; otherwise it is cleared. The
    /// score is cleared unless the status is [`UnitStatus::Complete`].
    async fn update_unit_status(
        &self,
        batch_id: &str,
        unit_id: &str,
        status: UnitStatus,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    async fn delete_batch(&self, id: &str) -> Result<(), StoreError>;
}

/// Read access to prompt candidates (creation is out of band).
#[async_trait]
pub trait PromptStore: Send + Sync + 'static {
    async fn add(&self, prompt_text: &str) -> Result<PromptCandidate, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<PromptCandidate>, StoreError>;
    async fn get_all(&self) -> Result<Vec<PromptCandidate>, StoreError>;
}

/// Read access to the test-case corpus.
#[async_trait]
pub trait TestCaseStore: Send + Sync + 'static {
    async fn add(&self, new_case: NewTestCase) -> Result<TestCase, StoreError>;
    async fn get_all(&self) -> Result<Vec<TestCase>, StoreError>;
}
