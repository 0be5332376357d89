//! Core records: prompt candidates, test cases, batches, and per-unit results.
//!
//! Wire names are camelCase (`promptId`, `cosineSimilarityScore`, ...) and
//! timestamps are Unix seconds, matching the persisted layout consumed by
//! the dashboard.


use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Returns the current Unix timestamp in seconds.
pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A candidate prompt template under evaluation.
///
/// The template may contain placeholder tokens such as `{utterance}` or
/// `{name}` that are substituted per test case before use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptCandidate {
    pub id: String,
    /// The raw template text.
    pub prompt: String,
    pub date_created_utc: i64,
    pub date_updated_utc: i64,
}

/// Speaker biography fields available to the template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bio {
    pub name: String,
    pub age: u32,
    pub about_me: String,
}

/// Conversational context fields available to the template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub tone: String,
    pub setting: String,
    pub conversation_type: String,
}

/// A single test case: an utterance plus the known-good completions it
/// should elicit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub utterance: String,
    pub good_completions: Vec<String>,
    pub bio: Bio,
    pub context: Context,
    pub date_created_utc: i64,
    pub date_updated_utc: i64,
}

/// Lifecycle of a batch or of a single unit within it.
///
/// Units move `NotStarted → InProgress → {Complete | Error}`. A transition
/// back to `InProgress` happens only when a unit is explicitly retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Complete")]
    Complete,
    #[serde(rename = "Error")]
    Error,
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitStatus::NotStarted => "Not Started",
            UnitStatus::InProgress => "In Progress",
            UnitStatus::Complete => "Complete",
            UnitStatus::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Outcome of evaluating one test case within a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitResult {
    /// Same as the test-case id.
    pub id: String,
    pub status: UnitStatus,
    /// Present only while `status` is [`UnitStatus::Error`].
    pub error: Option<String>,
    /// Present only when `status` is [`UnitStatus::Complete`]; always in `[-1, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cosine_similarity_score: Option<f32>,
    /// The model completions that were scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_completions: Option<Vec<String>>,
    pub date_updated_utc: i64,
}

impl UnitResult {
    /// A fresh, not-yet-dispatched unit for `test_case_id`.
    pub fn not_started(test_case_id: &str) -> Self {
        Self {
            id: test_case_id.to_string(),
            status: UnitStatus::NotStarted,
            error: None,
            cosine_similarity_score: None,
            llm_completions: None,
            date_updated_utc: unix_timestamp(),
        }
    }

    /// A completed unit carrying its score and completions.
    pub fn complete(test_case_id: &str, score: f32, completions: Vec<String>) -> Self {
        Self {
            id: test_case_id.to_string(),
            status: UnitStatus::Complete,
            error: None,
            cosine_similarity_score: Some(score),
            llm_completions: Some(completions),
            date_updated_utc: unix_timestamp(),
        }
    }
}

/// Generation parameters fixed for the lifetime of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    pub llm_model: String,
    pub embeddings_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One orchestration run: a prompt evaluated against a fixed set of test
/// cases.
///
/// The keys of `unit_results` are fixed at creation time to the test-case
/// ids being evaluated and never change size afterward. Each concurrent
/// unit writes only its own entry, so no cross-unit locking is needed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestBatch {
    pub id: String,
    pub status: UnitStatus,
    pub prompt_id: String,
    pub llm_model: String,
    pub embeddings_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub unit_results: HashMap<String, UnitResult>,
    pub date_created_utc: i64,
    pub date_updated_utc: i64,
    /// Mean score over completed units, when computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_cosine_similarity_score: Option<f32>,
}

impl TestBatch {
    /// Generation parameters for this batch.
    pub fn config(&self) -> BatchConfig {
        BatchConfig {
            llm_model: self.llm_model.clone(),
            embeddings_model: self.embeddings_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Arithmetic mean of `cosine_similarity_score` over units with status
    /// `Complete` only. `None` when no unit has completed.
    pub fn average_cosine_similarity(&self) -> Option<f32> {
        let scores: Vec<f32> = self
            .unit_results
            .values()
            .filter(|u| u.status == UnitStatus::Complete)
            .filter_map(|u| u.cosine_similarity_score)
            .collect();

        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f32>() / scores.len() as f32)
    }

    /// Batch status derived from the unit statuses: `NotStarted` if nothing
    /// has started, `Complete` if everything finished, `Error` if any unit
    /// errored, otherwise `InProgress`.
    pub fn derived_status(&self) -> UnitStatus {
        if self
            .unit_results
            .values()
            .all(|u| u.status == UnitStatus::NotStarted)
        {
            return UnitStatus::NotStarted;
        }
        if self
            .unit_results
            .values()
            .all(|u| u.status == UnitStatus::Complete)
        {
            return UnitStatus::Complete;
        }
        if self
            .unit_results
            .values()
            .any(|u| u.status == UnitStatus::Error)
        {
            return UnitStatus::Error;
        }
        UnitStatus::InProgress
    }
}

/// Batch fields supplied by the orchestrator; the store assigns the id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewTestBatch {
    pub prompt_id: String,
    pub config: BatchConfig,
    /// Ids of every test case to be evaluated.
    pub test_case_ids: Vec<String>,
}

/// Test-case fields supplied by a caller; the store assigns the id and
/// timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestCase {
    pub utterance: String,
    pub good_completions: Vec<String>,
    pub bio: Bio,
    pub context: Context,
}
