use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::model::{Bio, Context, NewTestBatch};
use crate::provider::{MockCompletionProvider, MockEmbeddingProvider};
use crate::store::{MemoryResultStore, ResultStore};

fn prompt(template: &str) -> PromptCandidate {
    PromptCandidate {
        id: "prompt-1".to_string(),
        prompt: template.to_string(),
        date_created_utc: 1_700_000_000,
        date_updated_utc: 1_700_000_000,
    }
}

fn test_case(good_completions: Vec<&str>) -> TestCase {
    TestCase {
        id: "case-1".to_string(),
        utterance: "how was your day".to_string(),
        good_completions: good_completions.into_iter().map(String::from).collect(),
        bio: Bio {
            name: "Ada".to_string(),
            age: 36,
            about_me: "mathematician".to_string(),
        },
        context: Context {
            tone: "warm".to_string(),
            setting: "office".to_string(),
            conversation_type: "small talk".to_string(),
        },
        date_created_utc: 1_700_000_000,
        date_updated_utc: 1_700_000_000,
    }
}

async fn batch_for(store: &MemoryResultStore, case: &TestCase) -> TestBatch {
    store
        .create_batch(NewTestBatch {
            prompt_id: "prompt-1".to_string(),
            config: BatchConfig {
                llm_model: "gpt-3.5-turbo".to_string(),
                embeddings_model: "WhereIsAI/UAE-Large-V1".to_string(),
                temperature: 0.7,
                max_tokens: 50,
            },
            test_case_ids: vec![case.id.clone()],
        })
        .await
        .unwrap()
}

#[test]
fn format_prompt_substitutes_all_known_tokens() {
    let template = "{name} ({age}): {about_me} | {tone}/{setting}/{conversation_type} | {utterance}";
    let formatted = format_prompt(template, &test_case(vec!["hi"]));
    assert_eq!(
        formatted,
        "Ada (36): mathematician | warm/office/small talk | how was your day"
    );
}

#[test]
fn format_prompt_leaves_unknown_tokens_literal() {
    let formatted = format_prompt("say {greeting} to {name}", &test_case(vec!["hi"]));
    assert_eq!(formatted, "say {greeting} to Ada");
}

#[tokio::test]
async fn successful_unit_persists_complete_result() {
    let completion = Arc::new(MockCompletionProvider::new(vec!["hi there".to_string()]));
    let embedding = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryResultStore::new());
    let case = test_case(vec!["hi there"]);
    let batch = batch_for(&store, &case).await;

    let processor = TestCaseProcessor::new(completion, embedding, store.clone());
    processor.process(&prompt("reply to {utterance}"), &case, &batch).await;

    let stored = store.get_batch(&batch.id).await.unwrap().unwrap();
    let unit = &stored.unit_results["case-1"];
    assert_eq!(unit.status, UnitStatus::Complete);
    assert_eq!(unit.error, None);
    assert_eq!(
        unit.llm_completions.as_deref(),
        Some(&["hi there".to_string()][..])
    );
    // Generated and reference completions are identical, so the averaged
    // embeddings match exactly.
    let score = unit.cosine_similarity_score.unwrap();
    assert!((score - 1.0).abs() < 1e-6, "expected 1.0, got {score}");
}

#[tokio::test]
async fn fatal_provider_failure_marks_unit_errored_without_retry() {
    let completion = Arc::new(
        MockCompletionProvider::new(vec!["unused".to_string()]).with_scripted_failures([401]),
    );
    let embedding = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryResultStore::new());
    let case = test_case(vec!["hi"]);
    let batch = batch_for(&store, &case).await;

    let processor =
        TestCaseProcessor::new(completion.clone(), embedding.clone(), store.clone());
    processor.process(&prompt("{utterance}"), &case, &batch).await;

    let stored = store.get_batch(&batch.id).await.unwrap().unwrap();
    let unit = &stored.unit_results["case-1"];
    assert_eq!(unit.status, UnitStatus::Error);
    let message = unit.error.as_deref().unwrap();
    assert!(message.contains("completion request failed"), "{message}");
    assert_eq!(unit.cosine_similarity_score, None);
    assert_eq!(completion.call_count(), 1);
    assert_eq!(embedding.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_to_completion() {
    let completion = Arc::new(
        MockCompletionProvider::new(vec!["hi".to_string()]).with_scripted_failures([503, 429]),
    );
    let embedding = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryResultStore::new());
    let case = test_case(vec!["hi"]);
    let batch = batch_for(&store, &case).await;

    let processor = TestCaseProcessor::new(completion.clone(), embedding, store.clone())
        .with_retry_settings(RetrySettings {
            max_attempts: 4,
            wait: Duration::from_secs(5),
        });
    processor.process(&prompt("{utterance}"), &case, &batch).await;

    let stored = store.get_batch(&batch.id).await.unwrap().unwrap();
    assert_eq!(stored.unit_results["case-1"].status, UnitStatus::Complete);
    assert_eq!(completion.call_count(), 3);
}

#[tokio::test]
async fn empty_reference_set_is_a_unit_error() {
    let completion = Arc::new(MockCompletionProvider::new(vec!["hi".to_string()]));
    let embedding = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryResultStore::new());
    let case = test_case(vec![]);
    let batch = batch_for(&store, &case).await;

    let processor = TestCaseProcessor::new(completion, embedding, store.clone());
    processor.process(&prompt("{utterance}"), &case, &batch).await;

    let stored = store.get_batch(&batch.id).await.unwrap().unwrap();
    assert_eq!(stored.unit_results["case-1"].status, UnitStatus::Error);
}

#[tokio::test]
async fn evaluate_reports_scores_for_dissimilar_texts_in_range() {
    let completion = Arc::new(MockCompletionProvider::new(vec![
        "completely different answer".to_string(),
    ]));
    let embedding = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryResultStore::new());
    let case = test_case(vec!["hi there"]);
    let batch = batch_for(&store, &case).await;

    let processor = TestCaseProcessor::new(completion, embedding, store);
    let evaluation = processor
        .evaluate(&prompt("{utterance}"), &case, &batch.config())
        .await
        .unwrap();

    assert!(evaluation.score >= -1.0 && evaluation.score <= 1.0);
    assert_eq!(
        evaluation.completions,
        vec!["completely different answer".to_string()]
    );
}
