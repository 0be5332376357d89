use super::*;
use crate::model::BatchConfig;

fn new_batch(case_ids: &[&str]) -> NewTestBatch {
    NewTestBatch {
        prompt_id: "prompt-1".to_string(),
        config: BatchConfig {
            llm_model: "gpt-3.5-turbo".to_string(),
            embeddings_model: "WhereIsAI/UAE-Large-V1".to_string(),
            temperature: 0.7,
            max_tokens: 50,
        },
        test_case_ids: case_ids.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn create_batch_fixes_unit_keys_at_creation() {
    let store = MemoryResultStore::new();
    let batch = store.create_batch(new_batch(&["a", "b", "c"])).await.unwrap();

    assert_eq!(batch.unit_results.len(), 3);
    for id in ["a", "b", "c"] {
        let unit = &batch.unit_results[id];
        assert_eq!(unit.status, UnitStatus::NotStarted);
        assert_eq!(unit.error, None);
        assert_eq!(unit.cosine_similarity_score, None);
    }
    assert_eq!(batch.status, UnitStatus::InProgress);

    let fetched = store.get_batch(&batch.id).await.unwrap().unwrap();
    assert_eq!(fetched, batch);
}

#[tokio::test]
async fn set_unit_result_overwrites_only_that_unit() {
    let store = MemoryResultStore::new();
    let batch = store.create_batch(new_batch(&["a", "b"])).await.unwrap();

    let result = UnitResult::complete("a", 0.75, vec!["hi".into()]);
    store.set_unit_result(&batch.id, "a", result).await.unwrap();

    let fetched = store.get_batch(&batch.id).await.unwrap().unwrap();
    assert_eq!(fetched.unit_results["a"].status, UnitStatus::Complete);
    assert_eq!(fetched.unit_results["a"].cosine_similarity_score, Some(0.75));
    assert_eq!(fetched.unit_results["b"].status, UnitStatus::NotStarted);
}

#[tokio::test]
async fn update_unit_status_clears_error_unless_errored() {
    let store = MemoryResultStore::new();
    let batch = store.create_batch(new_batch(&["a"])).await.unwrap();

    store
        .update_unit_status(&batch.id, "a", UnitStatus::Error, Some("boom".into()))
        .await
        .unwrap();
    let fetched = store.get_batch(&batch.id).await.unwrap().unwrap();
    assert_eq!(fetched.unit_results["a"].error.as_deref(), Some("boom"));

    // A retry flips the unit back to InProgress; the stale error must clear.
    store
        .update_unit_status(&batch.id, "a", UnitStatus::InProgress, Some("ignored".into()))
        .await
        .unwrap();
    let fetched = store.get_batch(&batch.id).await.unwrap().unwrap();
    assert_eq!(fetched.unit_results["a"].status, UnitStatus::InProgress);
    assert_eq!(fetched.unit_results["a"].error, None);
}

#[tokio::test]
async fn update_unit_status_clears_score_unless_complete() {
    let store = MemoryResultStore::new();
    let batch = store.create_batch(new_batch(&["a"])).await.unwrap();

    store
        .set_unit_result(&batch.id, "a", UnitResult::complete("a", 0.9, vec![]))
        .await
        .unwrap();
    store
        .update_unit_status(&batch.id, "a", UnitStatus::InProgress, None)
        .await
        .unwrap();

    let fetched = store.get_batch(&batch.id).await.unwrap().unwrap();
    assert_eq!(fetched.unit_results["a"].cosine_similarity_score, None);
}

#[tokio::test]
async fn unit_writes_reject_unknown_ids() {
    let store = MemoryResultStore::new();
    let batch = store.create_batch(new_batch(&["a"])).await.unwrap();

    let err = store
        .update_unit_status(&batch.id, "nope", UnitStatus::InProgress, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnitNotFound { .. }));

    let err = store
        .update_unit_status("missing-batch", "a", UnitStatus::InProgress, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::BatchNotFound { .. }));
}

#[tokio::test]
async fn delete_batch_removes_the_record() {
    let store = MemoryResultStore::new();
    let batch = store.create_batch(new_batch(&["a"])).await.unwrap();

    store.delete_batch(&batch.id).await.unwrap();
    assert!(store.get_batch(&batch.id).await.unwrap().is_none());
    assert!(matches!(
        store.delete_batch(&batch.id).await.unwrap_err(),
        StoreError::BatchNotFound { .. }
    ));
}

#[tokio::test]
async fn prompt_and_case_stores_round_trip() {
    let prompts = MemoryPromptStore::new();
    let prompt = prompts.add("Say hi to {name}").await.unwrap();
    assert_eq!(
        prompts.get(&prompt.id).await.unwrap().unwrap().prompt,
        "Say hi to {name}"
    );
    assert!(prompts.get("missing").await.unwrap().is_none());

    let cases = MemoryTestCaseStore::new();
    let case = cases
        .add(NewTestCase {
            utterance: "hello".into(),
            good_completions: vec!["hi".into()],
            bio: crate::model::Bio {
                name: "Ada".into(),
                age: 36,
                about_me: "mathematician".into(),
            },
            context: crate::model::Context {
                tone: "warm".into(),
                setting: "office".into(),
                conversation_type: "greeting".into(),
            },
        })
        .await
        .unwrap();

    let all = cases.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, case.id);
}
