//! End-to-end tests driving the full engine through the HTTP router: seed
//! stores, dispatch a batch, poll results, and retry failed units.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, body::Body, http::Request, http::StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use promptbench::{
    BatchConfig, Bio, Context, HandlerState, MockCompletionProvider, MockEmbeddingProvider,
    NewTestCase, Orchestrator, PromptStore, RetrySettings, TestCaseStore,
    create_router_with_state,
};
use promptbench::store::{MemoryPromptStore, MemoryResultStore, MemoryTestCaseStore};

type TestOrchestrator =
    Orchestrator<MockCompletionProvider, MockEmbeddingProvider, MemoryResultStore>;

struct Harness {
    router: Router,
    orchestrator: Arc<TestOrchestrator>,
    prompt_id: String,
}

fn test_case(utterance: &str) -> NewTestCase {
    NewTestCase {
        utterance: utterance.to_string(),
        good_completions: vec![
            format!("a thoughtful reply to {utterance}"),
            format!("another reply to {utterance}"),
        ],
        bio: Bio {
            name: "Sam".to_string(),
            age: 29,
            about_me: "keeps bees".to_string(),
        },
        context: Context {
            tone: "casual".to_string(),
            setting: "market".to_string(),
            conversation_type: "chitchat".to_string(),
        },
    }
}

async fn harness(completion: MockCompletionProvider, utterances: &[&str]) -> Harness {
    let prompts = Arc::new(MemoryPromptStore::new());
    let test_cases = Arc::new(MemoryTestCaseStore::new());
    let results = Arc::new(MemoryResultStore::new());

    let prompt = prompts
        .add("Speak as {name} ({about_me}), {tone} tone, {setting}: {utterance}")
        .await
        .unwrap();
    for utterance in utterances {
        test_cases.add(test_case(utterance)).await.unwrap();
    }

    let orchestrator = Arc::new(
        Orchestrator::new(
            prompts,
            test_cases,
            results.clone(),
            Arc::new(completion),
            Arc::new(MockEmbeddingProvider::new()),
            BatchConfig {
                llm_model: "gpt-3.5-turbo".to_string(),
                embeddings_model: "WhereIsAI/UAE-Large-V1".to_string(),
                temperature: 0.7,
                max_tokens: 50,
            },
        )
        .with_retry_settings(RetrySettings {
            max_attempts: 2,
            wait: Duration::ZERO,
        }),
    );

    let router = create_router_with_state(HandlerState::new(orchestrator.clone(), results));

    Harness {
        router,
        orchestrator,
        prompt_id: prompt.id,
    }
}

async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn poll_batch(router: &Router, batch_id: &str) -> serde_json::Value {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/tests/{batch_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn full_run_scores_every_unit() {
    let hx = harness(
        MockCompletionProvider::new(vec![
            "first candidate reply".to_string(),
            "second candidate reply".to_string(),
        ]),
        &["how was your weekend", "any plans tonight", "nice weather"],
    )
    .await;

    let (status, body) = post_json(
        &hx.router,
        "/v1/tests/start",
        serde_json::json!({ "promptId": hx.prompt_id }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let batch_id = body["batchId"].as_str().unwrap().to_string();

    // Dispatch acked before any unit necessarily settled.
    let early = poll_batch(&hx.router, &batch_id).await;
    assert_eq!(early["unitResults"].as_object().unwrap().len(), 3);

    hx.orchestrator.registry().join_batch(&batch_id).await;

    let settled = poll_batch(&hx.router, &batch_id).await;
    assert_eq!(settled["status"], "Complete");
    let average = settled["averageCosineSimilarityScore"].as_f64().unwrap();
    assert!((-1.0..=1.0).contains(&average));
    for unit in settled["unitResults"].as_object().unwrap().values() {
        assert_eq!(unit["status"], "Complete");
        assert!(unit["cosineSimilarityScore"].as_f64().is_some());
        assert_eq!(unit["llmCompletions"].as_array().unwrap().len(), 2);
        assert!(unit["error"].is_null());
    }
}

#[tokio::test]
async fn transient_failures_are_retried_within_a_unit() {
    // One 503 per attempt budget of 2: each unit's first completion call may
    // fail, the retry succeeds.
    let hx = harness(
        MockCompletionProvider::new(vec!["a reply".to_string()]).with_scripted_failures([503]),
        &["hello"],
    )
    .await;

    let (_, body) = post_json(
        &hx.router,
        "/v1/tests/start",
        serde_json::json!({ "promptId": hx.prompt_id }),
    )
    .await;
    let batch_id = body["batchId"].as_str().unwrap().to_string();
    hx.orchestrator.registry().join_batch(&batch_id).await;

    let settled = poll_batch(&hx.router, &batch_id).await;
    assert_eq!(settled["status"], "Complete");
}

#[tokio::test]
async fn failed_batch_can_be_retried_to_completion() {
    // Authorization errors are fatal: the unit lands in Error without
    // exhausting the retry budget.
    let hx = harness(
        MockCompletionProvider::new(vec!["a reply".to_string()])
            .with_failure_when_contains("how was your weekend", 401),
        &["how was your weekend", "any plans tonight"],
    )
    .await;

    let (_, body) = post_json(
        &hx.router,
        "/v1/tests/start",
        serde_json::json!({ "promptId": hx.prompt_id }),
    )
    .await;
    let source_id = body["batchId"].as_str().unwrap().to_string();
    hx.orchestrator.registry().join_batch(&source_id).await;

    let source = poll_batch(&hx.router, &source_id).await;
    assert_eq!(source["status"], "Error");
    let failed_unit_ids: Vec<String> = source["unitResults"]
        .as_object()
        .unwrap()
        .iter()
        .filter(|(_, unit)| unit["status"] == "Error")
        .map(|(id, _)| id.clone())
        .collect();
    assert_eq!(failed_unit_ids.len(), 1);

    // The sanitized error never carries credential material.
    let failed = &source["unitResults"][failed_unit_ids[0].as_str()];
    let message = failed["error"].as_str().unwrap();
    assert!(message.contains("authorization error"));

    // Retrying with an empty failed set copies every unit forward.
    let (status, body) = post_json(
        &hx.router,
        "/v1/tests/retry",
        serde_json::json!({ "batchId": source_id, "failedUnitIds": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let copied_id = body["batchId"].as_str().unwrap().to_string();
    hx.orchestrator.registry().join_batch(&copied_id).await;

    // Copying forward preserves the source's outcomes: the failed unit has
    // no prior success to copy, so the copied batch records it as an error.
    let copied = poll_batch(&hx.router, &copied_id).await;
    assert_eq!(copied["status"], "Error");
    let copied_failed = &copied["unitResults"][failed_unit_ids[0].as_str()];
    assert_eq!(copied_failed["status"], "Error");
    assert!(
        copied_failed["error"]
            .as_str()
            .unwrap()
            .contains("no prior successful result")
    );

    // Re-running the failed unit leaves the healthy unit's copied score
    // identical to the source's.
    let (status, body) = post_json(
        &hx.router,
        "/v1/tests/retry",
        serde_json::json!({ "batchId": source_id, "failedUnitIds": failed_unit_ids }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let rerun_id = body["batchId"].as_str().unwrap().to_string();
    hx.orchestrator.registry().join_batch(&rerun_id).await;

    let rerun = poll_batch(&hx.router, &rerun_id).await;
    let ok_id = rerun["unitResults"]
        .as_object()
        .unwrap()
        .keys()
        .find(|id| **id != failed_unit_ids[0])
        .unwrap()
        .clone();
    assert_eq!(rerun["unitResults"][ok_id.as_str()]["status"], "Complete");
    assert_eq!(
        rerun["unitResults"][ok_id.as_str()]["cosineSimilarityScore"],
        source["unitResults"][ok_id.as_str()]["cosineSimilarityScore"]
    );
}
