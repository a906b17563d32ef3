//! Integration tests for batch scoring and the OpenAI provider contract.
//!
//! Batching is exercised with a scripted client; the provider is exercised
//! against a local wiremock server.

use async_trait::async_trait;
use chrono::NaiveDate;
use climate_core::config::LlmConfig;
use climate_core::{EmotionScoreSet, Post};
use climate_scoring::providers::OpenAiScoreClient;
use climate_scoring::{EmotionScorer, ScoreClient, ScoringError, ScoringResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Scripted client
// ============================================================================

/// Pops one scripted reply per call; `None` entries simulate an API failure.
struct ScriptedClient {
    replies: Mutex<Vec<Option<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(replies: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreClient for ScriptedClient {
    async fn score_batch(&self, prompt: &str) -> ScoringResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.to_string());
        let mut queue = self.replies.lock().await;
        let next = if queue.is_empty() { None } else { queue.remove(0) };
        next.ok_or(ScoringError::Api {
            provider: "scripted",
            status: 503,
            body: "unavailable".into(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn posts(n: usize) -> Vec<Post> {
    let base = NaiveDate::from_ymd_opt(2024, 3, 14)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| Post {
            id: i as i64,
            title: format!("post {}", i),
            body: format!("body of post {}", i),
            created_at: base,
        })
        .collect()
}

const CHUNK_A: &str = r#"{"depression": 10, "brightness": 60, "excitement": 40, "anger": 5, "sadness": 15, "thrill": 30}"#;
const CHUNK_B: &str = r#"{"depression": 20, "brightness": 30, "excitement": 25, "anger": 12, "sadness": 35, "thrill": 8}"#;

// ============================================================================
// Batching
// ============================================================================

#[tokio::test]
async fn test_45_posts_make_two_calls_and_sum() {
    let client = ScriptedClient::new(vec![Some(CHUNK_A), Some(CHUNK_B)]);
    let scorer = EmotionScorer::new(client.clone());

    let result = scorer.score_posts(&posts(45)).await.unwrap();

    assert_eq!(client.calls(), 2);
    assert_eq!(result.chunks, 2);
    assert_eq!(
        result.scores,
        EmotionScoreSet {
            depression: 30,
            brightness: 90,
            excitement: 65,
            anger: 17,
            sadness: 50,
            thrill: 38,
        }
    );

    // 30 in the first prompt, 15 in the second.
    let prompts = client.prompts.lock().await;
    assert!(prompts[0].contains("30. Title: post 29"));
    assert!(!prompts[0].contains("31. Title"));
    assert!(prompts[1].contains("15. Title: post 44"));
    assert!(!prompts[1].contains("16. Title"));
}

#[tokio::test]
async fn test_thirty_posts_is_a_single_call() {
    let client = ScriptedClient::new(vec![Some(CHUNK_A)]);
    let scorer = EmotionScorer::new(client.clone());
    let result = scorer.score_posts(&posts(30)).await.unwrap();
    assert_eq!(client.calls(), 1);
    assert_eq!(result.scores.brightness, 60);
}

#[tokio::test]
async fn test_empty_input_skips_model() {
    let client = ScriptedClient::new(vec![]);
    let scorer = EmotionScorer::new(client.clone());
    let result = scorer.score_posts(&[]).await.unwrap();
    assert_eq!(client.calls(), 0);
    assert!(result.scores.is_zero());
    assert_eq!(result.chunks, 0);
}

#[tokio::test]
async fn test_failed_chunk_aborts_remaining_chunks() {
    let client = ScriptedClient::new(vec![Some(CHUNK_A), None, Some(CHUNK_B)]);
    let scorer = EmotionScorer::new(client.clone());
    let err = scorer.score_posts(&posts(75)).await.unwrap_err();
    assert!(matches!(err, ScoringError::Api { status: 503, .. }));
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_malformed_chunk_fails_batch() {
    let client = ScriptedClient::new(vec![Some("no json here")]);
    let scorer = EmotionScorer::new(client.clone());
    let err = scorer.score_posts(&posts(3)).await.unwrap_err();
    assert!(err.is_malformed());
}

#[tokio::test]
async fn test_safety_override_is_counted_and_summed() {
    let client = ScriptedClient::new(vec![
        Some(CHUNK_A),
        Some("Please contact campus counseling. {\"depression\": 1}"),
    ]);
    let scorer = EmotionScorer::with_batch_size(client.clone(), 10);
    let result = scorer.score_posts(&posts(15)).await.unwrap();
    assert_eq!(result.safety_overrides, 1);
    assert_eq!(result.scores.depression, 10 + 80);
    assert_eq!(result.scores.sadness, 15 + 75);
}

#[tokio::test]
async fn test_batch_size_is_capped() {
    let client = ScriptedClient::new(vec![]);
    assert_eq!(EmotionScorer::with_batch_size(client.clone(), 500).batch_size(), 30);
    assert_eq!(EmotionScorer::with_batch_size(client, 0).batch_size(), 1);
}

// ============================================================================
// OpenAI provider
// ============================================================================

fn provider_config(server: &MockServer) -> LlmConfig {
    LlmConfig {
        base_url: Some(format!("{}/v1/", server.uri())),
        api_key: Some("sk-test".into()),
        timeout_secs: 1,
        ..LlmConfig::default()
    }
}

#[tokio::test]
async fn test_openai_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-5-mini",
            "reasoning_effort": "minimal",
            "verbosity": "low",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": CHUNK_A},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiScoreClient::new(&provider_config(&server)).unwrap();
    let text = client.score_batch("prompt").await.unwrap();
    assert_eq!(text, CHUNK_A);
}

#[tokio::test]
async fn test_openai_error_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiScoreClient::new(&provider_config(&server)).unwrap();
    let err = client.score_batch("prompt").await.unwrap_err();
    match err {
        ScoringError::Api { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(3))
                .set_body_string("{}"),
        )
        .mount(&server)
        .await;

    let client = OpenAiScoreClient::new(&provider_config(&server)).unwrap();
    let err = client.score_batch("prompt").await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {:?}", err);
}

#[tokio::test]
async fn test_openai_missing_content_is_invalid_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&server)
        .await;

    let client = OpenAiScoreClient::new(&provider_config(&server)).unwrap();
    let err = client.score_batch("prompt").await.unwrap_err();
    assert!(matches!(err, ScoringError::InvalidEnvelope(_)));
}
