//! Deterministic offline scoring provider, used when no API key is configured.

use crate::client::ScoreClient;
use crate::error::ScoringResult;
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_REPLY: &str = r#"{"depression": 20, "brightness": 55, "excitement": 40, "anger": 10, "sadness": 20, "thrill": 30}"#;

#[derive(Debug)]
pub struct MockScoreClient {
    reply: String,
    calls: AtomicUsize,
}

impl MockScoreClient {
    pub fn new() -> Self {
        Self::with_reply(DEFAULT_REPLY)
    }

    /// Always answer with `reply`.
    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockScoreClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ScoreClient for MockScoreClient {
    async fn score_batch(&self, _prompt: &str) -> ScoringResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
