//! Batch processing: split a post list into capped chunks, score each chunk
//! with one model call, and sum the chunk results.

use crate::client::ScoreClient;
use crate::error::ScoringResult;
use crate::parser::{parse_scores, ParseOutcome};
use crate::prompt::build_prompt;
use climate_core::config::MAX_BATCH_SIZE;
use climate_core::{EmotionScoreSet, Post};
use serde::Serialize;
use std::sync::Arc;

/// Result of scoring one analysis batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchScore {
    /// Elementwise sum over all chunks. With more than one chunk the totals
    /// can exceed 100.
    pub scores: EmotionScoreSet,
    pub chunks: usize,
    /// Chunks whose reply was replaced by the distress set.
    pub safety_overrides: usize,
}

impl BatchScore {
    fn empty() -> Self {
        Self {
            scores: EmotionScoreSet::zero(),
            chunks: 0,
            safety_overrides: 0,
        }
    }
}

pub struct EmotionScorer {
    client: Arc<dyn ScoreClient>,
    batch_size: usize,
}

impl EmotionScorer {
    pub fn new(client: Arc<dyn ScoreClient>) -> Self {
        Self::with_batch_size(client, MAX_BATCH_SIZE)
    }

    /// `batch_size` is capped to [`MAX_BATCH_SIZE`].
    pub fn with_batch_size(client: Arc<dyn ScoreClient>, batch_size: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Score `posts`. An empty list returns the all-zero set without calling
    /// the model. Chunks are scored in order; the first failure aborts the
    /// remaining chunks.
    pub async fn score_posts(&self, posts: &[Post]) -> ScoringResult<BatchScore> {
        if posts.is_empty() {
            return Ok(BatchScore::empty());
        }

        let total_chunks = posts.len().div_ceil(self.batch_size);
        let mut result = BatchScore::empty();

        for (index, chunk) in posts.chunks(self.batch_size).enumerate() {
            let outcome = self.score_chunk(chunk).await.map_err(|e| {
                tracing::error!(
                    "Scoring chunk {}/{} via {} failed: {}",
                    index + 1,
                    total_chunks,
                    self.client.name(),
                    e
                );
                e
            })?;

            if outcome.is_safety_override() {
                result.safety_overrides += 1;
            }
            result.scores += outcome.scores();
            result.chunks += 1;

            tracing::debug!(
                "Chunk {}/{} ({} posts) scored: {:?}",
                index + 1,
                total_chunks,
                chunk.len(),
                outcome.scores()
            );
        }

        tracing::info!(
            "Scored {} posts in {} chunk(s), {} safety override(s)",
            posts.len(),
            result.chunks,
            result.safety_overrides
        );
        Ok(result)
    }

    async fn score_chunk(&self, chunk: &[Post]) -> ScoringResult<ParseOutcome> {
        let prompt = build_prompt(chunk);
        let reply = self.client.score_batch(&prompt).await?;
        parse_scores(&reply)
    }
}
