use crate::error::ScoringResult;
use async_trait::async_trait;

/// A chat-completion backend that turns one scoring prompt into the model's
/// raw reply text.
///
/// Implementations must not retry: a failed call fails the whole batch and
/// the job tries again at its next scheduled tick.
#[async_trait]
pub trait ScoreClient: Send + Sync {
    async fn score_batch(&self, prompt: &str) -> ScoringResult<String>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}
