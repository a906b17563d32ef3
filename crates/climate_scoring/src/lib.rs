//! Emotion scoring of campus posts.
//!
//! `build_prompt` → [`ScoreClient::score_batch`] → `parse_scores`, wrapped by
//! [`EmotionScorer`] which handles chunking and chunk aggregation.

pub mod api_types;
pub mod batch;
pub mod client;
pub mod error;
pub mod parser;
pub mod prompt;
pub mod providers;

pub use batch::{BatchScore, EmotionScorer};
pub use client::ScoreClient;
pub use error::{ScoringError, ScoringResult};
pub use parser::{parse_scores, ParseOutcome};
pub use providers::create_client;
