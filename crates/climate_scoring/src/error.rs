use thiserror::Error;

/// Failures of a single scoring call. A safety override is not an error; see
/// [`crate::parser::ParseOutcome`].
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The request never produced a response (connect failure, timeout).
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The completion envelope lacked `choices[0].message.content`.
    #[error("completion envelope is missing message content: {0}")]
    InvalidEnvelope(String),

    /// The model's text held no parseable JSON object.
    #[error("malformed score response: {reason}")]
    MalformedResponse { reason: String, raw: String },
}

impl ScoringError {
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        ScoringError::MalformedResponse {
            reason: reason.into(),
            raw: raw.chars().take(500).collect(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ScoringError::Transport { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ScoringError::MalformedResponse { .. })
    }
}

pub type ScoringResult<T> = std::result::Result<T, ScoringError>;
