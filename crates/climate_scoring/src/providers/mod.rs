pub mod mock;
pub mod openai;

pub use mock::MockScoreClient;
pub use openai::OpenAiScoreClient;

use crate::client::ScoreClient;
use anyhow::{bail, Result};
use climate_core::config::LlmConfig;
use std::sync::Arc;

/// Build the configured provider. `openai` without an API key degrades to the
/// mock provider so a local install still runs end to end.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn ScoreClient>> {
    match config.provider.as_str() {
        "openai" => match &config.api_key {
            Some(_) => Ok(Arc::new(OpenAiScoreClient::new(config)?)),
            None => {
                tracing::warn!("OPENAI_API_KEY not set, falling back to mock scorer");
                Ok(Arc::new(MockScoreClient::new()))
            }
        },
        "mock" => Ok(Arc::new(MockScoreClient::new())),
        other => bail!("Unknown LLM provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_selection() {
        let mut cfg = LlmConfig::default();
        assert_eq!(create_client(&cfg).unwrap().name(), "mock");

        cfg.api_key = Some("sk-test".into());
        assert_eq!(create_client(&cfg).unwrap().name(), "openai");

        cfg.provider = "mock".into();
        assert_eq!(create_client(&cfg).unwrap().name(), "mock");

        cfg.provider = "carrier-pigeon".into();
        assert!(create_client(&cfg).is_err());
    }
}
