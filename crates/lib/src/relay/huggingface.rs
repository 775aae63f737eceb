//! Hugging Face hosted-inference client (POST /models/{model}).

use crate::config::{Config, RelayConfig};
use crate::error::{error_for_status, ClientError};
use crate::relay::InferenceRelay;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Client for the Hugging Face inference API.
#[derive(Clone)]
pub struct HuggingFaceRelay {
    endpoint: String,
    model: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HuggingFaceRelay {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let relay: &RelayConfig = &config.relay;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(relay.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: relay.endpoint.trim_end_matches('/').to_string(),
            model: relay.model.clone(),
            api_token: crate::config::resolve_relay_token(config),
            client,
        })
    }
}

#[async_trait]
impl InferenceRelay for HuggingFaceRelay {
    async fn generate(&self, prompt: &str) -> Result<String, ClientError> {
        if prompt.trim().is_empty() {
            return Err(ClientError::Validation("prompt is empty".to_string()));
        }
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| ClientError::Auth("relay API token not configured".to_string()))?;
        let url = format!("{}/models/{}", self.endpoint, self.model);
        let body = serde_json::json!({ "inputs": prompt });
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_for_status(res).await);
        }
        // The API returns one candidate per input: [{"generated_text": ...}].
        let candidates: Vec<GeneratedText> = res.json().await?;
        let text = candidates
            .into_iter()
            .next()
            .map(|c| c.generated_text)
            .ok_or_else(|| {
                ClientError::Network("inference response contained no generated text".to_string())
            })?;
        log::debug!("relay generated {} bytes for model {}", text.len(), self.model);
        Ok(text)
    }
}
