//! OpenAI-compatible chat-completion client.
//!
//! Non-streaming, JSON mode. Works against any endpoint speaking the
//! `/chat/completions` protocol (OpenAI, Groq, local gateways); endpoints
//! that reject `response_format` get one retry without it.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::backend::{strip_code_fences, CompletionBackend};
use maum_core::{Error, Result};

const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: usize = 800;

/// Chat-completion client for OpenAI-compatible APIs.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Llm(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    async fn request(&self, system: &str, user: &str, json_mode: bool) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        debug!("completion request to {} with model {}", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Llm(format!("Response read failed: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Llm(format!("API error {}: {}", status, text)));
        }

        let parsed: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("Malformed API response: {}", e)))?;
        let content = parsed["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| Error::Llm("API response has no message content".into()))?;

        Ok(strip_code_fences(content).to_string())
    }
}

impl CompletionBackend for OpenAiClient {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        match self.request(system, user, true).await {
            Ok(content) => Ok(content),
            Err(Error::Llm(msg)) if msg.contains("response_format") => {
                warn!("endpoint rejected response_format, retrying without it");
                self.request(system, user, false).await
            }
            Err(e) => Err(e),
        }
    }
}
