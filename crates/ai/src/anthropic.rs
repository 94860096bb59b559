//! Anthropic-style messages provider.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::provider::{ContentBlock, LlmProvider, LlmRequest, ProviderOutput};

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Client for `POST {base_url}/messages`.
#[derive(Clone)]
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AnthropicProvider {
    /// Create a provider.
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn payload(request: &LlmRequest) -> serde_json::Value {
        json!({
            "model": request.model_id,
            "system": request.system_prompt,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<serde_json::Value>,
}

fn parse_block(block: serde_json::Value) -> ContentBlock {
    match block.get("type").and_then(|t| t.as_str()) {
        Some("text") => match block.get("text").and_then(|t| t.as_str()) {
            Some(text) => ContentBlock::Text(text.to_string()),
            None => ContentBlock::Other(block),
        },
        Some("tool_use") => ContentBlock::ToolUse {
            name: block
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string(),
            input: block.get("input").cloned().unwrap_or(serde_json::Value::Null),
        },
        _ => ContentBlock::Other(block),
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<ProviderOutput> {
        debug!("Calling Anthropic model {}", request.model_id);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&Self::payload(request))
            .send()
            .await
            .context("Failed to call Anthropic messages API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error (status {}): {}", status, error_text);
        }

        let body: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;
        Ok(ProviderOutput {
            content: body.content.into_iter().map(parse_block).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatMessage;

    #[test]
    fn test_payload_uses_top_level_system() {
        let request = LlmRequest {
            model_id: "claude".to_string(),
            system_prompt: "sys".to_string(),
            messages: vec![ChatMessage::user("q")],
            temperature: 0.5,
            max_tokens: 10,
        };
        let payload = AnthropicProvider::payload(&request);
        assert_eq!(payload["system"], "sys");
        assert_eq!(payload["messages"], json!([{ "role": "user", "content": "q" }]));
    }

    #[test]
    fn test_parse_blocks() {
        assert_eq!(
            parse_block(json!({ "type": "text", "text": "hi" })),
            ContentBlock::Text("hi".to_string())
        );
        assert_eq!(
            parse_block(json!({ "type": "tool_use", "name": "run", "input": { "a": 1 } })),
            ContentBlock::ToolUse {
                name: "run".to_string(),
                input: json!({ "a": 1 })
            }
        );
        assert!(matches!(parse_block(json!({ "type": "image" })), ContentBlock::Other(_)));
    }
}
