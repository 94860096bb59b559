//! OpenAI-style chat completions provider.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::provider::{ContentBlock, LlmProvider, LlmRequest, ProviderOutput};

/// Client for `POST {base_url}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
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
        let mut messages = vec![json!({ "role": "system", "content": request.system_prompt })];
        messages.extend(
            request
                .messages
                .iter()
                .map(|m| json!({ "role": m.role, "content": m.content })),
        );

        json!({
            "model": request.model_id,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: ToolFunction,
}

#[derive(Deserialize)]
struct ToolFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn parse_response(response: CompletionResponse) -> ProviderOutput {
    let mut content = Vec::new();
    if let Some(message) = response.choices.into_iter().next().map(|c| c.message) {
        if let Some(text) = message.content {
            content.push(ContentBlock::Text(text));
        }
        for call in message.tool_calls {
            let input = serde_json::from_str(&call.function.arguments)
                .unwrap_or(serde_json::Value::String(call.function.arguments));
            content.push(ContentBlock::ToolUse {
                name: call.function.name,
                input,
            });
        }
    }
    ProviderOutput { content }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<ProviderOutput> {
        debug!("Calling OpenAI model {}", request.model_id);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&Self::payload(request))
            .send()
            .await
            .context("Failed to call OpenAI chat completions API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error (status {}): {}", status, error_text);
        }

        let body: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;
        Ok(parse_response(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatMessage;

    #[test]
    fn test_payload_puts_system_first() {
        let request = LlmRequest {
            model_id: "gpt-4o".to_string(),
            system_prompt: "sys".to_string(),
            messages: vec![ChatMessage::user("hi"), ChatMessage::assistant("hello"), ChatMessage::user("q")],
            temperature: 0.7,
            max_tokens: 100,
        };
        let payload = OpenAiProvider::payload(&request);
        assert_eq!(payload["model"], "gpt-4o");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][2]["role"], "assistant");
        assert_eq!(payload["messages"][3]["content"], "q");
        assert_eq!(payload["max_tokens"], 100);
    }

    #[test]
    fn test_parse_text_and_tool_calls() {
        let body: CompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "done",
                    "tool_calls": [{ "function": { "name": "write", "arguments": "{\"path\":\"a\"}" } }]
                }
            }]
        }))
        .unwrap();
        let output = parse_response(body);
        assert_eq!(output.content[0], ContentBlock::Text("done".to_string()));
        assert_eq!(
            output.content[1],
            ContentBlock::ToolUse {
                name: "write".to_string(),
                input: json!({ "path": "a" })
            }
        );
    }

    #[test]
    fn test_parse_empty_choices() {
        let body: CompletionResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(parse_response(body).content.is_empty());
    }
}
