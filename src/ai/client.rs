//! LLM (`OpenAI`) API client module
//!
//! Encapsulates all LLM API interactions for generating summaries and answers.

use async_trait::async_trait;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::info;

use super::prompt_builder::{build_answer_prompt, build_summary_prompt};
use crate::core::capabilities::CompletionService;
use crate::errors::BotError;

const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
const MAX_CONTEXT_TOKENS: usize = 128_000;
const MAX_OUTPUT_TOKENS: usize = 16_000;
const TOKEN_BUFFER: usize = 250;
const MIN_OUTPUT_TOKENS: usize = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub const TOO_LARGE_MESSAGE: &str = "The conversation is too long to summarize in full. Please ask for fewer messages with `/summary <count>`.";

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// Output budget left after the prompt, `None` when the prompt leaves too
/// little room for a useful answer.
#[must_use]
pub fn output_token_budget(prompt: &[ChatCompletionMessage]) -> Option<usize> {
    let estimated_input_tokens = prompt
        .iter()
        .map(|msg| match &msg.content {
            Content::Text(t) => estimate_tokens(t),
            Content::ImageUrl(_) => 0,
        })
        .sum::<usize>();

    info!("Estimated input tokens: {}", estimated_input_tokens);

    let max_output_tokens = MAX_CONTEXT_TOKENS
        .saturating_sub(estimated_input_tokens)
        .saturating_sub(TOKEN_BUFFER)
        .min(MAX_OUTPUT_TOKENS);

    (max_output_tokens >= MIN_OUTPUT_TOKENS).then_some(max_output_tokens)
}

/// LLM API client for generating summaries
pub struct LlmClient {
    api_key: String,
    org_id: Option<String>,
    model_name: String,
    http: Client,
}

impl LlmClient {
    #[must_use]
    pub fn new(api_key: String, org_id: Option<String>, model_name: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key,
            org_id,
            model_name,
            http,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP request to `OpenAI` fails or the response
    /// cannot be parsed into the expected shape.
    pub async fn generate(&self, prompt: Vec<ChatCompletionMessage>) -> Result<String, BotError> {
        #[cfg(feature = "debug-logs")]
        info!("Using prompt:\n{:?}", prompt);

        #[cfg(not(feature = "debug-logs"))]
        info!("Generating completion with {} messages in prompt", prompt.len());

        let Some(max_output_tokens) = output_token_budget(&prompt) else {
            return Ok(TOO_LARGE_MESSAGE.to_string());
        };

        let request_body = json!({
            "model": self.model_name,
            "input": build_responses_input_from_prompt(&prompt),
            "max_output_tokens": max_output_tokens
        });

        let mut request = self
            .http
            .post(RESPONSES_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body);
        if let Some(org) = &self.org_id {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BotError::HttpError(format!("OpenAI API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(BotError::OpenAIError(format!(
                "OpenAI API error (status {status}): {error_text}"
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| BotError::OpenAIError(format!("Failed to parse OpenAI response: {e}")))?;

        extract_output_text(&response_json)
            .ok_or_else(|| BotError::OpenAIError("No text in response".to_string()))
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn summarize(
        &self,
        messages: &[String],
        target_length: usize,
        extra_context: Option<&str>,
    ) -> Result<String, BotError> {
        self.generate(build_summary_prompt(messages, target_length, extra_context))
            .await
    }

    async fn answer(&self, query: &str, context: &[String]) -> Result<String, BotError> {
        self.generate(build_answer_prompt(query, context)).await
    }
}

/// Pulls the generated text out of a Responses API body: the `output_text`
/// shortcut if present, else every `output_text` part joined by newlines.
#[must_use]
pub fn extract_output_text(response_json: &Value) -> Option<String> {
    if let Some(text) = response_json.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let mut collected: Vec<String> = Vec::new();
    let items = response_json.get("output").and_then(Value::as_array)?;
    for item in items {
        let Some(parts) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for p in parts {
            let is_output_text = p
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t == "output_text");
            if !is_output_text {
                continue;
            }
            if let Some(s) = p.get("text").and_then(Value::as_str) {
                collected.push(s.to_string());
            } else if let Some(s) = p
                .get("text")
                .and_then(|t| t.get("value"))
                .and_then(Value::as_str)
            {
                collected.push(s.to_string());
            }
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n"))
    }
}

/// Build Responses API input payload from a chat-style prompt.
/// Assistant turns are dropped; the Responses API treats them as output.
pub(crate) fn build_responses_input_from_prompt(prompt: &[ChatCompletionMessage]) -> Vec<Value> {
    prompt
        .iter()
        .filter(|m| !matches!(m.role, MessageRole::assistant))
        .map(|m| {
            let role_str = match m.role {
                MessageRole::system => "system",
                _ => "user",
            };

            let parts: Vec<Value> = match &m.content {
                Content::Text(t) => vec![json!({ "type": "input_text", "text": t })],
                Content::ImageUrl(imgs) => imgs
                    .iter()
                    .filter_map(|img| img.image_url.as_ref())
                    .map(|iu| json!({ "type": "input_image", "image_url": iu.url }))
                    .collect(),
            };

            json!({
                "role": role_str,
                "content": parts
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompt_builder::build_summary_prompt;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn test_build_responses_input_uses_typed_parts() {
        let prompt = build_summary_prompt(&["alice: hi".to_string()], 100, Some("dates"));
        let input = build_responses_input_from_prompt(&prompt);

        assert_eq!(input.len(), prompt.len());
        assert_eq!(input[0]["role"], "system");
        assert_eq!(input.last().unwrap()["role"], "user");
        assert_eq!(input.last().unwrap()["content"][0]["type"], "input_text");
        assert_eq!(input.last().unwrap()["content"][0]["text"], "alice: hi");
    }

    #[test]
    fn test_extract_output_text_prefers_shortcut() {
        let body = json!({ "output_text": "short", "output": [] });
        assert_eq!(extract_output_text(&body).as_deref(), Some("short"));
    }

    #[test]
    fn test_extract_output_text_collects_parts() {
        let body = json!({
            "output": [
                { "type": "reasoning", "content": [] },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "first" },
                    { "type": "refusal", "text": "nope" },
                    { "type": "output_text", "text": { "value": "second" } }
                ]}
            ]
        });
        assert_eq!(extract_output_text(&body).as_deref(), Some("first\nsecond"));
        assert_eq!(extract_output_text(&json!({ "output": [] })), None);
    }

    #[tokio::test]
    async fn test_generate_short_circuits_on_large_input() {
        let big = vec!["a".repeat(600_000)];
        let client = LlmClient::new("test_key".to_string(), None, "gpt-4o-mini".to_string());

        let res = client.summarize(&big, 500, None).await.unwrap();
        assert_eq!(res, TOO_LARGE_MESSAGE);
    }
}
