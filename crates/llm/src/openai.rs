//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI-compatible
//! `/chat/completions` endpoints. The wire helpers here are shared with the
//! Sarvam provider, which speaks the same format.

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, ProviderConfig, StopReason, UsageStats,
};
use crate::http_client::build_http_client;
use yojna_setu_core::ConversationTurn;

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(config.proxy.as_ref())?;
        Ok(Self { config, client })
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Models listing endpoint next to the configured completions URL
    fn models_url(&self) -> String {
        let base = self.base_url();
        match base.strip_suffix("/chat/completions") {
            Some(root) => format!("{}/models", root),
            None => "https://api.openai.com/v1/models".to_string(),
        }
    }
}

/// Build a `/chat/completions` request body.
pub(crate) fn chat_completion_body(
    config: &ProviderConfig,
    messages: &[ConversationTurn],
    request_options: &LlmRequestOptions,
) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = messages
        .iter()
        .map(|turn| {
            serde_json::json!({
                "role": turn.role.as_str(),
                "content": turn.content,
            })
        })
        .collect();

    serde_json::json!({
        "model": config.model,
        "messages": messages,
        "temperature": request_options
            .temperature_override
            .unwrap_or(config.temperature),
        "max_tokens": request_options
            .max_tokens_override
            .unwrap_or(config.max_tokens),
    })
}

/// Parse a `/chat/completions` response body.
pub(crate) fn parse_chat_completion(body_text: &str) -> LlmResult<LlmResponse> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body_text).map_err(|e| LlmError::ParseError {
            message: format!("Failed to parse response: {}", e),
        })?;

    let choice = response.choices.into_iter().next().ok_or_else(|| LlmError::ParseError {
        message: "response contained no choices".to_string(),
    })?;

    let stop_reason = choice
        .finish_reason
        .as_deref()
        .map(StopReason::from)
        .unwrap_or(StopReason::EndTurn);

    let usage = response
        .usage
        .map(|u| UsageStats {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let content = choice
        .message
        .and_then(|m| m.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| LlmError::ParseError {
            message: "response contained no assistant text".to_string(),
        })?;

    Ok(LlmResponse {
        content: Some(content),
        stop_reason,
        usage,
        model: response.model,
    })
}

/// Send a request and turn non-2xx statuses into typed errors.
pub(crate) async fn send_chat_completion(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> LlmResult<LlmResponse> {
    let response = request.send().await?;

    let status = response.status().as_u16();
    let body_text = response.text().await?;

    if !(200..300).contains(&status) {
        return Err(parse_http_error(status, &body_text, provider));
    }

    parse_chat_completion(&body_text)
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: &[ConversationTurn],
        request_options: &LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let body = chat_completion_body(&self.config, messages, request_options);

        let request = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        send_chat_completion(request, "openai").await
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        // List models to verify API key
        let response = self
            .client
            .get(self.models_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, "openai"))
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Chat-completions response format
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
