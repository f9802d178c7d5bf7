//! Sarvam Provider
//!
//! Primary chat provider. Sarvam exposes an OpenAI-compatible
//! `/v1/chat/completions` endpoint but authenticates with an
//! `api-subscription-key` header instead of a bearer token.

use async_trait::async_trait;

use super::openai::{chat_completion_body, send_chat_completion};
use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{LlmRequestOptions, LlmResponse, LlmResult, ProviderConfig};
use crate::http_client::build_http_client;
use yojna_setu_core::{ConversationTurn, Role};

/// Default Sarvam chat endpoint
pub const SARVAM_CHAT_URL: &str = "https://api.sarvam.ai/v1/chat/completions";

/// Header carrying the Sarvam API key
pub const SARVAM_KEY_HEADER: &str = "api-subscription-key";

/// Sarvam chat provider
pub struct SarvamProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl SarvamProvider {
    /// Create a new Sarvam provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(config.proxy.as_ref())?;
        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(SARVAM_CHAT_URL)
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| missing_api_key_error("sarvam"))
    }
}

#[async_trait]
impl LlmProvider for SarvamProvider {
    fn name(&self) -> &'static str {
        "sarvam"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: &[ConversationTurn],
        request_options: &LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self.api_key()?;
        let body = chat_completion_body(&self.config, messages, request_options);

        let request = self
            .client
            .post(self.base_url())
            .header(SARVAM_KEY_HEADER, api_key)
            .header("Content-Type", "application/json")
            .json(&body);

        send_chat_completion(request, "sarvam").await
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self.api_key()?;

        // Sarvam has no key-check endpoint; a one-token completion validates the key
        let ping = [ConversationTurn::new(Role::User, "ping")];
        let options = LlmRequestOptions {
            max_tokens_override: Some(1),
            ..Default::default()
        };
        let response = self
            .client
            .post(self.base_url())
            .header(SARVAM_KEY_HEADER, api_key)
            .json(&chat_completion_body(&self.config, &ping, &options))
            .send()
            .await?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, "sarvam"))
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
