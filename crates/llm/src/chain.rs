//! Provider Fallback Chain
//!
//! Tries chat providers in order until one answers. Each attempt is its own
//! failure boundary: any error moves on to the next provider, and the chain
//! only fails once every allowed attempt has failed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::provider::LlmProvider;
use crate::types::{LlmError, LlmRequestOptions, LlmResponse, LlmResult};
use yojna_setu_core::ConversationTurn;

/// Reasons a provider attempt can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Provider is not configured or refused the key
    Unavailable,
    /// Rate limited
    RateLimited,
    /// Network/connection error
    NetworkError,
    /// Provider answered with something unusable
    InvalidResponse,
    /// Provider returned an error
    Error,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Unavailable => write!(f, "unavailable"),
            FailureReason::RateLimited => write!(f, "rate_limited"),
            FailureReason::NetworkError => write!(f, "network_error"),
            FailureReason::InvalidResponse => write!(f, "invalid_response"),
            FailureReason::Error => write!(f, "error"),
        }
    }
}

impl FailureReason {
    /// Classify a provider error
    pub fn from_llm_error(err: &LlmError) -> Self {
        match err {
            LlmError::AuthenticationFailed { .. }
            | LlmError::ModelNotFound { .. }
            | LlmError::ProviderUnavailable { .. } => FailureReason::Unavailable,
            LlmError::RateLimited { .. } => FailureReason::RateLimited,
            LlmError::NetworkError { .. } => FailureReason::NetworkError,
            LlmError::ParseError { .. } | LlmError::InvalidRequest { .. } => {
                FailureReason::InvalidResponse
            }
            LlmError::ServerError { .. } | LlmError::Other { .. } => FailureReason::Error,
        }
    }
}

/// Configuration for fallback behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Maximum number of provider attempts per request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Delay between attempts in milliseconds
    #[serde(default)]
    pub delay_between_attempts_ms: u64,
}

fn default_max_attempts() -> usize {
    3
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_between_attempts_ms: 0,
        }
    }
}

/// Record of a single provider attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackAttempt {
    /// Provider that was tried
    pub provider: String,
    /// Whether this attempt succeeded
    pub success: bool,
    /// Failure reason if failed
    pub failure_reason: Option<FailureReason>,
    /// Error message if failed
    pub error_message: Option<String>,
    /// Duration of the attempt in milliseconds
    pub duration_ms: u64,
    /// Timestamp when attempt started
    pub started_at: String,
}

impl FallbackAttempt {
    /// Create a successful attempt record
    pub fn success(provider: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            provider: provider.into(),
            success: true,
            failure_reason: None,
            error_message: None,
            duration_ms,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a failed attempt record
    pub fn failure(provider: impl Into<String>, error: &LlmError, duration_ms: u64) -> Self {
        Self {
            provider: provider.into(),
            success: false,
            failure_reason: Some(FailureReason::from_llm_error(error)),
            error_message: Some(error.to_string()),
            duration_ms,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Log of all attempts made for one request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackExecutionLog {
    /// All attempts made
    pub attempts: Vec<FallbackAttempt>,
    /// Total duration in milliseconds
    pub total_duration_ms: u64,
    /// Provider that answered (if any)
    pub successful_provider: Option<String>,
    /// Whether execution ultimately succeeded
    pub overall_success: bool,
}

impl FallbackExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attempt to the log
    pub fn add_attempt(&mut self, attempt: FallbackAttempt) {
        self.total_duration_ms += attempt.duration_ms;
        if attempt.success {
            self.successful_provider = Some(attempt.provider.clone());
            self.overall_success = true;
        }
        self.attempts.push(attempt);
    }

    /// Number of failed attempts
    pub fn failed_attempts_count(&self) -> usize {
        self.attempts.iter().filter(|a| !a.success).count()
    }
}

/// Ordered list of chat providers, primary first.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn LlmProvider>>,
    config: ChainConfig,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.provider_names())
            .field("config", &self.config)
            .finish()
    }
}

impl ProviderChain {
    /// Create a chain with the given primary provider
    pub fn new(primary: Arc<dyn LlmProvider>) -> Self {
        Self {
            providers: vec![primary],
            config: ChainConfig::default(),
        }
    }

    /// Create a chain from providers in preference order
    pub fn from_providers(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self {
            providers,
            config: ChainConfig::default(),
        }
    }

    /// Add a fallback provider
    pub fn add_fallback(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Set the configuration
    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Provider names in the order they are tried
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Send a conversation, falling back through the chain on failure.
    ///
    /// Returns the first successful response with the attempt log, or
    /// [`LlmError::ProviderUnavailable`] once all attempts failed.
    pub async fn send_message(
        &self,
        messages: &[ConversationTurn],
        request_options: &LlmRequestOptions,
    ) -> LlmResult<(LlmResponse, FallbackExecutionLog)> {
        let mut log = FallbackExecutionLog::new();
        let mut attempts = 0;

        for provider in &self.providers {
            if attempts >= self.config.max_attempts {
                warn!("Max provider attempts ({}) reached", self.config.max_attempts);
                break;
            }

            debug!(provider = provider.name(), model = provider.model(), "Sending chat request");
            let attempt_start = Instant::now();

            let result = provider
                .send_message(messages, request_options)
                .await
                .and_then(reject_empty_reply);

            match result {
                Ok(response) => {
                    let duration_ms = attempt_start.elapsed().as_millis() as u64;
                    info!(
                        provider = provider.name(),
                        duration_ms,
                        tokens = response.usage.total_tokens(),
                        "Provider answered"
                    );
                    log.add_attempt(FallbackAttempt::success(provider.name(), duration_ms));
                    return Ok((response, log));
                }
                Err(e) => {
                    let duration_ms = attempt_start.elapsed().as_millis() as u64;
                    let attempt = FallbackAttempt::failure(provider.name(), &e, duration_ms);
                    warn!(
                        provider = provider.name(),
                        reason = ?attempt.failure_reason,
                        error = %e,
                        "Provider failed"
                    );
                    log.add_attempt(attempt);

                    attempts += 1;

                    if self.config.delay_between_attempts_ms > 0
                        && attempts < self.config.max_attempts
                    {
                        tokio::time::sleep(Duration::from_millis(
                            self.config.delay_between_attempts_ms,
                        ))
                        .await;
                    }
                }
            }
        }

        let summary = log
            .attempts
            .iter()
            .map(|a| {
                format!(
                    "{}: {}",
                    a.provider,
                    a.error_message.as_deref().unwrap_or("failed")
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        Err(LlmError::ProviderUnavailable {
            message: if summary.is_empty() {
                "no chat provider configured".to_string()
            } else {
                summary
            },
        })
    }
}

/// A reply with no text is no answer at all; let the next provider try.
fn reject_empty_reply(response: LlmResponse) -> LlmResult<LlmResponse> {
    if response.text().trim().is_empty() {
        return Err(LlmError::ParseError {
            message: "provider returned an empty reply".to_string(),
        });
    }
    Ok(response)
}
