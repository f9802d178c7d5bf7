//! Yojna Setu LLM
//!
//! Provider clients used by the eligibility assistant:
//! - Sarvam chat completions (primary)
//! - OpenAI-compatible chat completions (fallback)
//! - Sarvam speech-to-text and text-to-speech
//!
//! Also includes the provider fallback chain and the HTTP client factory.

pub mod chain;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod sarvam;
pub mod speech;
pub mod types;

// Re-export main types
pub use chain::{ChainConfig, FailureReason, FallbackAttempt, FallbackExecutionLog, ProviderChain};
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use sarvam::SarvamProvider;
pub use speech::{AudioClip, SarvamSpeech, SpeechConfig, SpeechToText, TextToSpeech};
pub use types::*;
