//! Response Types
//!
//! JSON bodies returned by the HTTP routes.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::services::{ApplicationReceipt, ChatOutcome, VoiceOutcome};
use yojna_setu_core::{ActionDirective, MalformedAction};

/// Greeting served at `/`
pub const WELCOME_MESSAGE: &str = "Welcome to Yojana-Setu AI Backend (Hackathon Ready)";

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

impl Default for WelcomeResponse {
    fn default() -> Self {
        Self {
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
    /// Chat providers in fallback order
    pub providers: Vec<String>,
    pub voice: bool,
}

impl HealthResponse {
    pub fn new(database: bool, providers: Vec<String>, voice: bool) -> Self {
        Self {
            status: if database { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            providers,
            voice,
        }
    }
}

/// Body of `POST /register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub status: String,
    pub message: String,
}

impl RegisterResponse {
    pub fn registered(username: &str) -> Self {
        Self {
            status: "Success".to_string(),
            message: format!("User {} registered successfully", username),
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDirective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed_action: Option<MalformedAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            reply: outcome.reply,
            action: outcome.action,
            application: outcome.application,
            malformed_action: outcome.malformed_action,
            scheme: outcome.scheme,
        }
    }
}

/// Body of `POST /process-voice`
#[derive(Debug, Clone, Serialize)]
pub struct VoiceResponse {
    pub transcript: String,
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub has_audio: bool,
    /// Reply audio, base64 encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

impl From<VoiceOutcome> for VoiceResponse {
    fn from(outcome: VoiceOutcome) -> Self {
        let audio_base64 = outcome
            .audio
            .as_deref()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes));
        Self {
            transcript: outcome.transcript,
            chat: outcome.chat.into(),
            has_audio: audio_base64.is_some(),
            audio_base64,
        }
    }
}
