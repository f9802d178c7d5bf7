//! Speech Providers
//!
//! Speech-to-text and text-to-speech clients for the voice pipeline. Both
//! traits return `Option`: a speech failure degrades the voice turn (no
//! transcript, or a reply without audio) instead of failing the request.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::http_client::build_http_client;
use crate::provider::{missing_api_key_error, parse_http_error};
use crate::sarvam::SARVAM_KEY_HEADER;
use crate::types::{LlmError, LlmResult, ProxyConfig};

/// Default Sarvam speech-to-text endpoint
pub const SARVAM_STT_URL: &str = "https://api.sarvam.ai/speech-to-text";

/// Default Sarvam text-to-speech endpoint
pub const SARVAM_TTS_URL: &str = "https://api.sarvam.ai/text-to-speech";

/// Language used when the client sends none.
pub const DEFAULT_LANGUAGE: &str = "hi-IN";

/// A recorded audio clip handed to speech-to-text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Where the clip was persisted (e.g. `file:///...`), empty if not stored
    pub location: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            location: String::new(),
            file_name: file_name.into(),
            content_type: "audio/mpeg".to_string(),
            bytes,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Transcribes recorded speech.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transcript of `clip`, or `None` when transcription failed or was empty.
    async fn transcribe(&self, clip: &AudioClip, language: &str) -> Option<String>;
}

/// Synthesizes speech for assistant replies.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    fn name(&self) -> &'static str;

    /// Encoded audio for `text`, or `None` when synthesis failed.
    async fn synthesize(&self, text: &str, language: &str) -> Option<Vec<u8>>;
}

/// Configuration for the Sarvam speech endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_stt_url")]
    pub stt_url: String,
    #[serde(default = "default_tts_url")]
    pub tts_url: String,
    #[serde(default = "default_stt_model")]
    pub stt_model: String,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_speaker")]
    pub speaker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

fn default_stt_url() -> String {
    SARVAM_STT_URL.to_string()
}

fn default_tts_url() -> String {
    SARVAM_TTS_URL.to_string()
}

fn default_stt_model() -> String {
    "saaras:v3".to_string()
}

fn default_tts_model() -> String {
    "bulbul:v3".to_string()
}

fn default_speaker() -> String {
    "shubh".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            stt_url: default_stt_url(),
            tts_url: default_tts_url(),
            stt_model: default_stt_model(),
            tts_model: default_tts_model(),
            speaker: default_speaker(),
            proxy: None,
        }
    }
}

/// Sarvam speech client implementing both directions.
pub struct SarvamSpeech {
    config: SpeechConfig,
    client: reqwest::Client,
}

impl SarvamSpeech {
    pub fn new(config: SpeechConfig) -> LlmResult<Self> {
        let client = build_http_client(config.proxy.as_ref())?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| missing_api_key_error("sarvam speech"))
    }

    /// Upload the clip as multipart form data and read back the transcript.
    pub async fn try_transcribe(&self, clip: &AudioClip, language: &str) -> LlmResult<String> {
        let api_key = self.api_key()?;

        let part = reqwest::multipart::Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.content_type)
            .map_err(|e| LlmError::InvalidRequest {
                message: format!("invalid audio content type: {}", e),
            })?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.stt_model.clone())
            .text("mode", "transcribe")
            .text("language_code", language.to_string());

        let response = self
            .client
            .post(&self.config.stt_url)
            .header(SARVAM_KEY_HEADER, api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(parse_http_error(status, &body, "sarvam-stt"));
        }

        let parsed: TranscriptResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse transcript: {}", e),
            })?;
        Ok(parsed.transcript)
    }

    /// Request speech for `text` and decode the first returned clip.
    pub async fn try_synthesize(&self, text: &str, language: &str) -> LlmResult<Vec<u8>> {
        let api_key = self.api_key()?;

        let body = serde_json::json!({
            "text": text,
            "target_language_code": language,
            "model": self.config.tts_model,
            "speaker": self.config.speaker,
        });

        let response = self
            .client
            .post(&self.config.tts_url)
            .header(SARVAM_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(parse_http_error(status, &body, "sarvam-tts"));
        }

        decode_first_audio(&body)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    transcript: String,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    #[serde(default)]
    audios: Vec<String>,
}

fn decode_first_audio(body: &str) -> LlmResult<Vec<u8>> {
    let parsed: SynthesisResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ParseError {
            message: format!("Failed to parse synthesis response: {}", e),
        })?;
    let encoded = parsed.audios.first().ok_or_else(|| LlmError::ParseError {
        message: "synthesis response contained no audio".to_string(),
    })?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| LlmError::ParseError {
            message: format!("audio is not valid base64: {}", e),
        })
}

#[async_trait]
impl SpeechToText for SarvamSpeech {
    fn name(&self) -> &'static str {
        "sarvam"
    }

    async fn transcribe(&self, clip: &AudioClip, language: &str) -> Option<String> {
        match self.try_transcribe(clip, language).await {
            Ok(transcript) if !transcript.trim().is_empty() => Some(transcript),
            Ok(_) => {
                warn!(file = %clip.file_name, "Speech-to-text returned an empty transcript");
                None
            }
            Err(e) => {
                warn!(file = %clip.file_name, error = %e, "Speech-to-text failed");
                None
            }
        }
    }
}

#[async_trait]
impl TextToSpeech for SarvamSpeech {
    fn name(&self) -> &'static str {
        "sarvam"
    }

    async fn synthesize(&self, text: &str, language: &str) -> Option<Vec<u8>> {
        match self.try_synthesize(text, language).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!(error = %e, "Text-to-speech failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_config_defaults() {
        let config = SpeechConfig::default();
        assert_eq!(config.stt_model, "saaras:v3");
        assert_eq!(config.tts_model, "bulbul:v3");
        assert_eq!(config.speaker, "shubh");
        assert_eq!(config.stt_url, SARVAM_STT_URL);
    }

    #[test]
    fn test_speech_config_never_serializes_key() {
        let config = SpeechConfig {
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_decode_first_audio() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"ID3audio");
        let body = format!(r#"{{"request_id": "r1", "audios": ["{}", "ignored"]}}"#, encoded);
        assert_eq!(decode_first_audio(&body).unwrap(), b"ID3audio".to_vec());
    }

    #[test]
    fn test_decode_rejects_empty_or_invalid_audio() {
        assert!(decode_first_audio(r#"{"audios": []}"#).is_err());
        assert!(decode_first_audio(r#"{"audios": ["***"]}"#).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_degrades_to_none() {
        let speech = SarvamSpeech::new(SpeechConfig::default()).unwrap();
        let clip = AudioClip::new("input.mp3", vec![1, 2, 3]);
        assert_eq!(speech.transcribe(&clip, DEFAULT_LANGUAGE).await, None);
        assert_eq!(speech.synthesize("Namaste", DEFAULT_LANGUAGE).await, None);
    }
}
