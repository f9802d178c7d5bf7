//! Voice Service
//!
//! Voice-note turn: store the upload, transcribe it, run the transcript
//! through the agent and synthesize the reply.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::services::agent::{AgentService, ChatOutcome, ChatRequest};
use crate::storage::{voice_note_key, BlobStore};
use crate::utils::error::{AppError, AppResult};
use crate::utils::mask::mask_phone;
use yojna_setu_llm::{AudioClip, SpeechToText, TextToSpeech};

/// An uploaded voice note
#[derive(Debug, Clone)]
pub struct VoiceRequest {
    pub phone: String,
    /// Language tag, the service default when absent
    pub language: Option<String>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Result of a voice turn
#[derive(Debug, Clone, Serialize)]
pub struct VoiceOutcome {
    pub transcript: String,
    #[serde(flatten)]
    pub chat: ChatOutcome,
    /// Synthesized reply audio; `None` when speech synthesis failed
    #[serde(skip)]
    pub audio: Option<Vec<u8>>,
}

impl VoiceOutcome {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

pub struct VoiceService {
    agent: Arc<AgentService>,
    blobs: Arc<dyn BlobStore>,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn TextToSpeech>,
    default_language: String,
}

impl std::fmt::Debug for VoiceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceService")
            .field("stt", &self.stt.name())
            .field("tts", &self.tts.name())
            .field("default_language", &self.default_language)
            .finish()
    }
}

impl VoiceService {
    pub fn new(
        agent: Arc<AgentService>,
        blobs: Arc<dyn BlobStore>,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            blobs,
            stt,
            tts,
            default_language: default_language.into(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Process one voice note.
    ///
    /// Upload and transcription failures end the turn with an error. A
    /// failed synthesis only drops the audio from the outcome.
    pub async fn process(&self, request: VoiceRequest) -> AppResult<VoiceOutcome> {
        let masked = mask_phone(&request.phone);
        let language = request
            .language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_language)
            .to_string();

        let key = voice_note_key(&request.phone);
        let location = self.blobs.put(&key, &request.bytes).await.map_err(|e| {
            warn!(phone = %masked, error = %e, "Voice note upload failed");
            AppError::internal("Audio upload failed")
        })?;
        info!(phone = %masked, bytes = request.bytes.len(), %location, "Voice note stored");

        let mut clip = AudioClip::new(request.file_name, request.bytes).with_location(location);
        if let Some(content_type) = request.content_type.filter(|c| !c.trim().is_empty()) {
            clip = clip.with_content_type(content_type);
        }

        let transcript = self
            .stt
            .transcribe(&clip, &language)
            .await
            .ok_or_else(|| AppError::internal("Transcription failed"))?;
        info!(phone = %masked, %language, chars = transcript.chars().count(), "Voice note transcribed");

        let chat = self
            .agent
            .chat(ChatRequest::new(request.phone, transcript.clone()))
            .await;

        let audio = self.tts.synthesize(&chat.reply, &language).await;
        if audio.is_none() {
            warn!(phone = %masked, %language, "Reply synthesis failed; returning text only");
        }

        Ok(VoiceOutcome {
            transcript,
            chat,
            audio,
        })
    }
}
