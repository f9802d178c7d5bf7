//! Shared test doubles and helpers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use http_body_util::BodyExt;

use yojna_setu::models::settings::AppConfig;
use yojna_setu::state::{AppState, VoiceBackend};
use yojna_setu::storage::{Database, LocalBlobStore};
use yojna_setu_core::{ConversationTurn, SchemeCatalog};
use yojna_setu_llm::{
    AudioClip, LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, ProviderChain,
    ProviderConfig, SpeechToText, StopReason, TextToSpeech, UsageStats,
};

/// Chat provider answering from a script, one entry per request
pub struct ScriptedProvider {
    name: &'static str,
    replies: Mutex<VecDeque<LlmResult<String>>>,
    requests: Mutex<Vec<Vec<ConversationTurn>>>,
    config: ProviderConfig,
}

impl ScriptedProvider {
    pub fn new<I, S>(name: &'static str, replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            name,
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
            config: ProviderConfig::default(),
        })
    }

    /// A provider whose every request fails with a server error
    pub fn down(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            config: ProviderConfig::default(),
        })
    }

    pub fn requests(&self) -> Vec<Vec<ConversationTurn>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn send_message(
        &self,
        messages: &[ConversationTurn],
        _request_options: &LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(LlmError::ServerError {
                message: "service unavailable".to_string(),
                status: Some(503),
            })
        })?;
        Ok(LlmResponse {
            content: Some(reply),
            stop_reason: StopReason::EndTurn,
            usage: UsageStats::default(),
            model: "scripted".to_string(),
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Speech double with a fixed transcript and fixed reply audio
pub struct FakeSpeech {
    pub transcript: Option<String>,
    pub audio: Option<Vec<u8>>,
    pub languages: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn new(transcript: Option<&str>, audio: Option<&[u8]>) -> Arc<Self> {
        Arc::new(Self {
            transcript: transcript.map(String::from),
            audio: audio.map(<[u8]>::to_vec),
            languages: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn transcribe(&self, _clip: &AudioClip, language: &str) -> Option<String> {
        self.languages.lock().unwrap().push(language.to_string());
        self.transcript.clone()
    }
}

#[async_trait]
impl TextToSpeech for FakeSpeech {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn synthesize(&self, _text: &str, _language: &str) -> Option<Vec<u8>> {
        self.audio.clone()
    }
}

/// State over an in-memory database; the temp dir holds voice blobs.
pub fn test_state(
    provider: Arc<ScriptedProvider>,
    speech: Option<Arc<FakeSpeech>>,
) -> (Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let voice = speech.map(|speech| VoiceBackend {
        blobs: Arc::new(LocalBlobStore::new(dir.path().join("blobs"))),
        stt: speech.clone(),
        tts: speech,
    });
    let state = AppState::with_services(
        AppConfig::default(),
        Database::new_in_memory().unwrap(),
        SchemeCatalog::builtin(),
        ProviderChain::new(provider),
        voice,
    );
    (Arc::new(state), dir)
}

/// Percent-encode a form value
fn encode(value: &str) -> String {
    let mut out = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

pub fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub const BOUNDARY: &str = "yojna-setu-test-boundary";

/// One multipart part: (name, optional file name, content)
pub type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: audio/mpeg\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Marker the assistant appends once every PM Kisan field is known
pub const KISAN_SUBMIT: &str = r#"Dhanyavaad! Main aapka aavedan bhej raha hoon. [ACTION: OPEN_PORTAL | scheme: PM Kisan | details: {"aadhar": "1234-5678-9012", "farmer_id": "WB-FARM-77", "bank_account": "SBIN000123"}]"#;
