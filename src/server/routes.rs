//! API routes
//!
//! Form and multipart handlers. Errors render through
//! [`AppError`]'s `IntoResponse` as `{"error": ..}`.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::response::{
    ChatResponse, HealthResponse, RegisterResponse, VoiceResponse, WelcomeResponse,
};
use crate::services::{ApplicationReceipt, ChatRequest, VoiceRequest};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::mask::mask_phone;
use yojna_setu_core::{parse_history, UserProfile};

type AppStateArc = Arc<AppState>;

/// Phone used by the voice form when the client sends none
pub const DEMO_PHONE: &str = "9876543210";

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse::default())
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let providers = state
        .agent()
        .chain()
        .provider_names()
        .into_iter()
        .map(String::from)
        .collect();
    Json(HealthResponse::new(
        state.database().is_healthy(),
        providers,
        state.voice().is_some(),
    ))
}

// ============================================================================
// User Routes
// ============================================================================

pub fn user_routes() -> Router<AppStateArc> {
    Router::new().route("/register", post(register))
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    username: String,
    email: String,
    phone: String,
}

/// Create or refresh a profile. Documents collected earlier are kept.
async fn register(
    State(state): State<AppStateArc>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Json<RegisterResponse>> {
    let phone = form.phone.trim();
    if phone.is_empty() {
        return Err(AppError::validation("phone is required"));
    }

    let mut profile = state
        .profiles()
        .get(phone)?
        .unwrap_or_else(|| UserProfile::new(phone));
    profile.merge(UserProfile::registered(phone, form.username.trim(), form.email.trim()).fields);
    state.profiles().put(&profile)?;

    info!(phone = %mask_phone(phone), "User registered");
    Ok(Json(RegisterResponse::registered(form.username.trim())))
}

// ============================================================================
// Chat Routes
// ============================================================================

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new().route("/chat", post(chat))
}

fn empty_history() -> String {
    "[]".to_string()
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    message: String,
    phone: String,
    /// JSON array of earlier turns
    #[serde(default = "empty_history")]
    history: String,
    #[serde(default)]
    scheme: Option<String>,
}

async fn chat(
    State(state): State<AppStateArc>,
    Form(form): Form<ChatForm>,
) -> AppResult<Json<ChatResponse>> {
    let history = parse_history(&form.history)
        .map_err(|e| AppError::validation(format!("invalid history: {}", e)))?;

    let mut request = ChatRequest::new(form.phone.trim(), form.message).with_history(history);
    if let Some(scheme) = form.scheme.filter(|s| !s.trim().is_empty()) {
        request = request.with_scheme(scheme);
    }

    let outcome = state.agent().chat(request).await;
    Ok(Json(outcome.into()))
}

// ============================================================================
// Voice Routes
// ============================================================================

pub fn voice_routes() -> Router<AppStateArc> {
    Router::new().route("/process-voice", post(process_voice))
}

/// Multipart fields: `file` (required), `phone`, `language`.
async fn process_voice(
    State(state): State<AppStateArc>,
    mut multipart: Multipart,
) -> AppResult<Json<VoiceResponse>> {
    let voice = state
        .voice()
        .cloned()
        .ok_or_else(|| AppError::not_found("voice pipeline is disabled"))?;

    let mut phone = None;
    let mut language = None;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("voice_note.mp3").to_string();
                let content_type = field.content_type().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("failed to read upload: {}", e)))?;
                upload = Some((file_name, content_type, bytes.to_vec()));
            }
            "phone" => phone = Some(read_text(field).await?),
            "language" => language = Some(read_text(field).await?),
            other => warn!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (file_name, content_type, bytes) =
        upload.ok_or_else(|| AppError::validation("file is required"))?;
    if bytes.is_empty() {
        return Err(AppError::validation("file is empty"));
    }

    let phone = phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEMO_PHONE.to_string());

    let outcome = voice
        .process(VoiceRequest {
            phone,
            language,
            file_name,
            content_type,
            bytes,
        })
        .await?;
    Ok(Json(outcome.into()))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("invalid multipart field: {}", e)))
}

// ============================================================================
// Application Routes
// ============================================================================

pub fn application_routes() -> Router<AppStateArc> {
    Router::new().route("/apply", post(apply))
}

#[derive(Debug, Deserialize)]
struct ApplyForm {
    scheme_name: String,
    phone: String,
}

/// Submit directly, using whatever the profile already holds.
async fn apply(
    State(state): State<AppStateArc>,
    Form(form): Form<ApplyForm>,
) -> AppResult<Json<ApplicationReceipt>> {
    let phone = form.phone.trim();
    let fields = match state.profiles().get(phone) {
        Ok(profile) => profile.map(|p| p.fields).unwrap_or_default(),
        Err(e) => {
            warn!(phone = %mask_phone(phone), error = %e, "Profile fetch failed; applying without profile fields");
            Default::default()
        }
    };

    let receipt = state.applications().apply(phone, &form.scheme_name, &fields)?;
    Ok(Json(receipt))
}
