//! Yojna Setu - Service Library
//!
//! Backend of the Yojna Setu caseworker assistant. It includes:
//! - axum HTTP routes (`/chat`, `/process-voice`, `/register`, `/apply`)
//! - Agent, voice and application services
//! - Storage layer (SQLite profiles and applications, voice-note blobs, TOML config)
//! - Configuration models and utilities
//!
//! The eligibility protocol itself lives in `yojna-setu-core`; chat and
//! speech providers in `yojna-setu-llm`.

pub mod cli;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::response::*;
pub use models::settings::AppConfig;
pub use services::{AgentService, ApplicationService, ChatOutcome, ChatRequest, VoiceService};
pub use state::{AppState, VoiceBackend};
pub use utils::error::{AppError, AppResult};
