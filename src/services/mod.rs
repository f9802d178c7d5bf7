//! Services
//!
//! Business logic behind the HTTP routes and the terminal chat.

pub mod agent;
pub mod application;
pub mod voice;

pub use agent::{AgentService, ChatOutcome, ChatRequest, FALLBACK_PROFILE_NOTE};
pub use application::{ApplicationReceipt, ApplicationService};
pub use voice::{VoiceOutcome, VoiceRequest, VoiceService};
