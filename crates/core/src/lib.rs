//! Yojna Setu Core
//!
//! The eligibility protocol behind the Yojna Setu caseworker assistant:
//! which scheme needs which fields, what to ask the user next, and how the
//! assistant's "submit application" marker is found in its replies.
//!
//! Everything here is synchronous and free of I/O. Chat providers, storage
//! and the HTTP surface live in the `yojna-setu-llm` and `yojna-setu` crates.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `MalformedAction`)
//! - `catalog` - Scheme catalog (`SchemeCatalog`, `SchemeDefinition`)
//! - `profile` - User profile and missing-field computation
//! - `conversation` - History normalization and the caller-owned `Conversation`
//! - `prompt` - Eligibility system prompt builder
//! - `action` - Action marker extraction and stripping
//! - `dispatch` - Visible text + action split for the caller

pub mod action;
pub mod catalog;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod profile;
pub mod prompt;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult, MalformedAction, MalformedReason};

// ── Catalog & Profile ──────────────────────────────────────────────────
pub use catalog::{SchemeCatalog, SchemeDefinition};
pub use profile::{missing_fields, MissingFields, UserProfile, SELECTED_SCHEME_FIELD};

// ── Conversation ───────────────────────────────────────────────────────
pub use conversation::{
    normalize, parse_history, Conversation, ConversationTurn, RawContent, RawTurn, Role,
};

// ── Prompt, Action & Dispatch ──────────────────────────────────────────
pub use action::{extract_action, find_markers, strip_markers, ActionDirective};
pub use dispatch::{
    dispatch, dispatch_extracted, incomplete_action_reply, DispatchedReply, NextStep,
    ACTION_ONLY_REPLY, PROVIDER_UNAVAILABLE_REPLY,
};
pub use prompt::{build_eligibility_prompt, build_eligibility_prompt_for_scheme};
