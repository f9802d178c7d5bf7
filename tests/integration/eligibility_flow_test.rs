//! Eligibility Flow Integration Tests
//!
//! Multi-turn conversations through the agent service against SQLite
//! storage: scheme selection, field collection, submission and fallback.

use std::sync::Arc;

use yojna_setu::models::settings::AppConfig;
use yojna_setu::services::ChatRequest;
use yojna_setu::state::AppState;
use yojna_setu::storage::Database;
use yojna_setu_core::{
    Conversation, MalformedReason, NextStep, Role, SchemeCatalog, UserProfile,
    PROVIDER_UNAVAILABLE_REPLY,
};
use yojna_setu_llm::{LlmProvider, ProviderChain};

use crate::support::{test_state, ScriptedProvider, KISAN_SUBMIT};

// ============================================================================
// Full conversation
// ============================================================================

#[tokio::test]
async fn test_registration_to_submission() {
    let provider = ScriptedProvider::new(
        "sarvam",
        [
            "Namaste Ravi ji! Aap in yojanaon mein se kaunsi chahte hain: PM Awas Yojana, PM Kisan, Ladli Behna, Swasthya Sathi, Old Age Pension?",
            "PM Kisan ke liye mujhe aapka Aadhar, Farmer ID aur bank account chahiye.",
            KISAN_SUBMIT,
        ],
    );
    let (state, _dir) = test_state(provider.clone(), None);
    let phone = "9123456780";

    state
        .profiles()
        .put(&UserProfile::registered(phone, "Ravi", "ravi@example.com"))
        .unwrap();

    let mut conversation = Conversation::new();
    let messages = [
        "Namaste",
        "Mujhe PM Kisan chahiye",
        "Aadhar 1234-5678-9012, farmer id WB-FARM-77, account SBIN000123",
    ];

    let mut outcomes = Vec::new();
    for message in messages {
        let outcome = state
            .agent()
            .chat(ChatRequest::new(phone, message).with_history(conversation.to_raw()))
            .await;
        conversation.record_exchange(message, outcome.reply.clone());
        outcomes.push(outcome);
    }

    // First turn: no scheme yet, the prompt carries the menu
    assert!(outcomes[0].scheme.is_none());
    let first_prompt = &provider.requests()[0][0].content;
    assert!(first_prompt.contains("Old Age Pension"));

    // Second turn picks the scheme up from the message
    assert_eq!(outcomes[1].scheme.as_deref(), Some("PM Kisan"));
    assert_eq!(outcomes[1].next_step, NextStep::Continue);

    // Third turn: the scheme comes from the stored selection and history
    let third = &outcomes[2];
    assert_eq!(third.scheme.as_deref(), Some("PM Kisan"));
    assert_eq!(third.next_step, NextStep::Apply);
    assert_eq!(third.reply, "Dhanyavaad! Main aapka aavedan bhej raha hoon.");
    let receipt = third.application.as_ref().unwrap();
    assert!(receipt.application_id.starts_with("APP-"));
    assert!(!receipt.duplicate);

    // Third request carried the system prompt, four history turns and the message
    let third_request = &provider.requests()[2];
    assert_eq!(third_request.len(), 6);
    assert_eq!(third_request[0].role, Role::System);
    assert_eq!(third_request[5].content, messages[2]);

    // Details merged into the stored profile; registration fields kept
    let stored = state.profiles().get(phone).unwrap().unwrap();
    assert_eq!(stored.get("farmer_id"), Some("WB-FARM-77"));
    assert_eq!(stored.get("username"), Some("Ravi"));
    assert_eq!(stored.selected_scheme(), Some("PM Kisan"));

    let submitted = state.applications().list(phone).unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].application_id, receipt.application_id);
}

#[tokio::test]
async fn test_known_fields_reach_the_prompt_as_complete() {
    let provider = ScriptedProvider::new("sarvam", [KISAN_SUBMIT]);
    let (state, _dir) = test_state(provider.clone(), None);

    state
        .profiles()
        .put(
            &UserProfile::new("1")
                .with_field("aadhar", "1234")
                .with_field("farmer_id", "F1")
                .with_field("bank_account", "B1"),
        )
        .unwrap();

    state
        .agent()
        .chat(ChatRequest::new("1", "PM Kisan").with_scheme("PM Kisan"))
        .await;

    // Nothing missing: the prompt hands the model the exact marker to emit
    let prompt = &provider.requests()[0][0].content;
    assert!(prompt.contains("[ACTION: OPEN_PORTAL | scheme: PM Kisan"));
    assert!(prompt.contains(r#""farmer_id":"F1""#));
}

#[tokio::test]
async fn test_leading_assistant_greeting_is_dropped() {
    let provider = ScriptedProvider::new("sarvam", ["Ji?"]);
    let (state, _dir) = test_state(provider.clone(), None);

    let history = yojna_setu_core::parse_history(
        r#"[{"role": "assistant", "content": "Namaste! Main Yojna Setu hoon."},
            {"role": "user", "content": [{"text": "Namaste"}]},
            {"role": "assistant", "content": "Boliye"}]"#,
    )
    .unwrap();

    state
        .agent()
        .chat(ChatRequest::new("1", "Yojana batao").with_history(history))
        .await;

    let request = &provider.requests()[0];
    let roles: Vec<Role> = request.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(request[1].content, "Namaste");
}

// ============================================================================
// Submission side effect
// ============================================================================

#[tokio::test]
async fn test_repeated_marker_does_not_submit_twice() {
    let provider = ScriptedProvider::new("sarvam", [KISAN_SUBMIT, KISAN_SUBMIT]);
    let (state, _dir) = test_state(provider, None);

    let first = state.agent().chat(ChatRequest::new("7", "PM Kisan")).await;
    let second = state.agent().chat(ChatRequest::new("7", "haan")).await;

    let first = first.application.unwrap();
    let second = second.application.unwrap();
    assert!(second.duplicate);
    assert_eq!(first.application_id, second.application_id);
    assert_eq!(state.applications().list("7").unwrap().len(), 1);
}

#[tokio::test]
async fn test_premature_marker_does_not_block_real_application() {
    let partial = r#"Ho gaya! [ACTION: OPEN_PORTAL | scheme: PM Kisan | details: {"aadhar": "1234-5678-9012"}]"#;
    let provider = ScriptedProvider::new("sarvam", [partial, KISAN_SUBMIT]);
    let (state, _dir) = test_state(provider, None);

    let first = state.agent().chat(ChatRequest::new("9", "PM Kisan")).await;
    assert!(first.application.is_none());
    assert_eq!(first.next_step, NextStep::ReportMalformed);
    assert!(matches!(
        first.malformed_action.as_ref().map(|m| &m.reason),
        Some(MalformedReason::MissingFields(missing)) if missing == &["farmer_id", "bank_account"]
    ));
    assert!(first.reply.contains("farmer_id"));
    assert!(state.applications().list("9").unwrap().is_empty());

    let second = state.agent().chat(ChatRequest::new("9", "sab de diya")).await;
    let receipt = second.application.unwrap();
    assert!(!receipt.duplicate);
    assert_eq!(state.applications().list("9").unwrap().len(), 1);
}

#[tokio::test]
async fn test_marker_for_unknown_scheme_is_not_submitted() {
    let provider = ScriptedProvider::new(
        "sarvam",
        [r#"Ho gaya. [ACTION: OPEN_PORTAL | scheme: PM Rocket | details: {"aadhar": "1"}]"#],
    );
    let (state, _dir) = test_state(provider, None);

    let outcome = state.agent().chat(ChatRequest::new("8", "Namaste")).await;
    assert_eq!(outcome.reply, "Ho gaya.");
    assert!(outcome.action.is_some());
    assert!(outcome.application.is_none());
    assert!(state.applications().list("8").unwrap().is_empty());
}

// ============================================================================
// Provider fallback
// ============================================================================

#[tokio::test]
async fn test_fallback_provider_answers_when_primary_is_down() {
    let primary = ScriptedProvider::down("sarvam");
    let fallback = ScriptedProvider::new("openai", ["Namaste! Main madad karunga."]);
    let providers: Vec<Arc<dyn LlmProvider>> = vec![primary.clone(), fallback.clone()];

    let state = AppState::with_services(
        AppConfig::default(),
        Database::new_in_memory().unwrap(),
        SchemeCatalog::builtin(),
        ProviderChain::from_providers(providers),
        None,
    );

    let outcome = state.agent().chat(ChatRequest::new("1", "Namaste")).await;
    assert_eq!(outcome.reply, "Namaste! Main madad karunga.");
    assert_eq!(outcome.provider.as_deref(), Some("openai"));
    assert_eq!(primary.request_count(), 1);
    assert_eq!(fallback.request_count(), 1);

    // Both sent the same normalized conversation
    assert_eq!(primary.requests()[0], fallback.requests()[0]);
}

#[tokio::test]
async fn test_blank_reply_falls_back_to_next_provider() {
    let primary = ScriptedProvider::new("sarvam", [""]);
    let fallback = ScriptedProvider::new("openai", ["Kaunsi yojana chahiye?"]);
    let providers: Vec<Arc<dyn LlmProvider>> = vec![primary.clone(), fallback];

    let state = AppState::with_services(
        AppConfig::default(),
        Database::new_in_memory().unwrap(),
        SchemeCatalog::builtin(),
        ProviderChain::from_providers(providers),
        None,
    );

    let outcome = state.agent().chat(ChatRequest::new("1", "Namaste")).await;
    assert_eq!(outcome.reply, "Kaunsi yojana chahiye?");
    assert_eq!(outcome.provider.as_deref(), Some("openai"));
    assert_eq!(primary.request_count(), 1);

    // A blank reply from the only provider is the apology, never an empty message
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", ["   "]), None);
    let outcome = state.agent().chat(ChatRequest::new("1", "Namaste")).await;
    assert_eq!(outcome.reply, PROVIDER_UNAVAILABLE_REPLY);
    assert_eq!(outcome.next_step, NextStep::ProviderUnavailable);
}

#[tokio::test]
async fn test_all_providers_down_yields_apology() {
    let providers: Vec<Arc<dyn LlmProvider>> =
        vec![ScriptedProvider::down("sarvam"), ScriptedProvider::down("openai")];
    let state = AppState::with_services(
        AppConfig::default(),
        Database::new_in_memory().unwrap(),
        SchemeCatalog::builtin(),
        ProviderChain::from_providers(providers),
        None,
    );

    let outcome = state.agent().chat(ChatRequest::new("1", "Namaste")).await;
    assert_eq!(outcome.reply, PROVIDER_UNAVAILABLE_REPLY);
    assert_eq!(outcome.next_step, NextStep::ProviderUnavailable);
    assert!(outcome.action.is_none());
}
