//! HTTP Route Integration Tests
//!
//! Requests go through the full axum router (tracing, CORS, body limit)
//! via `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use yojna_setu::models::response::WELCOME_MESSAGE;
use yojna_setu::server::router;
use yojna_setu_core::{UserProfile, ACTION_ONLY_REPLY};

use crate::support::{
    body_json, form_request, multipart_request, test_state, FakeSpeech, ScriptedProvider,
    KISAN_SUBMIT,
};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_welcome() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", Vec::<String>::new()), None);
    let response = router(state).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], WELCOME_MESSAGE);
}

#[tokio::test]
async fn test_health() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", Vec::<String>::new()), None);
    let response = router(state).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["providers"], serde_json::json!(["sarvam"]));
    assert_eq!(json["voice"], false);
}

// ============================================================================
// Register
// ============================================================================

#[tokio::test]
async fn test_register_creates_profile() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", Vec::<String>::new()), None);
    let app = router(state.clone());

    let response = app
        .oneshot(form_request(
            "/register",
            &[
                ("username", "Sunita Devi"),
                ("email", "sunita@example.com"),
                ("phone", "9000000001"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Success");
    assert_eq!(json["message"], "User Sunita Devi registered successfully");

    let profile = state.profiles().get("9000000001").unwrap().unwrap();
    assert_eq!(profile.get("status"), Some("Registered"));
    assert_eq!(profile.get("email"), Some("sunita@example.com"));
}

#[tokio::test]
async fn test_register_keeps_collected_fields() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", Vec::<String>::new()), None);
    state
        .profiles()
        .put(&yojna_setu_core::UserProfile::new("9000000002").with_field("aadhar", "4444"))
        .unwrap();

    let response = router(state.clone())
        .oneshot(form_request(
            "/register",
            &[("username", "Asha"), ("email", "a@example.com"), ("phone", "9000000002")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let profile = state.profiles().get("9000000002").unwrap().unwrap();
    assert_eq!(profile.get("aadhar"), Some("4444"));
    assert_eq!(profile.get("username"), Some("Asha"));
}

#[tokio::test]
async fn test_register_requires_phone() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", Vec::<String>::new()), None);
    let response = router(state)
        .oneshot(form_request(
            "/register",
            &[("username", "Asha"), ("email", "a@example.com"), ("phone", "  ")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("phone"));
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_chat_plain_reply() {
    let provider = ScriptedProvider::new("sarvam", ["Aadhar number batayein."]);
    let (state, _dir) = test_state(provider.clone(), None);

    let response = router(state)
        .oneshot(form_request(
            "/chat",
            &[
                ("message", "PM Kisan chahiye"),
                ("phone", "9000000003"),
                (
                    "history",
                    r#"[{"role":"assistant","content":"Namaste!"},{"role":"user","content":"Namaste"},{"role":"assistant","content":"Boliye"}]"#,
                ),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["reply"], "Aadhar number batayein.");
    assert_eq!(json["scheme"], "PM Kisan");
    assert!(json.get("action").is_none());
    assert!(json.get("application").is_none());

    // Leading greeting dropped: system, user, assistant, current message
    assert_eq!(provider.requests()[0].len(), 4);
}

#[tokio::test]
async fn test_chat_history_defaults_to_empty() {
    let provider = ScriptedProvider::new("sarvam", ["Namaste!"]);
    let (state, _dir) = test_state(provider.clone(), None);

    let response = router(state)
        .oneshot(form_request("/chat", &[("message", "hi"), ("phone", "1")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(provider.requests()[0].len(), 2);
}

#[tokio::test]
async fn test_chat_rejects_invalid_history() {
    let provider = ScriptedProvider::new("sarvam", ["never"]);
    let (state, _dir) = test_state(provider.clone(), None);

    let response = router(state)
        .oneshot(form_request(
            "/chat",
            &[("message", "hi"), ("phone", "1"), ("history", "not json")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("invalid history"));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_chat_action_submits_application() {
    let provider = ScriptedProvider::new("sarvam", [KISAN_SUBMIT]);
    let (state, _dir) = test_state(provider, None);

    let response = router(state.clone())
        .oneshot(form_request(
            "/chat",
            &[("message", "sab de diya"), ("phone", "9000000004"), ("scheme", "PM Kisan")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["reply"], "Dhanyavaad! Main aapka aavedan bhej raha hoon.");
    assert_eq!(json["action"]["scheme"], "PM Kisan");
    assert_eq!(json["action"]["details"]["farmer_id"], "WB-FARM-77");
    assert_eq!(json["application"]["status"], "Success");
    assert_eq!(json["application"]["duplicate"], false);
    assert!(json["application"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Aapka PM Kisan ke liye aavedan"));

    assert_eq!(state.applications().list("9000000004").unwrap().len(), 1);
}

#[tokio::test]
async fn test_chat_marker_only_reply_gets_confirmation() {
    let marker = r#"[ACTION: OPEN_PORTAL | scheme: Ladli Behna | details: {"aadhar": "1", "samagra_id": "2", "bank_account": "3"}]"#;
    let provider = ScriptedProvider::new("sarvam", [marker]);
    let (state, _dir) = test_state(provider, None);

    let response = router(state)
        .oneshot(form_request("/chat", &[("message", "haan"), ("phone", "5")]))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["reply"], ACTION_ONLY_REPLY);
    assert_eq!(json["application"]["scheme"], "Ladli Behna");
}

#[tokio::test]
async fn test_chat_reports_malformed_marker() {
    let provider = ScriptedProvider::new(
        "sarvam",
        ["Theek hai. [ACTION: SUBMIT_FORM | scheme: PM Kisan | details: {}]"],
    );
    let (state, _dir) = test_state(provider, None);

    let response = router(state)
        .oneshot(form_request("/chat", &[("message", "haan"), ("phone", "6")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["reply"], "Theek hai.");
    assert!(json.get("action").is_none());
    assert!(json["malformed_action"]["raw"]
        .as_str()
        .unwrap()
        .contains("SUBMIT_FORM"));
}

// ============================================================================
// Apply
// ============================================================================

#[tokio::test]
async fn test_apply_known_scheme() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", Vec::<String>::new()), None);
    state
        .profiles()
        .put(
            &UserProfile::new("9000000005")
                .with_field("aadhar", "1234")
                .with_field("ration_card", "RC-1")
                .with_field("family_count", "4"),
        )
        .unwrap();

    let response = router(state.clone())
        .oneshot(form_request(
            "/apply",
            &[("scheme_name", "swasthya sathi"), ("phone", "9000000005")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let id = json["application_id"].as_str().unwrap().to_string();
    assert_eq!(json["scheme"], "Swasthya Sathi");
    assert_eq!(
        json["message"],
        format!(
            "Aapka Swasthya Sathi ke liye aavedan (application) submit ho gaya hai. Reference ID: {}",
            id
        )
    );

    // A second apply returns the same reference
    let response = router(state)
        .oneshot(form_request(
            "/apply",
            &[("scheme_name", "Swasthya Sathi"), ("phone", "9000000005")],
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["application_id"], id.as_str());
    assert_eq!(json["duplicate"], true);
}

#[tokio::test]
async fn test_apply_with_incomplete_profile_is_rejected() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", Vec::<String>::new()), None);
    state
        .profiles()
        .put(&UserProfile::new("9000000006").with_field("aadhar", "1234"))
        .unwrap();

    let response = router(state.clone())
        .oneshot(form_request(
            "/apply",
            &[("scheme_name", "Swasthya Sathi"), ("phone", "9000000006")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("ration_card, family_count"));
    assert!(state.applications().list("9000000006").unwrap().is_empty());

    // Unregistered phones have nothing to submit either
    let response = router(state)
        .oneshot(form_request(
            "/apply",
            &[("scheme_name", "Swasthya Sathi"), ("phone", "9000000007")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_apply_unknown_scheme_is_404() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", Vec::<String>::new()), None);

    let response = router(state)
        .oneshot(form_request(
            "/apply",
            &[("scheme_name", "PM Rocket"), ("phone", "1")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("PM Rocket"));
}

// ============================================================================
// Voice
// ============================================================================

#[tokio::test]
async fn test_process_voice() {
    let provider = ScriptedProvider::new("sarvam", ["Kaunsi yojana chahiye?"]);
    let speech = FakeSpeech::new(Some("namaste"), Some(&b"RIFF"[..]));
    let (state, dir) = test_state(provider, Some(speech.clone()));

    let response = router(state)
        .oneshot(multipart_request(
            "/process-voice",
            &[
                ("file", Some("note.mp3"), &b"ID3\x03"[..]),
                ("phone", None, &b"9000000006"[..]),
                ("language", None, &b"bn-IN"[..]),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["transcript"], "namaste");
    assert_eq!(json["reply"], "Kaunsi yojana chahiye?");
    assert_eq!(json["has_audio"], true);
    assert_eq!(json["audio_base64"], "UklGRg==");
    assert_eq!(*speech.languages.lock().unwrap(), vec!["bn-IN".to_string()]);

    // The voice note was stored under the caller's phone
    let stored = std::fs::read_dir(dir.path().join("blobs/voice/9000000006"))
        .unwrap()
        .count();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn test_process_voice_defaults() {
    let provider = ScriptedProvider::new("sarvam", ["Namaste"]);
    let speech = FakeSpeech::new(Some("hello"), None);
    let (state, dir) = test_state(provider, Some(speech.clone()));

    let response = router(state)
        .oneshot(multipart_request(
            "/process-voice",
            &[("file", Some("note.mp3"), &b"ID3"[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["has_audio"], false);
    assert!(json.get("audio_base64").is_none());
    assert_eq!(*speech.languages.lock().unwrap(), vec!["hi-IN".to_string()]);
    assert!(dir.path().join("blobs/voice/9876543210").is_dir());
}

#[tokio::test]
async fn test_process_voice_transcription_failure() {
    let provider = ScriptedProvider::new("sarvam", ["never"]);
    let speech = FakeSpeech::new(None, None);
    let (state, _dir) = test_state(provider.clone(), Some(speech));

    let response = router(state)
        .oneshot(multipart_request(
            "/process-voice",
            &[("file", Some("note.mp3"), &b"ID3"[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Internal error: Transcription failed"
    );
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_process_voice_requires_file() {
    let speech = FakeSpeech::new(Some("x"), None);
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", ["never"]), Some(speech));

    let response = router(state)
        .oneshot(multipart_request(
            "/process-voice",
            &[("phone", None, &b"9000000007"[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_process_voice_disabled_is_404() {
    let (state, _dir) = test_state(ScriptedProvider::new("sarvam", ["never"]), None);

    let response = router(state)
        .oneshot(multipart_request(
            "/process-voice",
            &[("file", Some("note.mp3"), &b"ID3"[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
