//! Agent Service
//!
//! One chat turn of the eligibility assistant: load the profile, pick the
//! scheme being discussed, build the prompt, ask the provider chain and act
//! on the reply. Conversation history is owned by the caller and passed in
//! with every request.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::services::application::{ApplicationReceipt, ApplicationService};
use crate::storage::ProfileStore;
use crate::utils::mask::mask_phone;
use yojna_setu_core::{
    build_eligibility_prompt_for_scheme, dispatch, incomplete_action_reply, missing_fields,
    normalize, ActionDirective, DispatchedReply, MalformedAction, MalformedReason, MissingFields,
    NextStep, RawTurn, Role, SchemeCatalog, UserProfile, SELECTED_SCHEME_FIELD,
};
use yojna_setu_llm::{LlmRequestOptions, ProviderChain};

/// Note stored on the stand-in profile used when the profile store fails
pub const FALLBACK_PROFILE_NOTE: &str = "Database fallback active";

/// Input for one chat turn
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub phone: String,
    pub message: String,
    /// Earlier turns, oldest first, as the client sent them
    pub history: Vec<RawTurn>,
    /// Scheme the client has explicitly selected
    pub scheme: Option<String>,
}

impl ChatRequest {
    pub fn new(phone: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<RawTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }
}

/// Result of one chat turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    /// Text to show the user, markers removed
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDirective>,
    /// Receipt of the application submitted for `action`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed_action: Option<MalformedAction>,
    /// Canonical name of the scheme the prompt was built for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Provider that produced the reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub next_step: NextStep,
}

impl ChatOutcome {
    fn from_dispatch(
        dispatched: DispatchedReply,
        scheme: Option<String>,
        provider: Option<String>,
    ) -> Self {
        let next_step = dispatched.next_step();
        Self {
            reply: dispatched.visible_text,
            action: dispatched.action,
            application: None,
            malformed_action: dispatched.malformed,
            scheme,
            provider,
            next_step,
        }
    }

    /// Demote a directive sent before the profile was complete to a
    /// malformed marker; nothing is submitted for it.
    fn reject_incomplete(&mut self, action: ActionDirective, missing: Vec<String>) {
        self.reply = incomplete_action_reply(&missing);
        self.malformed_action = Some(MalformedAction {
            raw: action.to_marker(),
            reason: MalformedReason::MissingFields(missing),
        });
        self.action = None;
        self.next_step = NextStep::ReportMalformed;
    }
}

/// Where the working profile for a turn came from
struct LoadedProfile {
    profile: UserProfile,
    /// False when the store failed and a stand-in is used; a stand-in is
    /// never written back
    persistable: bool,
}

/// The chat orchestrator
pub struct AgentService {
    catalog: Arc<SchemeCatalog>,
    chain: ProviderChain,
    profiles: Arc<dyn ProfileStore>,
    applications: ApplicationService,
    request_options: LlmRequestOptions,
}

impl std::fmt::Debug for AgentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentService")
            .field("schemes", &self.catalog.len())
            .field("chain", &self.chain)
            .finish()
    }
}

impl AgentService {
    pub fn new(
        catalog: Arc<SchemeCatalog>,
        chain: ProviderChain,
        profiles: Arc<dyn ProfileStore>,
        applications: ApplicationService,
    ) -> Self {
        Self {
            catalog,
            chain,
            profiles,
            applications,
            request_options: LlmRequestOptions::default(),
        }
    }

    pub fn with_request_options(mut self, options: LlmRequestOptions) -> Self {
        self.request_options = options;
        self
    }

    pub fn catalog(&self) -> &SchemeCatalog {
        &self.catalog
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    pub fn applications(&self) -> &ApplicationService {
        &self.applications
    }

    /// Run one chat turn.
    ///
    /// Never fails: storage errors degrade to a stand-in profile and
    /// provider exhaustion yields the fixed apology reply.
    pub async fn chat(&self, request: ChatRequest) -> ChatOutcome {
        let masked = mask_phone(&request.phone);
        let LoadedProfile {
            mut profile,
            persistable,
        } = self.load_profile(&request.phone);

        let scheme = self.select_scheme(&request, &profile);
        if let Some(name) = scheme.as_deref() {
            if profile.selected_scheme() != Some(name) {
                profile.merge([(SELECTED_SCHEME_FIELD, name)]);
                if persistable {
                    self.save_profile(&profile);
                }
            }
        }
        debug!(phone = %masked, scheme = ?scheme, "Building eligibility prompt");

        let prompt =
            build_eligibility_prompt_for_scheme(&profile, &self.catalog, scheme.as_deref());
        let messages = normalize(&prompt, &request.history, &request.message);

        let (dispatched, provider) =
            match self.chain.send_message(&messages, &self.request_options).await {
                Ok((response, log)) => (dispatch(response.text()), log.successful_provider),
                Err(e) => {
                    warn!(phone = %masked, error = %e, "No chat provider produced a reply");
                    (DispatchedReply::provider_unavailable(), None)
                }
            };

        let mut outcome = ChatOutcome::from_dispatch(dispatched, scheme, provider);

        if let Some(malformed) = &outcome.malformed_action {
            warn!(
                phone = %masked,
                reason = %malformed.reason,
                raw = %malformed.raw,
                "Assistant emitted a malformed action marker"
            );
        }

        if let Some(action) = outcome.action.clone() {
            self.merge_details(&request.phone, &mut profile, persistable, &action);

            match missing_fields(&self.catalog, Some(action.scheme.as_str()), &profile) {
                MissingFields::Scheme { scheme, missing } if !missing.is_empty() => {
                    warn!(
                        phone = %masked,
                        scheme = %scheme,
                        missing = ?missing,
                        "Action marker sent before all required fields were known; not submitting"
                    );
                    outcome.reject_incomplete(action, missing);
                }
                _ => outcome.application = self.submit(&request.phone, &profile, &action),
            }
        }

        outcome
    }

    fn load_profile(&self, phone: &str) -> LoadedProfile {
        match self.profiles.get(phone) {
            Ok(Some(profile)) => LoadedProfile {
                profile,
                persistable: true,
            },
            Ok(None) => LoadedProfile {
                profile: UserProfile::new(phone),
                persistable: true,
            },
            Err(e) => {
                warn!(phone = %mask_phone(phone), error = %e, "Profile fetch failed; using fallback profile");
                LoadedProfile {
                    profile: UserProfile::new(phone)
                        .with_field("user_id", phone)
                        .with_field("note", FALLBACK_PROFILE_NOTE),
                    persistable: false,
                }
            }
        }
    }

    fn save_profile(&self, profile: &UserProfile) {
        if let Err(e) = self.profiles.put(profile) {
            warn!(phone = %mask_phone(&profile.phone), error = %e, "Profile update failed");
        }
    }

    /// Scheme for this turn: explicit selection, then a mention in the
    /// current message, then the newest user turn mentioning one, then the
    /// profile's stored selection.
    fn select_scheme(&self, request: &ChatRequest, profile: &UserProfile) -> Option<String> {
        let explicit = request
            .scheme
            .as_deref()
            .and_then(|name| self.catalog.resolve(name));

        explicit
            .or_else(|| self.catalog.find_mentioned(&request.message))
            .or_else(|| {
                request
                    .history
                    .iter()
                    .rev()
                    .filter(|turn| turn.role == Role::User)
                    .find_map(|turn| self.catalog.find_mentioned(&turn.content.text()))
            })
            .or_else(|| {
                profile
                    .selected_scheme()
                    .and_then(|name| self.catalog.resolve(name))
            })
            .map(|definition| definition.name.clone())
    }

    /// Fold the directive's details into the profile. Kept even when the
    /// directive is rejected, so the next turn does not ask again.
    fn merge_details(
        &self,
        phone: &str,
        profile: &mut UserProfile,
        persistable: bool,
        action: &ActionDirective,
    ) {
        let changed = profile.merge(action.detail_strings());
        if !changed.is_empty() {
            debug!(phone = %mask_phone(phone), fields = ?changed, "Profile updated from action details");
            if persistable {
                self.save_profile(profile);
            }
        }
    }

    fn submit(
        &self,
        phone: &str,
        profile: &UserProfile,
        action: &ActionDirective,
    ) -> Option<ApplicationReceipt> {
        match self.applications.apply(phone, &action.scheme, &profile.fields) {
            Ok(receipt) => {
                info!(
                    phone = %mask_phone(phone),
                    scheme = %receipt.scheme,
                    application_id = %receipt.application_id,
                    duplicate = receipt.duplicate,
                    "Action handled"
                );
                Some(receipt)
            }
            Err(e) => {
                warn!(phone = %mask_phone(phone), scheme = %action.scheme, error = %e, "Application submit failed");
                None
            }
        }
    }
}
