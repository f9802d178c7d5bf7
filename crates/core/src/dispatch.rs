//! Reply Dispatcher
//!
//! Turns a raw assistant reply into what the caller acts on: the text to show
//! and, when present, the application the assistant asked to submit. The
//! dispatcher only signals intent; submitting is the caller's job.

use serde::Serialize;

use crate::action::{extract_action, strip_markers, ActionDirective};
use crate::error::MalformedAction;

/// Shown when the chat provider could not be reached.
pub const PROVIDER_UNAVAILABLE_REPLY: &str = "Maaf kijiye, hamare AI system mein thodi takleef ho rahi hai. Kripya thodi der baad koshish karein.";

/// Shown when the assistant emitted only the marker and no sentence around it.
pub const ACTION_ONLY_REPLY: &str = "Theek hai! Mujhe saari jankari mil gayi hai. Main ab portal par aapka application bhar raha hoon. Kripya screen par dekhiye...";

/// Reply for a submission attempt made before `missing` fields were known.
pub fn incomplete_action_reply(missing: &[String]) -> String {
    format!(
        "Application bharne se pehle mujhe yeh jankari chahiye: {}. Kripya bata dijiye.",
        missing.join(", ")
    )
}

/// What the surrounding service should do after this reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    /// Keep collecting information
    Continue,
    /// Submit the application described by the directive
    Apply,
    /// The assistant tried to submit but the marker was broken
    ReportMalformed,
    /// The provider failed; the reply is the fixed apology
    ProviderUnavailable,
}

/// Result of dispatching one assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchedReply {
    /// Reply text with every action marker removed
    pub visible_text: String,
    pub action: Option<ActionDirective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed: Option<MalformedAction>,
}

impl DispatchedReply {
    /// The reply used when no provider produced an answer.
    pub fn provider_unavailable() -> Self {
        Self {
            visible_text: PROVIDER_UNAVAILABLE_REPLY.to_string(),
            action: None,
            malformed: None,
        }
    }

    pub fn next_step(&self) -> NextStep {
        if self.action.is_some() {
            NextStep::Apply
        } else if self.malformed.is_some() {
            NextStep::ReportMalformed
        } else if self.visible_text == PROVIDER_UNAVAILABLE_REPLY {
            NextStep::ProviderUnavailable
        } else {
            NextStep::Continue
        }
    }
}

/// Split a raw reply into visible text and its action directive.
pub fn dispatch(raw_reply: &str) -> DispatchedReply {
    dispatch_extracted(raw_reply, extract_action(raw_reply))
}

/// Same as [`dispatch`] for a reply whose marker was already extracted.
pub fn dispatch_extracted(
    raw_reply: &str,
    extracted: Result<Option<ActionDirective>, MalformedAction>,
) -> DispatchedReply {
    let mut visible_text = strip_markers(raw_reply);
    let (action, malformed) = match extracted {
        Ok(action) => (action, None),
        Err(malformed) => (None, Some(malformed)),
    };

    if action.is_some() && visible_text.is_empty() {
        visible_text = ACTION_ONLY_REPLY.to_string();
    }

    DispatchedReply {
        visible_text,
        action,
        malformed,
    }
}
