//! Conversation Normalizer
//!
//! Turns the history a client sends (plain strings, or the richer
//! `[{"text": ..}]` part lists) into the uniform role/content sequence a
//! chat-completion API accepts.

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized turn: one role, one string of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Turn content as clients send it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    /// Part list; only the first part's `text` is used
    Parts(Vec<serde_json::Value>),
    /// Anything else (null, numbers, objects) reads as empty text
    Other(serde_json::Value),
}

impl Default for RawContent {
    fn default() -> Self {
        RawContent::Text(String::new())
    }
}

impl RawContent {
    /// Effective text of this content; empty when nothing usable is present.
    pub fn text(&self) -> String {
        match self {
            RawContent::Text(text) => text.clone(),
            RawContent::Parts(parts) => parts
                .first()
                .and_then(|part| part.get("text"))
                .and_then(|text| text.as_str())
                .unwrap_or_default()
                .to_string(),
            RawContent::Other(_) => String::new(),
        }
    }
}

/// A history entry exactly as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTurn {
    pub role: Role,
    #[serde(default)]
    pub content: RawContent,
}

impl RawTurn {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: RawContent::Text(content.into()),
        }
    }
}

impl From<ConversationTurn> for RawTurn {
    fn from(turn: ConversationTurn) -> Self {
        RawTurn::text(turn.role, turn.content)
    }
}

/// Parse a client-supplied history JSON array.
pub fn parse_history(json: &str) -> serde_json::Result<Vec<RawTurn>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

/// Build the message sequence for one chat-completion call.
///
/// The result starts with the system instruction, drops every assistant turn
/// that precedes the first non-assistant turn (clients seed a greeting the
/// chat API refuses as the opening message), keeps the rest unchanged and
/// ends with the current user message.
pub fn normalize(
    system_prompt: &str,
    history: &[RawTurn],
    current_message: &str,
) -> Vec<ConversationTurn> {
    let mut turns = Vec::with_capacity(history.len() + 2);
    turns.push(ConversationTurn::system(system_prompt));

    let mut seen_opening = false;
    for turn in history {
        if !seen_opening && turn.role == Role::Assistant {
            continue;
        }
        seen_opening = true;
        turns.push(ConversationTurn::new(turn.role, turn.content.text()));
    }

    turns.push(ConversationTurn::user(current_message));
    turns
}

/// Conversation state owned by the caller and passed into each call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a client history, flattening part lists.
    pub fn from_raw(history: &[RawTurn]) -> Self {
        Self {
            turns: history
                .iter()
                .map(|t| ConversationTurn::new(t.role, t.content.text()))
                .collect(),
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Append one user message and the visible assistant reply to it.
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(ConversationTurn::user(user));
        self.turns.push(ConversationTurn::assistant(assistant));
    }

    /// Most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }

    /// History in the raw form accepted by [`normalize`].
    pub fn to_raw(&self) -> Vec<RawTurn> {
        self.turns.iter().cloned().map(RawTurn::from).collect()
    }
}
