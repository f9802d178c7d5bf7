//! Action Extractor
//!
//! The assistant signals "submit the application" by appending a marker to
//! its reply:
//!
//! ```text
//! [ACTION: OPEN_PORTAL | scheme: PM Kisan | details: {"aadhar": "123"}]
//! ```
//!
//! This module finds that marker, parses it strictly, and strips markers from
//! the text shown to the user. Anything that starts like a marker but deviates
//! from the shape is reported as [`MalformedAction`], never guessed at.

use serde::{Deserialize, Serialize};

use crate::error::{MalformedAction, MalformedReason};

/// Opening of every action marker.
pub const MARKER_PREFIX: &str = "[ACTION:";

/// The only action verb the assistant may emit.
pub const OPEN_PORTAL: &str = "OPEN_PORTAL";

/// Structured "submit application" signal extracted from an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDirective {
    pub scheme: String,
    /// Field identifier -> value, in the order the model wrote them
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ActionDirective {
    /// Details flattened to strings, for merging into a profile.
    /// Strings are taken verbatim; other JSON values use their JSON text.
    pub fn detail_strings(&self) -> Vec<(String, String)> {
        self.details
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }

    /// Render this directive as the marker text the model is asked to emit.
    pub fn to_marker(&self) -> String {
        format!(
            "{} {} | scheme: {} | details: {}]",
            MARKER_PREFIX,
            OPEN_PORTAL,
            self.scheme,
            serde_json::Value::Object(self.details.clone())
        )
    }
}

/// Byte range of one marker inside a reply, with its parse outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    pub start: usize,
    pub end: usize,
    pub parsed: Result<ActionDirective, MalformedAction>,
}

/// Extract the action directive from an assistant reply.
///
/// - `Ok(None)`: no marker; the assistant is still gathering information.
/// - `Ok(Some(_))`: the first marker parsed cleanly. Later duplicates are ignored.
/// - `Err(_)`: the first marker is malformed.
pub fn extract_action(reply: &str) -> Result<Option<ActionDirective>, MalformedAction> {
    match find_markers(reply).into_iter().next() {
        None => Ok(None),
        Some(m) => m.parsed.map(Some),
    }
}

/// Remove every marker from a reply and tidy the whitespace left behind.
/// A reply without markers is returned unchanged.
pub fn strip_markers(reply: &str) -> String {
    let markers = find_markers(reply);
    if markers.is_empty() {
        return reply.to_string();
    }

    let mut visible = String::with_capacity(reply.len());
    let mut cursor = 0;
    for m in &markers {
        visible.push_str(&reply[cursor..m.start]);
        cursor = m.end;
    }
    visible.push_str(&reply[cursor..]);

    let mut cleaned = visible
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    while cleaned.contains("\n\n\n") {
        cleaned = cleaned.replace("\n\n\n", "\n\n");
    }
    cleaned.trim().to_string()
}

/// Locate all markers in order of appearance.
pub fn find_markers(reply: &str) -> Vec<MarkerMatch> {
    let mut matches = Vec::new();
    let mut search_from = 0;

    while let Some(rel) = reply[search_from..].find(MARKER_PREFIX) {
        let start = search_from + rel;
        let body_start = start + MARKER_PREFIX.len();
        let (end, parsed) = parse_marker(reply, start, body_start);
        matches.push(MarkerMatch { start, end, parsed });
        search_from = end.max(body_start);
    }

    matches
}

/// Parse one marker whose `[ACTION:` prefix starts at `start`.
/// Returns the end offset (exclusive) of the marker and the parse outcome.
fn parse_marker(
    reply: &str,
    start: usize,
    body_start: usize,
) -> (usize, Result<ActionDirective, MalformedAction>) {
    let fallback_end = malformed_end(reply, body_start);
    let fail = |reason: MalformedReason| {
        (
            fallback_end,
            Err(MalformedAction {
                raw: reply[start..fallback_end].to_string(),
                reason,
            }),
        )
    };

    // Verb segment
    let body = &reply[body_start..];
    let Some(verb_bar) = body.find('|') else {
        return fail(MalformedReason::MissingSegment("scheme"));
    };
    let verb = body[..verb_bar].trim();
    if verb != OPEN_PORTAL {
        return fail(MalformedReason::UnsupportedAction(verb.to_string()));
    }

    // Scheme segment
    let after_verb = body[verb_bar + 1..].trim_start();
    let Some(scheme_rest) = after_verb.strip_prefix("scheme:") else {
        return fail(MalformedReason::MissingSegment("scheme"));
    };
    let Some(scheme_bar) = scheme_rest.find('|') else {
        return fail(MalformedReason::MissingSegment("details"));
    };
    let scheme = scheme_rest[..scheme_bar].trim();
    if scheme.is_empty() {
        return fail(MalformedReason::EmptyScheme);
    }

    // Details segment: exactly one JSON value, then `]`
    let after_scheme = scheme_rest[scheme_bar + 1..].trim_start();
    let Some(details_text) = after_scheme.strip_prefix("details:") else {
        return fail(MalformedReason::MissingSegment("details"));
    };
    let json_start = reply.len() - details_text.trim_start().len();

    let mut stream =
        serde_json::Deserializer::from_str(&reply[json_start..]).into_iter::<serde_json::Value>();
    let value = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => return fail(MalformedReason::InvalidJson(e.to_string())),
        None => return fail(MalformedReason::InvalidJson("no JSON value".to_string())),
    };
    let json_end = json_start + stream.byte_offset();

    let tail = &reply[json_end..];
    let close = tail.len() - tail.trim_start().len();
    if !tail[close..].starts_with(']') {
        return fail(MalformedReason::Unterminated);
    }
    let end = json_end + close + 1;

    let serde_json::Value::Object(details) = value else {
        return (
            end,
            Err(MalformedAction {
                raw: reply[start..end].to_string(),
                reason: MalformedReason::DetailsNotObject,
            }),
        );
    };

    (
        end,
        Ok(ActionDirective {
            scheme: scheme.to_string(),
            details,
        }),
    )
}

/// Where a malformed marker is taken to end: the last `]` before the next
/// marker or line break, or the end of that line when there is none.
fn malformed_end(reply: &str, body_start: usize) -> usize {
    let rest = &reply[body_start..];
    let limit = [rest.find(MARKER_PREFIX), rest.find('\n')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());
    match rest[..limit].rfind(']') {
        Some(pos) => body_start + pos + 1,
        None => body_start + limit,
    }
}
