//! Eligibility Prompt Builder
//!
//! Builds the system instruction for the caseworker assistant. The output is a
//! pure function of profile, catalog and selected scheme: same inputs, same bytes.

use crate::action::{ActionDirective, MARKER_PREFIX, OPEN_PORTAL};
use crate::catalog::SchemeCatalog;
use crate::profile::{missing_fields, MissingFields, UserProfile};

/// Heading that introduces the per-turn status block.
pub const STATUS_HEADING: &str = "## Current Status";

const IDENTITY: &str = "You are 'Yojna Setu', a high-intent AI caseworker for rural India.\n\
Your goal is to get the user applied for a specific government scheme.";

/// Build the prompt when no scheme has been chosen yet.
pub fn build_eligibility_prompt(profile: &UserProfile, catalog: &SchemeCatalog) -> String {
    build_eligibility_prompt_for_scheme(profile, catalog, None)
}

/// Build the prompt for the given (possibly unselected) scheme.
///
/// An unknown scheme name is treated like no selection: the status block
/// asks the user to pick from the menu.
pub fn build_eligibility_prompt_for_scheme(
    profile: &UserProfile,
    catalog: &SchemeCatalog,
    scheme: Option<&str>,
) -> String {
    let status = missing_fields(catalog, scheme, profile);
    let mut parts = Vec::with_capacity(5);

    parts.push(IDENTITY.to_string());

    parts.push(format!(
        "\n## Current User Profile\n{}",
        pretty_json(&profile.to_json())
    ));

    parts.push(format!(
        "\n## Scheme Knowledge Base\n{}",
        pretty_json(&catalog.to_json())
    ));

    parts.push(format!("\n## Operating Rules\n{}", operating_rules(catalog)));

    parts.push(format!(
        "\n{}\n{}",
        STATUS_HEADING,
        status_instructions(&status, profile, catalog)
    ));

    parts.join("\n")
}

fn operating_rules(catalog: &SchemeCatalog) -> String {
    format!(
        "1. Language: Reply in Hinglish (Hindi + English), in simple words a rural user understands.\n\
2. Selection: If the user has not chosen a scheme, list all {count} schemes from the knowledge base and ask which one they want.\n\
3. Proactiveness: Once a scheme is chosen, cross-reference the profile with the knowledge base and ask ONLY for the missing fields of that scheme. Never ask again for a field the profile already has.\n\
4. Action Trigger: Only when every required field of the chosen scheme is known, first give a short polite confirmation sentence, then append exactly one marker at the very end of the reply in this form: \
{prefix} {verb} | scheme: <scheme_name> | details: <json object of all required fields>]\n\
   Never put the marker mid-sentence, never repeat it, never emit it while any field is missing.\n\
5. Tone: Polite, caseworker-like and efficient.",
        count = catalog.len(),
        prefix = MARKER_PREFIX,
        verb = OPEN_PORTAL,
    )
}

fn status_instructions(
    status: &MissingFields,
    profile: &UserProfile,
    catalog: &SchemeCatalog,
) -> String {
    match status {
        MissingFields::NoSchemeSelected { menu } => {
            let list = menu
                .iter()
                .map(|name| format!("- {}", name))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "No scheme has been selected yet. Show the user these schemes and ask which one they want:\n{}\n\
Do NOT emit an action marker in this reply.",
                list
            )
        }
        MissingFields::Scheme { scheme, missing } if !missing.is_empty() => format!(
            "Selected scheme: {}\nStill missing: {}\n\
Ask the user for exactly these fields and nothing else.\n\
Do NOT emit an action marker in this reply.",
            scheme,
            missing.join(", ")
        ),
        MissingFields::Scheme { scheme, .. } => {
            let directive = completed_directive(scheme, profile, catalog);
            format!(
                "Selected scheme: {}\nAll required fields are present.\n\
First confirm politely (for example: \"Theek hai ji, mujhe sab mil gaya hai. Main ab application bhar raha hoon...\"), \
then end the reply with exactly this marker, once:\n{}",
                scheme,
                directive.to_marker()
            )
        }
    }
}

/// The directive for a fully-satisfied scheme, details in catalog order.
fn completed_directive(
    scheme: &str,
    profile: &UserProfile,
    catalog: &SchemeCatalog,
) -> ActionDirective {
    let details = catalog
        .required_fields(scheme)
        .map(|fields| {
            fields
                .iter()
                .map(|field| {
                    let value = profile.get(field).unwrap_or_default();
                    (field.clone(), serde_json::Value::String(value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    ActionDirective {
        scheme: scheme.to_string(),
        details,
    }
}

fn pretty_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
