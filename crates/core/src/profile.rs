//! User Profile and Profile Merger
//!
//! A profile is the set of known field values for one user, keyed by phone
//! number. The merger decides which catalog fields are still missing for the
//! selected scheme, and folds newly-learned values into a stored profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::SchemeCatalog;

/// Profile key under which the last selected scheme is remembered.
pub const SELECTED_SCHEME_FIELD: &str = "selected_scheme";

/// Known field values for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Phone number; the storage key
    pub phone: String,
    /// Field identifier -> value. Empty strings mean "not yet collected".
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl UserProfile {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Profile created by the registration form. Identity documents start
    /// empty and are collected by the assistant later.
    pub fn registered(
        phone: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let phone = phone.into();
        let mut profile = Self::new(phone.clone());
        profile
            .fields
            .insert("user_id".to_string(), phone.clone());
        profile.fields.insert("username".to_string(), username.into());
        profile.fields.insert("email".to_string(), email.into());
        profile.fields.insert("phone".to_string(), phone);
        profile.fields.insert("aadhar".to_string(), String::new());
        profile.fields.insert("district".to_string(), String::new());
        profile
            .fields
            .insert("status".to_string(), "Registered".to_string());
        profile
    }

    /// Builder-style setter, mostly for tests and fixtures.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Non-empty value for a field. Whitespace-only values count as absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn selected_scheme(&self) -> Option<&str> {
        self.get(SELECTED_SCHEME_FIELD)
    }

    /// Fold newly-known values into this profile.
    ///
    /// Non-empty values overwrite; empty values never erase what is already
    /// known. Returns the keys whose value changed, in key order.
    pub fn merge<I, K, V>(&mut self, updates: I) -> Vec<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut changed = Vec::new();
        for (key, value) in updates {
            let key = key.into();
            let value = value.into();
            if value.trim().is_empty() {
                self.fields.entry(key).or_default();
                continue;
            }
            if self.fields.get(&key) != Some(&value) {
                self.fields.insert(key.clone(), value);
                changed.push(key);
            }
        }
        changed.sort();
        changed.dedup();
        changed
    }

    /// The profile as a JSON object, for embedding in prompts.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// What the assistant should ask for next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MissingFields {
    /// No scheme chosen yet (or the chosen name is not in the catalog);
    /// carries the scheme menu in catalog order.
    NoSchemeSelected { menu: Vec<String> },
    /// A scheme is selected; `missing` is empty once the application can go out.
    Scheme { scheme: String, missing: Vec<String> },
}

impl MissingFields {
    pub fn is_complete(&self) -> bool {
        matches!(self, MissingFields::Scheme { missing, .. } if missing.is_empty())
    }
}

/// Catalog fields for `scheme` that the profile has no value for, in catalog
/// order. Unknown or absent scheme names yield the menu instead.
pub fn missing_fields(
    catalog: &SchemeCatalog,
    scheme: Option<&str>,
    profile: &UserProfile,
) -> MissingFields {
    let Some(definition) = scheme.and_then(|name| catalog.resolve(name)) else {
        return MissingFields::NoSchemeSelected {
            menu: catalog.scheme_names().into_iter().map(String::from).collect(),
        };
    };

    let missing = definition
        .required_fields
        .iter()
        .filter(|field| !profile.has(field))
        .cloned()
        .collect();

    MissingFields::Scheme {
        scheme: definition.name.clone(),
        missing,
    }
}
