//! Scheme Catalog
//!
//! Static mapping from welfare scheme name to the ordered list of profile
//! fields an application for that scheme needs. Loaded once at startup and
//! shared read-only.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One scheme and the fields required to apply for it, in asking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeDefinition {
    pub name: String,
    pub required_fields: Vec<String>,
}

impl SchemeDefinition {
    pub fn new(name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            required_fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// On-disk catalog layout:
///
/// ```toml
/// [[scheme]]
/// name = "PM Kisan"
/// required_fields = ["aadhar", "farmer_id", "bank_account"]
/// ```
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "scheme", default)]
    schemes: Vec<SchemeDefinition>,
}

/// Immutable, ordered scheme catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeCatalog {
    schemes: Vec<SchemeDefinition>,
}

impl SchemeCatalog {
    /// Build a catalog, enforcing its invariants:
    /// at least one scheme, unique non-empty names, and a non-empty list of
    /// unique field identifiers per scheme.
    pub fn new(schemes: Vec<SchemeDefinition>) -> CoreResult<Self> {
        if schemes.is_empty() {
            return Err(CoreError::invalid_catalog("catalog has no schemes"));
        }

        let mut names = HashSet::new();
        for scheme in &schemes {
            let key = normalize_name(&scheme.name);
            if key.is_empty() {
                return Err(CoreError::invalid_catalog("scheme name is empty"));
            }
            if !names.insert(key) {
                return Err(CoreError::invalid_catalog(format!(
                    "duplicate scheme `{}`",
                    scheme.name
                )));
            }
            if scheme.required_fields.is_empty() {
                return Err(CoreError::invalid_catalog(format!(
                    "scheme `{}` has no required fields",
                    scheme.name
                )));
            }
            let mut fields = HashSet::new();
            for field in &scheme.required_fields {
                if field.trim().is_empty() {
                    return Err(CoreError::invalid_catalog(format!(
                        "scheme `{}` has an empty field identifier",
                        scheme.name
                    )));
                }
                if !fields.insert(field.as_str()) {
                    return Err(CoreError::invalid_catalog(format!(
                        "scheme `{}` lists `{}` twice",
                        scheme.name, field
                    )));
                }
            }
        }

        Ok(Self { schemes })
    }

    /// The five schemes the assistant ships with.
    pub fn builtin() -> Self {
        Self {
            schemes: vec![
                SchemeDefinition::new("PM Awas Yojana", &["aadhar", "income", "land_status"]),
                SchemeDefinition::new("PM Kisan", &["aadhar", "farmer_id", "bank_account"]),
                SchemeDefinition::new("Ladli Behna", &["aadhar", "samagra_id", "bank_account"]),
                SchemeDefinition::new("Swasthya Sathi", &["aadhar", "ration_card", "family_count"]),
                SchemeDefinition::new("Old Age Pension", &["aadhar", "age_proof", "bank_ifsc"]),
            ],
        }
    }

    /// Parse a catalog from TOML text.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CoreError::invalid_catalog(e.to_string()))?;
        Self::new(file.schemes)
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::invalid_catalog(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Look a scheme up by name, ignoring case and surrounding whitespace.
    pub fn resolve(&self, name: &str) -> Option<&SchemeDefinition> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        self.schemes.iter().find(|s| normalize_name(&s.name) == key)
    }

    /// Required fields for a scheme, in catalog order.
    pub fn required_fields(&self, name: &str) -> CoreResult<&[String]> {
        self.resolve(name)
            .map(|s| s.required_fields.as_slice())
            .ok_or_else(|| CoreError::unknown_scheme(name.trim()))
    }

    /// Scheme names in catalog order; this is the menu shown to users.
    pub fn scheme_names(&self) -> Vec<&str> {
        self.schemes.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn schemes(&self) -> &[SchemeDefinition] {
        &self.schemes
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    /// Find the scheme mentioned earliest in free text, if any.
    pub fn find_mentioned(&self, text: &str) -> Option<&SchemeDefinition> {
        let haystack = text.to_lowercase();
        self.schemes
            .iter()
            .filter_map(|s| {
                haystack
                    .find(&normalize_name(&s.name))
                    .map(|pos| (pos, s))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, s)| s)
    }

    /// Catalog as a JSON object (`name -> [fields]`) in catalog order.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .schemes
            .iter()
            .map(|s| (s.name.clone(), serde_json::json!(s.required_fields)))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Default for SchemeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
