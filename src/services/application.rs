//! Application Service
//!
//! Submits scheme applications on behalf of a user. Submissions are
//! deduplicated by (phone, canonical scheme): a repeated trigger returns the
//! first application instead of creating another one.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::{ApplicationRecord, ApplicationStore, InsertOutcome};
use crate::utils::error::{AppError, AppResult};
use crate::utils::mask::mask_phone;
use yojna_setu_core::{CoreError, SchemeCatalog};

/// Status stored for every accepted application
pub const SUBMITTED_STATUS: &str = "Success";

/// What the caller gets back from an apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationReceipt {
    pub status: String,
    pub application_id: String,
    pub scheme: String,
    /// Message shown to the user
    #[serde(rename = "message")]
    pub confirmation_text: String,
    /// True when this apply matched an earlier submission
    pub duplicate: bool,
    pub submitted_at: String,
}

impl ApplicationReceipt {
    fn from_record(record: ApplicationRecord, duplicate: bool) -> Self {
        Self {
            confirmation_text: confirmation_text(&record.scheme, &record.id),
            status: record.status,
            application_id: record.id,
            scheme: record.scheme,
            duplicate,
            submitted_at: record.submitted_at,
        }
    }
}

/// User-facing confirmation for a submitted application
pub fn confirmation_text(scheme: &str, application_id: &str) -> String {
    format!(
        "Aapka {} ke liye aavedan (application) submit ho gaya hai. Reference ID: {}",
        scheme, application_id
    )
}

/// Fresh reference id: `APP-` followed by eight uppercase hex digits
pub fn new_application_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("APP-{}", hex[..8].to_uppercase())
}

/// Apply side effect
#[derive(Debug, Clone)]
pub struct ApplicationService {
    store: ApplicationStore,
    catalog: Arc<SchemeCatalog>,
}

impl ApplicationService {
    pub fn new(store: ApplicationStore, catalog: Arc<SchemeCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Submit an application for `scheme`.
    ///
    /// Fails with `UnknownScheme` when the name is not in the catalog and
    /// with a validation error while any required field is absent or blank.
    /// Only the scheme's required fields are stored with the application.
    pub fn apply(
        &self,
        phone: &str,
        scheme: &str,
        fields: &BTreeMap<String, String>,
    ) -> AppResult<ApplicationReceipt> {
        let definition = self
            .catalog
            .resolve(scheme)
            .ok_or_else(|| CoreError::unknown_scheme(scheme))?;

        let missing: Vec<&str> = definition
            .required_fields
            .iter()
            .filter(|field| fields.get(*field).map_or(true, |v| v.trim().is_empty()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "cannot apply for {}: missing {}",
                definition.name,
                missing.join(", ")
            )));
        }

        let submitted: BTreeMap<String, String> = definition
            .required_fields
            .iter()
            .filter_map(|field| fields.get(field).map(|v| (field.clone(), v.clone())))
            .collect();

        let record = ApplicationRecord {
            id: new_application_id(),
            phone: phone.to_string(),
            scheme: definition.name.clone(),
            fields: submitted,
            status: SUBMITTED_STATUS.to_string(),
            submitted_at: chrono::Utc::now().to_rfc3339(),
        };

        match self.store.insert_if_absent(record)? {
            InsertOutcome::Inserted(record) => {
                info!(
                    phone = %mask_phone(phone),
                    scheme = %record.scheme,
                    application_id = %record.id,
                    "Application submitted"
                );
                Ok(ApplicationReceipt::from_record(record, false))
            }
            InsertOutcome::Existing(record) => {
                info!(
                    phone = %mask_phone(phone),
                    scheme = %record.scheme,
                    application_id = %record.id,
                    "Application already submitted; returning existing receipt"
                );
                Ok(ApplicationReceipt::from_record(record, true))
            }
        }
    }

    /// All applications a user has submitted
    pub fn list(&self, phone: &str) -> AppResult<Vec<ApplicationReceipt>> {
        Ok(self
            .store
            .list_for_phone(phone)?
            .into_iter()
            .map(|record| ApplicationReceipt::from_record(record, false))
            .collect())
    }

    pub fn catalog(&self) -> &SchemeCatalog {
        &self.catalog
    }
}
