//! Profile Store
//!
//! Key-value storage for user profiles, keyed by phone number.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use rusqlite::{params, OptionalExtension};

use super::database::Database;
use crate::utils::error::{AppError, AppResult};
use yojna_setu_core::UserProfile;

/// Storage for user profiles.
pub trait ProfileStore: Send + Sync {
    /// Stored profile for `phone`, `None` when the user is unknown.
    fn get(&self, phone: &str) -> AppResult<Option<UserProfile>>;

    /// Insert or replace a profile.
    fn put(&self, profile: &UserProfile) -> AppResult<()>;
}

/// Profile store backed by the SQLite `profiles` table
#[derive(Debug, Clone)]
pub struct SqliteProfileStore {
    db: Database,
}

impl SqliteProfileStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ProfileStore for SqliteProfileStore {
    fn get(&self, phone: &str) -> AppResult<Option<UserProfile>> {
        let conn = self.db.get_connection()?;
        let fields: Option<String> = conn
            .query_row(
                "SELECT fields FROM profiles WHERE phone = ?1",
                params![phone],
                |row| row.get(0),
            )
            .optional()?;

        match fields {
            Some(json) => {
                let fields: BTreeMap<String, String> = serde_json::from_str(&json)?;
                Ok(Some(UserProfile {
                    phone: phone.to_string(),
                    fields,
                }))
            }
            None => Ok(None),
        }
    }

    fn put(&self, profile: &UserProfile) -> AppResult<()> {
        if profile.phone.trim().is_empty() {
            return Err(AppError::validation("profile phone must not be empty"));
        }
        let fields = serde_json::to_string(&profile.fields)?;
        let conn = self.db.get_connection()?;
        conn.execute(
            "INSERT INTO profiles (phone, fields) VALUES (?1, ?2)
             ON CONFLICT(phone) DO UPDATE SET fields = excluded.fields, updated_at = CURRENT_TIMESTAMP",
            params![profile.phone, fields],
        )?;
        Ok(())
    }
}

/// In-process profile store for tests and the terminal chat
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, profile: UserProfile) -> Self {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(profile.phone.clone(), profile);
        }
        self
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, phone: &str) -> AppResult<Option<UserProfile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| AppError::internal("profile store lock poisoned"))?;
        Ok(profiles.get(phone).cloned())
    }

    fn put(&self, profile: &UserProfile) -> AppResult<()> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| AppError::internal("profile store lock poisoned"))?;
        profiles.insert(profile.phone.clone(), profile.clone());
        Ok(())
    }
}
