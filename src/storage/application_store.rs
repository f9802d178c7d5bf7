//! Application Store
//!
//! Submitted applications, at most one per (phone, scheme).

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::database::Database;
use crate::utils::error::{AppError, AppResult};

/// A stored application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    pub phone: String,
    /// Canonical scheme name from the catalog
    pub scheme: String,
    /// Field values submitted with the application
    pub fields: BTreeMap<String, String>,
    pub status: String,
    /// RFC 3339 timestamp
    pub submitted_at: String,
}

/// Outcome of [`ApplicationStore::insert_if_absent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ApplicationRecord),
    /// An application for the same (phone, scheme) already existed
    Existing(ApplicationRecord),
}

/// Application table access
#[derive(Debug, Clone)]
pub struct ApplicationStore {
    db: Database,
}

impl ApplicationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert `record` unless the user already applied for the scheme.
    pub fn insert_if_absent(&self, record: ApplicationRecord) -> AppResult<InsertOutcome> {
        let fields = serde_json::to_string(&record.fields)?;
        let conn = self.db.get_connection()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO applications (id, phone, scheme, fields, status, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.phone,
                record.scheme,
                fields,
                record.status,
                record.submitted_at
            ],
        )?;
        drop(conn);

        if inserted == 1 {
            return Ok(InsertOutcome::Inserted(record));
        }

        match self.find(&record.phone, &record.scheme)? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            // Lost an id collision rather than a (phone, scheme) one
            None => Err(AppError::database(format!(
                "application id {} already in use",
                record.id
            ))),
        }
    }

    /// Application for (phone, scheme), if any
    pub fn find(&self, phone: &str, scheme: &str) -> AppResult<Option<ApplicationRecord>> {
        let conn = self.db.get_connection()?;
        let row = conn
            .query_row(
                "SELECT id, phone, scheme, fields, status, submitted_at
                 FROM applications WHERE phone = ?1 AND scheme = ?2",
                params![phone, scheme],
                raw_row,
            )
            .optional()?;
        row.map(into_record).transpose()
    }

    /// All applications for a user, oldest first
    pub fn list_for_phone(&self, phone: &str) -> AppResult<Vec<ApplicationRecord>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, phone, scheme, fields, status, submitted_at
             FROM applications WHERE phone = ?1 ORDER BY submitted_at, id",
        )?;
        let rows = stmt
            .query_map(params![phone], raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_record).collect()
    }
}

type RawRow = (String, String, String, String, String, String);

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_record(raw: RawRow) -> AppResult<ApplicationRecord> {
    let (id, phone, scheme, fields, status, submitted_at) = raw;
    Ok(ApplicationRecord {
        id,
        phone,
        scheme,
        fields: serde_json::from_str(&fields)?,
        status,
        submitted_at,
    })
}
