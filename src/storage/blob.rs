//! Blob Store
//!
//! Storage for uploaded voice notes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::utils::error::{AppError, AppResult};

/// Stores binary uploads and returns a location string for them.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under `key` (a relative, `/`-separated path).
    async fn put(&self, key: &str, bytes: &[u8]) -> AppResult<String>;
}

/// Object key for a voice note: `voice/<phone>/<uuid>.mp3`
pub fn voice_note_key(phone: &str) -> String {
    let phone: String = phone
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+')
        .collect();
    let phone = if phone.is_empty() { "unknown".to_string() } else { phone };
    format!("voice/{}/{}.mp3", phone, uuid::Uuid::new_v4())
}

/// Blob store writing into a local directory
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(AppError::validation(format!("invalid blob key: {}", key)));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> AppResult<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let absolute = match tokio::fs::canonicalize(&path).await {
            Ok(p) => p,
            Err(_) => path,
        };
        Ok(format!("file://{}", absolute.display()))
    }
}
