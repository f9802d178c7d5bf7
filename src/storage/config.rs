//! TOML Configuration Management
//!
//! Resolves the service configuration: defaults, then an optional TOML file,
//! then environment overrides. `.env` files are loaded into the environment by
//! the binary before this runs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::models::settings::{AppConfig, ProviderSettings};
use crate::utils::error::{AppError, AppResult};
use yojna_setu_llm::ProviderType;

pub const ENV_SARVAM_API_KEY: &str = "SARVAM_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BIND: &str = "YOJNA_SETU_BIND";
pub const ENV_DB_PATH: &str = "YOJNA_SETU_DB_PATH";
pub const ENV_BLOB_DIR: &str = "YOJNA_SETU_BLOB_DIR";

/// Configuration service for the resolved service settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: Option<PathBuf>,
    config: AppConfig,
}

impl ConfigService {
    /// Resolve configuration from an optional file and the process environment
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`ConfigService::load`] with an explicit environment lookup
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => AppConfig::default(),
        };

        apply_env_overrides(&mut config, lookup);
        config.validate().map_err(AppError::validation)?;

        if let Some(path) = path {
            info!(path = %path.display(), "Loaded configuration file");
        }

        Ok(Self {
            config_path: path.map(Path::to_path_buf),
            config,
        })
    }

    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| AppError::config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// File the configuration was read from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Apply environment overrides on top of file/default values.
///
/// API keys fill every chain entry of the matching provider type; the
/// Sarvam key also authorises the speech endpoints.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(ENV_SARVAM_API_KEY) {
        set_provider_key(&mut config.llm.providers, ProviderType::Sarvam, &key);
        config.voice.speech.api_key = Some(key);
    }
    if let Some(key) = non_empty(ENV_OPENAI_API_KEY) {
        set_provider_key(&mut config.llm.providers, ProviderType::OpenAI, &key);
    }
    if let Some(bind) = non_empty(ENV_BIND) {
        config.server.bind = bind;
    }
    if let Some(path) = non_empty(ENV_DB_PATH) {
        config.storage.database_path = PathBuf::from(path);
    }
    if let Some(dir) = non_empty(ENV_BLOB_DIR) {
        config.storage.blob_dir = PathBuf::from(dir);
    }
}

fn set_provider_key(providers: &mut [ProviderSettings], provider: ProviderType, key: &str) {
    for entry in providers.iter_mut().filter(|p| p.provider == provider) {
        entry.api_key = Some(key.to_string());
    }
}
