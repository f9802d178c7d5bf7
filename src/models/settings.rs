//! Settings Models
//!
//! Service configuration, read from TOML and environment overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use yojna_setu_llm::{ChainConfig, ProviderConfig, ProviderType, ProxyConfig, SpeechConfig};

/// Top-level service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// One entry of the provider chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub provider: ProviderType,
    /// Model override; the provider default otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Usually supplied through the environment
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    pub fn new(provider: ProviderType) -> Self {
        Self {
            provider,
            model: None,
            base_url: None,
            api_key: None,
        }
    }
}

/// Chat provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Providers in the order they are tried, primary first
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderSettings>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on provider attempts per message
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

fn default_providers() -> Vec<ProviderSettings> {
    vec![
        ProviderSettings::new(ProviderType::Sarvam),
        ProviderSettings::new(ProviderType::OpenAI),
    ]
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_attempts() -> usize {
    3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_attempts: default_max_attempts(),
            proxy: None,
        }
    }
}

impl LlmConfig {
    /// Provider configurations in chain order
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .map(|entry| ProviderConfig {
                provider: entry.provider,
                api_key: entry.api_key.clone(),
                base_url: entry.base_url.clone(),
                model: entry
                    .model
                    .clone()
                    .unwrap_or_else(|| entry.provider.default_model().to_string()),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                proxy: self.proxy.clone(),
            })
            .collect()
    }

    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            max_attempts: self.max_attempts,
            ..Default::default()
        }
    }
}

/// Voice pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Language tag used when a request carries none
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(flatten)]
    pub speech: SpeechConfig,
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    yojna_setu_llm::speech::DEFAULT_LANGUAGE.to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_language: default_language(),
            speech: SpeechConfig::default(),
        }
    }
}

/// Local persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Root directory for uploaded voice notes
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/yojna-setu.db")
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("data/blobs")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            blob_dir: default_blob_dir(),
        }
    }
}

/// Scheme catalog source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// TOML catalog file; the built-in catalog is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind.trim().is_empty() {
            return Err("server.bind must not be empty".to_string());
        }

        if self.llm.providers.is_empty() {
            return Err("llm.providers must name at least one provider".to_string());
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                self.llm.temperature
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err("llm.max_tokens must be greater than 0".to_string());
        }

        if self.llm.max_attempts == 0 {
            return Err("llm.max_attempts must be greater than 0".to_string());
        }

        if self.voice.enabled && self.voice.default_language.trim().is_empty() {
            return Err("voice.default_language must not be empty".to_string());
        }

        Ok(())
    }
}
