//! Application State
//!
//! Services shared by the HTTP handlers and the terminal chat, built once
//! from [`AppConfig`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::models::settings::AppConfig;
use crate::services::{AgentService, ApplicationService, VoiceService};
use crate::storage::{
    ApplicationStore, BlobStore, Database, LocalBlobStore, ProfileStore, SqliteProfileStore,
};
use crate::utils::error::{AppError, AppResult};
use yojna_setu_core::SchemeCatalog;
use yojna_setu_llm::{
    LlmProvider, OpenAIProvider, ProviderChain, ProviderType, SarvamProvider, SarvamSpeech,
    SpeechToText, TextToSpeech,
};

/// Speech and blob collaborators of the voice pipeline
#[derive(Clone)]
pub struct VoiceBackend {
    pub blobs: Arc<dyn BlobStore>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
}

/// Shared application state
pub struct AppState {
    config: AppConfig,
    database: Database,
    catalog: Arc<SchemeCatalog>,
    profiles: Arc<dyn ProfileStore>,
    applications: ApplicationService,
    agent: Arc<AgentService>,
    /// `None` when the voice pipeline is disabled
    voice: Option<Arc<VoiceService>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.database)
            .field("agent", &self.agent)
            .field("voice", &self.voice)
            .finish()
    }
}

impl AppState {
    /// Build every service from configuration.
    ///
    /// Opens the SQLite database, loads the scheme catalog and constructs
    /// the provider chain and (when enabled) the Sarvam speech clients.
    pub fn initialize(config: AppConfig) -> AppResult<Self> {
        config.validate().map_err(AppError::config)?;

        let database = Database::open(&config.storage.database_path)?;
        info!(path = %config.storage.database_path.display(), "Database ready");

        let catalog = match &config.catalog.path {
            Some(path) => {
                let catalog = SchemeCatalog::load(path)?;
                info!(path = %path.display(), schemes = catalog.len(), "Loaded scheme catalog");
                catalog
            }
            None => SchemeCatalog::builtin(),
        };

        let chain = build_provider_chain(&config)?;

        let voice = if config.voice.enabled {
            let speech = Arc::new(SarvamSpeech::new(config.voice.speech.clone())?);
            if config.voice.speech.api_key.is_none() {
                warn!("SARVAM_API_KEY not set; voice notes will fail to transcribe");
            }
            Some(VoiceBackend {
                blobs: Arc::new(LocalBlobStore::new(config.storage.blob_dir.clone())),
                stt: speech.clone(),
                tts: speech,
            })
        } else {
            None
        };

        Ok(Self::with_services(config, database, catalog, chain, voice))
    }

    /// Assemble state from already-built collaborators.
    pub fn with_services(
        config: AppConfig,
        database: Database,
        catalog: SchemeCatalog,
        chain: ProviderChain,
        voice: Option<VoiceBackend>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let profiles: Arc<dyn ProfileStore> = Arc::new(SqliteProfileStore::new(database.clone()));
        let applications =
            ApplicationService::new(ApplicationStore::new(database.clone()), catalog.clone());

        let agent = Arc::new(AgentService::new(
            catalog.clone(),
            chain,
            profiles.clone(),
            applications.clone(),
        ));

        let voice = voice.map(|backend| {
            Arc::new(VoiceService::new(
                agent.clone(),
                backend.blobs,
                backend.stt,
                backend.tts,
                config.voice.default_language.clone(),
            ))
        });

        Self {
            config,
            database,
            catalog,
            profiles,
            applications,
            agent,
            voice,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn catalog(&self) -> &SchemeCatalog {
        &self.catalog
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    pub fn applications(&self) -> &ApplicationService {
        &self.applications
    }

    pub fn agent(&self) -> &Arc<AgentService> {
        &self.agent
    }

    pub fn voice(&self) -> Option<&Arc<VoiceService>> {
        self.voice.as_ref()
    }
}

/// Providers from configuration, in fallback order.
///
/// Providers without an API key stay in the chain; they fail fast and the
/// chain moves on to the next one.
pub fn build_provider_chain(config: &AppConfig) -> AppResult<ProviderChain> {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

    for provider_config in config.llm.provider_configs() {
        if provider_config.api_key.is_none() {
            warn!(provider = %provider_config.provider, "No API key configured; provider will be skipped at runtime");
        }
        let provider: Arc<dyn LlmProvider> = match provider_config.provider {
            ProviderType::Sarvam => Arc::new(SarvamProvider::new(provider_config)?),
            ProviderType::OpenAI => Arc::new(OpenAIProvider::new(provider_config)?),
        };
        providers.push(provider);
    }

    let chain = ProviderChain::from_providers(providers).with_config(config.llm.chain_config());
    info!(providers = ?chain.provider_names(), "Provider chain ready");
    Ok(chain)
}
