// Yojna Setu - service entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use yojna_setu::cli::{demo_profile, run_chat, Cli, Commands};
use yojna_setu::services::{AgentService, ApplicationService};
use yojna_setu::state::{build_provider_chain, AppState};
use yojna_setu::storage::{ApplicationStore, ConfigService, Database, MemoryProfileStore};
use yojna_setu_core::SchemeCatalog;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("yojna_setu=info,tower_http=info")
            }),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = ConfigService::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .into_config();

    match cli.command {
        Commands::Serve => {
            info!("Yojna Setu v{} starting", env!("CARGO_PKG_VERSION"));
            let state = AppState::initialize(config).context("failed to initialize services")?;
            yojna_setu::server::run(state).await?;
        }
        Commands::Chat { phone, persist } => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();

            if persist {
                let state = AppState::initialize(config).context("failed to initialize services")?;
                run_chat(state.agent(), &phone, stdin, stdout).await?;
            } else {
                let catalog = Arc::new(match &config.catalog.path {
                    Some(path) => SchemeCatalog::load(path)?,
                    None => SchemeCatalog::builtin(),
                });
                let agent = AgentService::new(
                    catalog.clone(),
                    build_provider_chain(&config)?,
                    Arc::new(MemoryProfileStore::new().with_profile(demo_profile(&phone))),
                    ApplicationService::new(
                        ApplicationStore::new(Database::new_in_memory()?),
                        catalog,
                    ),
                );
                run_chat(&agent, &phone, stdin, stdout).await?;
            }
        }
    }

    Ok(())
}
