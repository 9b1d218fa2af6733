use std::sync::Arc;

use backup_relay::{
    api::{start_api_server, ApiState},
    config::AppConfig,
    index::ElasticsearchIndex,
    observability::{init_observability, log_config_info},
    pipeline::PipelineOrchestrator,
    secrets::VaultSecretStore,
    storage::S3ObjectStorage,
    Error, Result, APP_NAME, VERSION,
};
use tracing::{error, info};

fn install_rustls_provider() -> Result<()> {
    use rustls::crypto::{ring, CryptoProvider};

    if CryptoProvider::get_default().is_none() {
        ring::default_provider()
            .install_default()
            .map_err(|_| Error::internal("Failed to install ring crypto provider"))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    install_rustls_provider()?;

    // Load .env file if it exists (optional - won't fail if missing)
    // This must happen before any config is read from environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = AppConfig::from_env()?;
    init_observability(&config.observability).await?;

    info!(app_name = APP_NAME, version = VERSION, "Starting backup relay");
    log_config_info(&config);

    let secrets = Arc::new(VaultSecretStore::new(&config.vault)?);
    let index = Arc::new(ElasticsearchIndex::new(&config.index)?);
    let storage = Arc::new(S3ObjectStorage::new(&config.storage).await?);

    let orchestrator = PipelineOrchestrator::new(secrets, index, storage, config.pipeline.clone());
    let state = ApiState { orchestrator: Arc::new(orchestrator) };

    if let Err(e) = start_api_server(&config.server, state).await {
        error!(error = %e, "Backup relay terminated with error");
        return Err(e);
    }

    info!("Backup relay shutdown completed");
    Ok(())
}
