use std::sync::Arc;

use sentinela::{
    api::{build_state, start_api_server},
    config::{ApiServerConfig, DatabaseConfig, EncryptionConfig, ObservabilityConfig},
    crypto::SecretCipher,
    observability::init_tracing,
    storage::create_pool,
    Result, APP_NAME, VERSION,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (optional - won't fail if missing).
    // This must happen before any config is read from environment.
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let observability_config = ObservabilityConfig::from_env();
    init_tracing(&observability_config)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting Sentinela credential service");

    // Fail closed: no master key, no service. Every encryption path needs it.
    let encryption_config = EncryptionConfig::from_env()?;
    let cipher = Arc::new(SecretCipher::new(&encryption_config)?);

    let api_config = ApiServerConfig::from_env()?;
    let db_config = DatabaseConfig::from_env();

    info!(database_url = %db_config.url, "Creating database connection pool");
    let pool = create_pool(&db_config).await?;

    let state = build_state(pool, cipher);

    start_api_server(api_config, state).await?;

    info!("Sentinela shutdown completed");
    Ok(())
}
