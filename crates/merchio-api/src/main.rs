//! merchio API Server
//!
//! Configuration comes from the environment, optionally layered over a TOML
//! file named by `MERCHIO_CONFIG`.

use anyhow::Context;
use merchio_api::{create_router, state::AppState};
use merchio_core::config::{AppConfig, LoggingConfig};
use merchio_core::PgUserStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let level = &logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("merchio={level},merchio_api={level},merchio_core={level},tower_http={level},audit=info")
            .into()
    });

    if logging.json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("MERCHIO_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing secret or datasource stops the process here
    let config = load_config().context("Invalid configuration")?;
    init_tracing(&config.logging);

    let store = PgUserStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to PostgreSQL")?;
    store.migrate().await.context("Failed to prepare schema")?;
    tracing::info!("Connected to PostgreSQL");

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(&config, Arc::new(store)));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("merchio API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
