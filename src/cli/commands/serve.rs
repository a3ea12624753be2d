use std::sync::Arc;

use anyhow::Context;

use crate::app::{app, AppState};
use crate::auth::JwtVerifier;
use crate::config::{AppConfig, StoreBackend};
use crate::database::{DocumentStore, MemoryStore, MongoStore};

pub async fn handle(mut config: AppConfig, port: Option<u16>, store: Option<StoreBackend>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.api.port = port;
    }
    if let Some(store) = store {
        config.database.backend = store;
    }

    let state = build_state(&config).await?;
    let router = app(state, &config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(
        "Finance tracker API listening on http://{} ({:?} mode, {:?} store)",
        bind_addr,
        config.environment,
        config.database.backend
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

/// Construct the store and verifier once; every request shares them
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn DocumentStore> = match config.database.backend {
        StoreBackend::Mongo => Arc::new(
            MongoStore::connect(&config.database)
                .await
                .context("failed to configure MongoDB client")?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier = JwtVerifier::from_config(&config.security).context("failed to configure token verification")?;

    Ok(AppState {
        store,
        verifier: Arc::new(verifier),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
