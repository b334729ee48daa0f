use anyhow::{Context, Result};
use chrono::Duration;
use crmhub::api::{self, HubAppState, StateManager};
use crmhub::config::{self, OAuthClients};
use crmhub::credentials::{self, CredentialStore};
use crmhub::integrations::ConnectorRegistry;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables take precedence
    let dotenv = dotenvy::dotenv();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crmhub=info".into()),
        )
        .init();

    info!("crmhub starting...");
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded .env");
    }

    let mut config = match std::env::var("CRMHUB_CONFIG") {
        Ok(path) => config::load_config(&path)?,
        Err(_) => config::HubConfig::default(),
    };
    config.apply_env();
    config.validate().context("Invalid configuration")?;

    let oauth_clients = OAuthClients::from_env();
    for provider in oauth_clients.missing() {
        let (id_var, secret_var) = config::clients::env_vars(provider);
        warn!(
            provider = %provider,
            "OAuth disabled: set {} and {} to enable it", id_var, secret_var
        );
    }

    let (encryption_key, credentials_db) = match std::env::var("CRMHUB_ENCRYPTION_KEY") {
        Ok(key) => (key, config.storage.credentials_db.clone()),
        Err(_) => {
            warn!("CRMHUB_ENCRYPTION_KEY not set; using an ephemeral key and an in-memory credential store");
            (credentials::generate_key(), ":memory:".to_string())
        }
    };

    config::log_unused_env(|key| std::env::var(key).ok());

    let credential_store = Arc::new(
        CredentialStore::new(&credentials_db, &encryption_key)
            .context("Failed to initialize credential store")?,
    );
    info!(credentials_db = %credentials_db, "Credential store initialized");

    let state_manager = StateManager::new(config.storage.state_ttl_seconds);
    tokio::spawn(api::run_state_cleanup(
        state_manager.clone(),
        Arc::clone(&credential_store),
        config.storage.cleanup_interval_seconds,
    ));

    let state = HubAppState {
        registry: ConnectorRegistry::new(),
        credential_store,
        state_manager,
        oauth_clients,
        http_client: reqwest::Client::new(),
        callback_base_url: config.server.callback_base_url.clone(),
        credential_ttl: Duration::seconds(config.storage.credential_ttl_seconds),
    };

    let router = api::create_router(state).layer(api::cors_layer(&config.server.allowed_origins)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(
        bind = %config.server.bind,
        callback_base_url = %config.server.callback_base_url,
        "crmhub listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => {
                    warn!(error = %e, "Failed to listen for ctrl_c signal");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
        .context("Server error")?;

    info!("crmhub stopped");
    Ok(())
}
