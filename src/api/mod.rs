//! HTTP API: record loading plus the per-provider OAuth endpoints.
//!
//! ```text
//! GET  /                                      → {"Ping": "Pong"}
//! POST /integrations/:provider/authorize      → provider authorization URL
//! GET  /integrations/:provider/oauth2callback → closes the popup
//! POST /integrations/:provider/credentials    → stored token blob
//! POST /integrations/:provider/load           → [NormalizedRecord]
//! ```

mod error;
mod form;
mod load;
pub mod oauth;

pub use error::AppError;
pub use form::FormFields;
pub use oauth::{run_state_cleanup, StateManager};

use crate::config::OAuthClients;
use crate::credentials::CredentialStore;
use crate::integrations::{Connector, ConnectorRegistry};
use anyhow::{bail, Context, Result};
use axum::{
    http::HeaderValue,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Duration;
use crmhub_model::{Provider, UnknownProvider};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

/// Shared application state
#[derive(Clone)]
pub struct HubAppState {
    pub registry: ConnectorRegistry,
    pub credential_store: Arc<CredentialStore>,
    pub state_manager: StateManager,
    pub oauth_clients: OAuthClients,
    /// Client for token endpoint calls
    pub http_client: reqwest::Client,
    pub callback_base_url: String,
    /// How long stored token blobs stay readable
    pub credential_ttl: Duration,
}

/// Create the API router
pub fn create_router(state: HubAppState) -> Router {
    Router::new()
        .route("/", get(ping))
        .route("/integrations/:provider/authorize", post(oauth::authorize))
        .route("/integrations/:provider/oauth2callback", get(oauth::oauth2callback))
        .route("/integrations/:provider/credentials", post(oauth::get_credentials))
        .route("/integrations/:provider/load", post(load::load_items))
        .with_state(Arc::new(state))
}

/// CORS for the browser viewer: listed origins, any method/header, with
/// credentials.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    if allowed_origins.iter().any(|o| o.trim() == "*") {
        bail!("CORS origin '*' cannot be combined with credentials; list explicit origins");
    }
    let origins = allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{}'", o))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

async fn ping() -> Json<Value> {
    Json(json!({"Ping": "Pong"}))
}

/// Path segment → provider and its connector, or 404.
fn resolve_connector(
    state: &HubAppState,
    name: &str,
) -> Result<(Provider, Arc<dyn Connector>), AppError> {
    let provider: Provider = name.parse().map_err(|e: UnknownProvider| {
        warn!(provider = %name, "Unknown integration");
        AppError::NotFound(e.to_string())
    })?;
    let connector = state
        .registry
        .get(provider)
        .ok_or_else(|| AppError::NotFound(UnknownProvider(name.to_string()).to_string()))?;
    Ok((provider, connector))
}
