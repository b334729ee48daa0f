//! OAuth 2.0 authorization flow, one set of endpoints per provider.
//!
//! Implements the authorization code flow:
//! 1. Viewer posts `user_id`/`org_id` to `/integrations/:provider/authorize`
//!    and opens the returned URL in a popup
//! 2. User authorizes on the provider's site
//! 3. Provider redirects to `/integrations/:provider/oauth2callback`
//! 4. Exchange code for token, store the encrypted blob, close the popup
//! 5. Viewer posts to `/integrations/:provider/credentials` to collect the blob

mod exchange;
mod pkce;
mod provider;
mod state_manager;

pub use state_manager::{run_state_cleanup, StateEntry, StateManager};

use super::{form::FormFields, resolve_connector, AppError, HubAppState};
use crate::config::{clients::env_vars, OAuthClient};
use crate::credentials::Credentials;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::{Html, Json},
};
use crmhub_model::Provider;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Served to the popup once the token is stored.
const CLOSE_WINDOW_HTML: &str = r#"<html>
    <script>
        window.close();
    </script>
</html>
"#;

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// The `user_id`/`org_id` pair every flow is keyed by.
fn identity(form: &FormFields) -> Result<(String, String), AppError> {
    let user_id = form.require("user_id")?.to_string();
    let org_id = form.require("org_id")?.to_string();
    Ok((user_id, org_id))
}

fn oauth_client(state: &HubAppState, provider: Provider) -> Result<OAuthClient, AppError> {
    state.oauth_clients.get(provider).cloned().ok_or_else(|| {
        let (id_var, secret_var) = env_vars(provider);
        error!(provider = %provider, "OAuth client not configured (missing env vars?)");
        AppError::ServerError(format!(
            "OAuth not configured for {}. Set {} and {} environment variables.",
            provider.display_name(),
            id_var,
            secret_var
        ))
    })
}

fn redirect_uri(state: &HubAppState, provider: Provider) -> String {
    format!(
        "{}/integrations/{}/oauth2callback",
        state.callback_base_url, provider
    )
}

/// POST /integrations/:provider/authorize
///
/// Returns the provider authorization URL as a JSON string.
///
/// # Security
/// - Generates a single-use CSRF state parameter (10-minute expiry)
/// - PKCE verifier stays server-side in the state entry
pub(super) async fn authorize(
    State(state): State<Arc<HubAppState>>,
    Path(provider_name): Path<String>,
    form: Result<FormFields, AppError>,
) -> Result<Json<String>, AppError> {
    let (provider, connector) = resolve_connector(&state, &provider_name)?;
    let (user_id, org_id) = identity(&form?)?;
    let client = oauth_client(&state, provider)?;
    let oauth = connector.oauth_config();

    let code_verifier = oauth.pkce.then(pkce::generate_verifier);
    let code_challenge = code_verifier.as_deref().map(pkce::challenge_s256);

    let csrf_state = state
        .state_manager
        .create_state(provider, &org_id, &user_id, code_verifier);

    let auth_url = provider::build_auth_url(
        &oauth,
        &client.client_id,
        &redirect_uri(&state, provider),
        &csrf_state,
        code_challenge.as_deref(),
    );

    info!(
        provider = %provider,
        org_id = %org_id,
        user_id = %user_id,
        "Authorization URL issued"
    );

    Ok(Json(auth_url))
}

/// GET /integrations/:provider/oauth2callback
///
/// Exchanges the authorization code for a token blob, stores it for the
/// user/org that started the flow, and closes the popup.
///
/// # Security
/// - Validates CSRF state parameter
/// - Single-use state (consumed on validation)
/// - State must have been issued for this provider
pub(super) async fn oauth2callback(
    State(state): State<Arc<HubAppState>>,
    Path(provider_name): Path<String>,
    query: Result<Query<OAuthCallback>, QueryRejection>,
) -> Result<Html<&'static str>, AppError> {
    let (provider, connector) = resolve_connector(&state, &provider_name)?;
    let Query(callback) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if let Some(error) = callback.error {
        let description = callback
            .error_description
            .unwrap_or_else(|| error.clone());
        warn!(
            provider = %provider,
            error = %error,
            description = %description,
            "OAuth authorization failed"
        );
        return Err(AppError::BadRequest(format!(
            "{} OAuth error: {}",
            provider.display_name(),
            description
        )));
    }

    let (code, csrf_state) = match (callback.code, callback.state) {
        (Some(code), Some(csrf_state)) => (code, csrf_state),
        _ => {
            return Err(AppError::BadRequest(
                "Missing required parameters: code or state".to_string(),
            ))
        }
    };

    let entry = state
        .state_manager
        .validate_and_consume(&csrf_state)
        .ok_or_else(|| {
            warn!(provider = %provider, "Invalid or expired OAuth state");
            AppError::BadRequest("State validation failed".to_string())
        })?;

    if entry.provider != provider {
        error!(
            expected = %entry.provider,
            actual = %provider,
            "Provider mismatch"
        );
        return Err(AppError::BadRequest("State validation failed".to_string()));
    }

    let client = oauth_client(&state, provider)?;
    let oauth = connector.oauth_config();

    debug!(provider = %provider, "Exchanging authorization code for token");
    let credentials = exchange::exchange_code_for_token(
        &state.http_client,
        &oauth,
        &client,
        &code,
        &redirect_uri(&state, provider),
        entry.code_verifier.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(provider = %provider, error = %e, "Token exchange failed");
        AppError::BadRequest(format!("Failed to exchange code for tokens: {}", e))
    })?;

    store_credentials(&state, provider, &entry.org_id, &entry.user_id, &credentials)?;

    info!(
        provider = %provider,
        org_id = %entry.org_id,
        user_id = %entry.user_id,
        has_refresh_token = credentials.refresh_token.is_some(),
        "OAuth flow completed successfully"
    );

    Ok(Html(CLOSE_WINDOW_HTML))
}

/// POST /integrations/:provider/credentials
///
/// Returns the stored token blob, refreshing it first when it has expired.
pub(super) async fn get_credentials(
    State(state): State<Arc<HubAppState>>,
    Path(provider_name): Path<String>,
    form: Result<FormFields, AppError>,
) -> Result<Json<Credentials>, AppError> {
    let (provider, connector) = resolve_connector(&state, &provider_name)?;
    let (user_id, org_id) = identity(&form?)?;

    let stored = state
        .credential_store
        .get(provider, &org_id, &user_id)
        .map_err(|e| {
            error!(provider = %provider, error = %e, "Failed to read credentials");
            AppError::ServerError(format!("Failed to read credentials: {}", e))
        })?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "No {} credentials found. Please reauthorize the integration.",
                provider.display_name()
            ))
        })?;

    if !stored.is_expired() {
        return Ok(Json(stored));
    }

    let Some(refresh_token) = stored.refresh_token.as_deref() else {
        return Err(AppError::BadRequest(format!(
            "{} access token has expired. Please reauthorize the integration.",
            provider.display_name()
        )));
    };

    let client = oauth_client(&state, provider)?;
    let refreshed = exchange::refresh_access_token(
        &state.http_client,
        &connector.oauth_config(),
        &client,
        refresh_token,
    )
    .await
    .map_err(|e| {
        warn!(provider = %provider, error = %e, "Token refresh failed");
        AppError::BadRequest(format!(
            "Failed to refresh {} token: {}",
            provider.display_name(),
            e
        ))
    })?;

    store_credentials(&state, provider, &org_id, &user_id, &refreshed)?;
    info!(provider = %provider, org_id = %org_id, user_id = %user_id, "Access token refreshed");

    Ok(Json(refreshed))
}

fn store_credentials(
    state: &HubAppState,
    provider: Provider,
    org_id: &str,
    user_id: &str,
    credentials: &Credentials,
) -> Result<(), AppError> {
    state
        .credential_store
        .store(provider, org_id, user_id, credentials, state.credential_ttl)
        .map_err(|e| {
            error!(provider = %provider, error = %e, "Failed to store credentials");
            AppError::ServerError(format!("Failed to store credentials: {}", e))
        })
}
