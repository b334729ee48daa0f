//! Request plumbing shared by the provider API clients.

use super::ConnectorError;
use crmhub_model::Provider;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Send a request and decode a JSON body, classifying every failure.
///
/// `what` names the call for error messages (e.g. "contacts").
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: Provider,
    request: RequestBuilder,
    what: &str,
) -> Result<T, ConnectorError> {
    let name = provider.display_name();

    let response = request.send().await.map_err(|e| {
        ConnectorError::Upstream(format!("Failed to reach {} ({}): {}", name, what, e))
    })?;

    let response = check_response_status(provider, response).await?;

    let body = response.text().await.map_err(|e| {
        ConnectorError::Upstream(format!("Failed to read {} response for {}: {}", name, what, e))
    })?;

    serde_json::from_str(&body).map_err(|e| {
        ConnectorError::Upstream(format!("Malformed {} response for {}: {}", name, what, e))
    })
}

/// Map a non-2xx status to the error taxonomy.
///
/// - 401/403 → auth (providers answer 403 when a scope is missing)
/// - 429 → rate limit, with Retry-After when given
/// - other non-2xx → upstream
async fn check_response_status(
    provider: Provider,
    response: Response,
) -> Result<Response, ConnectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    let detail = provider_message(&body)
        .map(|m| format!(" - {}", m))
        .unwrap_or_default();
    let name = provider.display_name();

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConnectorError::Auth(format!(
            "{} auth error ({}): token expired, invalid, or missing required scopes{}",
            name,
            status.as_u16(),
            detail
        )),
        StatusCode::TOO_MANY_REQUESTS => ConnectorError::RateLimited(format!(
            "{} rate limit exceeded (Retry-After: {}){}",
            name,
            retry_after.as_deref().unwrap_or("unknown"),
            detail
        )),
        s => ConnectorError::Upstream(format!("{} API error: {}{}", name, s, detail)),
    })
}

/// The human-readable message from a provider error body.
///
/// HubSpot and Notion use `{"message": ...}`, Airtable nests it as
/// `{"error": {"message": ...}}` or sends `{"error": "CODE"}`.
fn provider_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    if let Some(msg) = json.get("message").and_then(Value::as_str) {
        return Some(msg.to_string());
    }
    match json.get("error")? {
        Value::String(code) => Some(code.clone()),
        Value::Object(obj) => obj
            .get("message")
            .or_else(|| obj.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
