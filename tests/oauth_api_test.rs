// Integration tests for the authorize / oauth2callback / credentials flow

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Duration;
use crmhub::api::{cors_layer, create_router, HubAppState, StateManager};
use crmhub::config::{OAuthClient, OAuthClients};
use crmhub::credentials::{CredentialStore, Credentials};
use crmhub::integrations::airtable::AirtableConnector;
use crmhub::integrations::hubspot::HubSpotConnector;
use crmhub::integrations::notion::NotionConnector;
use crmhub::integrations::{Connector, ConnectorRegistry};
use crmhub::Provider;
use mockito::{Matcher, Server};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<CredentialStore>,
}

fn create_test_app(provider_url: &str, configured: &[Provider]) -> TestApp {
    let key = BASE64.encode([7u8; 32]);
    let store = Arc::new(CredentialStore::new(":memory:", &key).unwrap());

    let connectors: Vec<Arc<dyn Connector>> = vec![
        Arc::new(HubSpotConnector::with_base_url(provider_url.to_string())),
        Arc::new(AirtableConnector::with_base_url(provider_url.to_string())),
        Arc::new(NotionConnector::with_base_url(provider_url.to_string())),
    ];

    let mut oauth_clients = OAuthClients::default();
    for provider in configured {
        oauth_clients.insert(
            *provider,
            OAuthClient {
                client_id: format!("{}-id", provider),
                client_secret: format!("{}-secret", provider),
            },
        );
    }

    let state = HubAppState {
        registry: ConnectorRegistry::from_connectors(connectors),
        credential_store: Arc::clone(&store),
        state_manager: StateManager::new(600),
        oauth_clients,
        http_client: reqwest::Client::new(),
        callback_base_url: "http://localhost:8000".to_string(),
        credential_ttl: Duration::hours(1),
    };

    TestApp {
        router: create_router(state),
        store,
    }
}

fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(serde_urlencoded::to_string(fields).unwrap()))
        .unwrap()
}

fn identity() -> [(&'static str, &'static str); 2] {
    [("user_id", "TestUser"), ("org_id", "TestOrg")]
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

/// The value of one query parameter in a URL.
fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .ok()?
        .into_iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
}

#[tokio::test]
async fn test_hubspot_full_flow() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth/v1/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "code-123".into()),
            Matcher::UrlEncoded("client_id".into(), "hubspot-id".into()),
            Matcher::UrlEncoded(
                "redirect_uri".into(),
                "http://localhost:8000/integrations/hubspot/oauth2callback".into(),
            ),
        ]))
        .with_status(200)
        .with_body(r#"{"access_token":"hs-access","refresh_token":"hs-refresh","expires_in":1800,"token_type":"bearer"}"#)
        .create_async()
        .await;
    let app = create_test_app(&server.url(), &[Provider::HubSpot]);

    // 1. Authorize
    let (status, json) = send_json(
        &app.router,
        form_request("/integrations/hubspot/authorize", &identity()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let auth_url = json.as_str().unwrap();
    assert!(auth_url.starts_with("https://app.hubspot.com/oauth/authorize?"));
    assert_eq!(query_param(auth_url, "client_id").as_deref(), Some("hubspot-id"));
    let state = query_param(auth_url, "state").unwrap();

    // 2. Callback
    let callback = Request::builder()
        .uri(format!(
            "/integrations/hubspot/oauth2callback?code=code-123&state={}",
            state
        ))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, callback).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("window.close()"));
    token_mock.assert_async().await;

    // 3. Credentials
    let (status, json) = send_json(
        &app.router,
        form_request("/integrations/hubspot/credentials", &identity()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["access_token"], "hs-access");
    assert_eq!(json["refresh_token"], "hs-refresh");
    assert_eq!(json["token_type"], "bearer");
    assert!(json["created_at"].as_i64().is_some());

    // The state token is single-use
    let replay = Request::builder()
        .uri(format!(
            "/integrations/hubspot/oauth2callback?code=code-123&state={}",
            state
        ))
        .body(Body::empty())
        .unwrap();
    let (status, json) = send_json(&app.router, replay).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "State validation failed");
}

#[tokio::test]
async fn test_airtable_authorize_uses_pkce() {
    let mut server = Server::new_async().await;
    let app = create_test_app(&server.url(), &[Provider::Airtable]);

    let (status, json) = send_json(
        &app.router,
        form_request("/integrations/airtable/authorize", &identity()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let auth_url = json.as_str().unwrap();
    assert!(auth_url.starts_with("https://airtable.com/oauth2/v1/authorize?"));
    assert_eq!(query_param(auth_url, "code_challenge_method").as_deref(), Some("S256"));
    assert_eq!(query_param(auth_url, "code_challenge").unwrap().len(), 43);
    assert_eq!(
        query_param(auth_url, "scope").as_deref(),
        Some("data.records:read data.recordComments:read schema.bases:read")
    );

    // The callback sends the verifier with HTTP Basic client auth
    let token_mock = server
        .mock("POST", "/oauth2/v1/token")
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .match_body(Matcher::Regex("code_verifier=[A-Za-z0-9_-]{43}".into()))
        .with_status(200)
        .with_body(r#"{"access_token":"at","refresh_token":"ar","expires_in":3600}"#)
        .create_async()
        .await;

    let state = query_param(auth_url, "state").unwrap();
    let callback = Request::builder()
        .uri(format!("/integrations/airtable/oauth2callback?code=c&state={}", state))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, callback).await;
    assert_eq!(status, StatusCode::OK);
    token_mock.assert_async().await;

    assert!(app
        .store
        .get(Provider::Airtable, "TestOrg", "TestUser")
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_state_for_other_provider_is_rejected() {
    let server = Server::new_async().await;
    let app = create_test_app(&server.url(), &[Provider::HubSpot, Provider::Notion]);

    let (_, json) = send_json(
        &app.router,
        form_request("/integrations/hubspot/authorize", &identity()),
    )
    .await;
    let state = query_param(json.as_str().unwrap(), "state").unwrap();

    let callback = Request::builder()
        .uri(format!("/integrations/notion/oauth2callback?code=c&state={}", state))
        .body(Body::empty())
        .unwrap();
    let (status, json) = send_json(&app.router, callback).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "State validation failed");
}

#[tokio::test]
async fn test_callback_error_from_provider() {
    let app = create_test_app("http://127.0.0.1:1", &[Provider::Notion]);
    let callback = Request::builder()
        .uri("/integrations/notion/oauth2callback?error=access_denied&error_description=User+cancelled")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send_json(&app.router, callback).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Notion OAuth error: User cancelled");
}

#[tokio::test]
async fn test_callback_missing_parameters() {
    let app = create_test_app("http://127.0.0.1:1", &[Provider::HubSpot]);
    let callback = Request::builder()
        .uri("/integrations/hubspot/oauth2callback?code=only-code")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send_json(&app.router, callback).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Missing required parameters: code or state");
}

#[tokio::test]
async fn test_callback_malformed_query_is_json_error() {
    let app = create_test_app("http://127.0.0.1:1", &[Provider::HubSpot]);
    let callback = Request::builder()
        .uri("/integrations/hubspot/oauth2callback?code=a&code=b&state=s")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send_json(&app.router, callback).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().contains("code"));
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = create_test_app("http://127.0.0.1:1", &[Provider::HubSpot]);
    let router = app
        .router
        .layer(cors_layer(&["http://localhost:3000".to_string()]).unwrap());

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/integrations/hubspot/load")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap()
    };

    let response = router.clone().oneshot(preflight("http://localhost:3000")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:3000");
    assert_eq!(headers["access-control-allow-credentials"], "true");

    let response = router.oneshot(preflight("https://evil.example.com")).await.unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_authorize_without_client_config() {
    let app = create_test_app("http://127.0.0.1:1", &[]);

    let (status, json) = send_json(
        &app.router,
        form_request("/integrations/notion/authorize", &identity()),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.contains("NOTION_CLIENT_ID"));
    assert!(detail.contains("NOTION_CLIENT_SECRET"));
}

#[tokio::test]
async fn test_authorize_unknown_provider() {
    let app = create_test_app("http://127.0.0.1:1", &[]);

    let (status, json) = send_json(
        &app.router,
        form_request("/integrations/salesforce/authorize", &identity()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "Integration 'salesforce' not found");
}

#[tokio::test]
async fn test_credentials_not_found() {
    let app = create_test_app("http://127.0.0.1:1", &[Provider::HubSpot]);

    let (status, json) = send_json(
        &app.router,
        form_request("/integrations/hubspot/credentials", &identity()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["detail"],
        "No HubSpot credentials found. Please reauthorize the integration."
    );
}

#[tokio::test]
async fn test_expired_credentials_are_refreshed() {
    let mut server = Server::new_async().await;
    let refresh_mock = server
        .mock("POST", "/oauth/v1/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "hs-refresh".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"access_token":"fresh","refresh_token":"hs-refresh-2","expires_in":1800}"#)
        .create_async()
        .await;
    let app = create_test_app(&server.url(), &[Provider::HubSpot]);

    let expired = Credentials::parse(
        r#"{"access_token":"stale","refresh_token":"hs-refresh","expires_in":1800,"created_at":1000}"#,
    )
    .unwrap();
    app.store
        .store(Provider::HubSpot, "TestOrg", "TestUser", &expired, Duration::hours(1))
        .unwrap();

    let (status, json) = send_json(
        &app.router,
        form_request("/integrations/hubspot/credentials", &identity()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["access_token"], "fresh");
    refresh_mock.assert_async().await;

    let stored = app
        .store
        .get(Provider::HubSpot, "TestOrg", "TestUser")
        .unwrap()
        .unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.refresh_token.as_deref(), Some("hs-refresh-2"));
}

#[tokio::test]
async fn test_refresh_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/oauth/v1/token")
        .with_status(400)
        .with_body(r#"{"status":"BAD_REFRESH_TOKEN"}"#)
        .create_async()
        .await;
    let app = create_test_app(&server.url(), &[Provider::HubSpot]);

    let expired = Credentials::parse(
        r#"{"access_token":"stale","refresh_token":"revoked","expires_in":60,"created_at":1000}"#,
    )
    .unwrap();
    app.store
        .store(Provider::HubSpot, "TestOrg", "TestUser", &expired, Duration::hours(1))
        .unwrap();

    let (status, json) = send_json(
        &app.router,
        form_request("/integrations/hubspot/credentials", &identity()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("Failed to refresh HubSpot token: "));
}
