// Integration tests for POST /integrations/:provider/load

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Duration;
use crmhub::api::{create_router, HubAppState, StateManager};
use crmhub::config::OAuthClients;
use crmhub::credentials::CredentialStore;
use crmhub::integrations::airtable::AirtableConnector;
use crmhub::integrations::hubspot::HubSpotConnector;
use crmhub::integrations::notion::NotionConnector;
use crmhub::integrations::{Connector, ConnectorRegistry};
use mockito::Server;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "crmhub-test-boundary";

fn create_test_app(provider_url: &str) -> Router {
    let key = BASE64.encode([0u8; 32]);
    let connectors: Vec<Arc<dyn Connector>> = vec![
        Arc::new(HubSpotConnector::with_base_url(provider_url.to_string())),
        Arc::new(AirtableConnector::with_base_url(provider_url.to_string())),
        Arc::new(NotionConnector::with_base_url(provider_url.to_string())),
    ];

    let state = HubAppState {
        registry: ConnectorRegistry::from_connectors(connectors),
        credential_store: Arc::new(CredentialStore::new(":memory:", &key).unwrap()),
        state_manager: StateManager::new(600),
        oauth_clients: OAuthClients::default(),
        http_client: reqwest::Client::new(),
        callback_base_url: "http://localhost:8000".to_string(),
        credential_ttl: Duration::hours(1),
    };

    create_router(state)
}

fn multipart_body(field: &str, value: &str) -> Body {
    Body::from(format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"\r\n\r\n{v}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = field,
        v = value
    ))
}

fn load_request(provider: &str, credentials: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/integrations/{}/load", provider))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(multipart_body("credentials", credentials))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn mock_hubspot(server: &mut Server, deals_status: usize) -> Vec<mockito::Mock> {
    vec![
        server
            .mock("GET", "/crm/v3/objects/contacts?limit=100")
            .with_status(200)
            .with_body(
                r#"{"results":[{"id":"1","properties":{"firstname":"Ada","lastname":"Lovelace","email":"a@b.com"},"createdAt":"2024-01-02T03:04:05Z","updatedAt":"2024-01-03T03:04:05.5Z"}]}"#,
            )
            .create_async()
            .await,
        server
            .mock("GET", "/crm/v3/objects/companies?limit=100")
            .with_status(200)
            .with_body(r#"{"results":[{"id":"2","properties":{"name":"Acme","domain":"acme.io"}}]}"#)
            .create_async()
            .await,
        server
            .mock("GET", "/crm/v3/objects/deals?limit=100")
            .with_status(deals_status)
            .with_body(if deals_status == 200 {
                r#"{"results":[{"id":"3","properties":{"dealname":"Big","amount":"5000"}}]}"#
            } else {
                r#"{"status":"error","message":"This app hasn't been granted all required scopes to make this call."}"#
            })
            .create_async()
            .await,
    ]
}

#[tokio::test]
async fn test_ping() {
    let app = create_test_app("http://127.0.0.1:1");
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"Ping": "Pong"}));
}

#[tokio::test]
async fn test_hubspot_load_returns_normalized_records() {
    let mut server = Server::new_async().await;
    let _mocks = mock_hubspot(&mut server, 200).await;
    let app = create_test_app(&server.url());

    let (status, json) = send(app, load_request("hubspot", r#"{"access_token":"hs"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0]["id"], "1_contact");
    assert_eq!(records[0]["type"], "contact");
    assert_eq!(records[0]["name"], "Ada Lovelace (a@b.com)");
    assert_eq!(records[0]["email"], "a@b.com");
    assert!(records[0].get("domain").is_none());
    assert!(records[0].get("amount").is_none());
    assert_eq!(records[0]["creation_time"], "2024-01-02T03:04:05Z");

    assert_eq!(records[1]["type"], "company");
    assert_eq!(records[1]["domain"], "acme.io");
    assert!(records[1].get("email").is_none());
    assert_eq!(records[1]["creation_time"], Value::Null);

    assert_eq!(records[2]["type"], "deal");
    assert_eq!(records[2]["amount"], "5000");
}

#[tokio::test]
async fn test_missing_scope_fails_without_partial_results() {
    let mut server = Server::new_async().await;
    let _mocks = mock_hubspot(&mut server, 403).await;
    let app = create_test_app(&server.url());

    let (status, json) = send(app, load_request("hubspot", r#"{"access_token":"hs"}"#)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json.is_object());
    assert!(json["detail"].as_str().unwrap().contains("required scopes"));
}

#[tokio::test]
async fn test_rate_limit_is_bad_gateway() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/search")
        .with_status(429)
        .with_header("Retry-After", "1")
        .with_body(r#"{"object":"error","status":429,"code":"rate_limited","message":"Slow down"}"#)
        .create_async()
        .await;
    let app = create_test_app(&server.url());

    let (status, json) = send(app, load_request("notion", r#"{"access_token":"secret_n"}"#)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["detail"].as_str().unwrap().contains("rate limit"));
}

#[tokio::test]
async fn test_airtable_load_via_urlencoded_form() {
    let mut server = Server::new_async().await;
    let _bases = server
        .mock("GET", "/v0/meta/bases")
        .with_status(200)
        .with_body(r#"{"bases":[{"id":"app1","name":"CRM"}]}"#)
        .create_async()
        .await;
    let _tables = server
        .mock("GET", "/v0/meta/bases/app1/tables")
        .with_status(200)
        .with_body(r#"{"tables":[{"id":"tbl1","name":"Leads"}]}"#)
        .create_async()
        .await;
    let app = create_test_app(&server.url());

    let body = serde_urlencoded::to_string([("credentials", r#"{"access_token":"at"}"#)]).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/integrations/airtable/load")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    let records = json.as_array().unwrap();
    assert_eq!(records[0]["id"], "app1_base");
    assert_eq!(records[1]["id"], "tbl1_table");
    assert_eq!(records[1]["parent_id"], "app1_base");
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let app = create_test_app("http://127.0.0.1:1");

    let (status, json) = send(app, load_request("slack", r#"{"access_token":"x"}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "Integration 'slack' not found");
}

#[tokio::test]
async fn test_invalid_credentials_are_bad_request() {
    let cases = [
        ("not json", "Invalid credentials format"),
        (r#"["access_token"]"#, "Invalid credentials format"),
        (r#"{"refresh_token":"r"}"#, "Invalid credentials: missing access token"),
    ];

    for (credentials, expected) in cases {
        let app = create_test_app("http://127.0.0.1:1");
        let (status, json) = send(app, load_request("hubspot", credentials)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "credentials: {}", credentials);
        assert_eq!(json["detail"], expected);
    }
}

#[tokio::test]
async fn test_missing_credentials_field() {
    let app = create_test_app("http://127.0.0.1:1");
    let request = Request::builder()
        .method("POST")
        .uri("/integrations/notion/load")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(multipart_body("user_id", "TestUser"))
        .unwrap();

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().contains("credentials"));
}

#[tokio::test]
async fn test_expired_blob_is_unauthorized() {
    let app = create_test_app("http://127.0.0.1:1");

    let (status, json) = send(
        app,
        load_request(
            "hubspot",
            r#"{"access_token":"old","expires_in":1800,"created_at":1000}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["detail"].as_str().unwrap().contains("expired"));
}
