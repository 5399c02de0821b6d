//! Google OAuth exchange against a mock HTTP server.

use notekeeper_auth::{AuthError, GoogleConfig, GoogleProvider, IdentityProvider};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> GoogleProvider {
    let config = GoogleConfig::new("client-1", "secret-1", "http://localhost:3000/auth/google/callback")
        .with_base_url(&server.uri());
    GoogleProvider::new(config).expect("Failed to create provider")
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("client_secret=secret-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "at-123",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_exchange_returns_verified_profile() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/userinfo"))
        .and(header("Authorization", "Bearer at-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sub": "10769150350006150715113082367",
            "email": "g@x.com",
            "email_verified": true,
            "name": "G User"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = provider(&server).exchange("auth-code").await.unwrap();

    assert_eq!(profile.provider, "google");
    assert_eq!(profile.email, "g@x.com");
    assert_eq!(profile.subject, "10769150350006150715113082367");
    assert_eq!(profile.name.as_deref(), Some("G User"));
}

#[tokio::test]
async fn test_unverified_email_is_refused() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sub": "1",
            "email": "g@x.com",
            "email_verified": false
        })))
        .mount(&server)
        .await;

    let result = provider(&server).exchange("auth-code").await;
    assert!(matches!(result, Err(AuthError::Provider(_))));
}

#[tokio::test]
async fn test_missing_email_is_refused() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "sub": "1" })))
        .mount(&server)
        .await;

    let result = provider(&server).exchange("auth-code").await;
    assert!(matches!(result, Err(AuthError::Provider(_))));
}

#[tokio::test]
async fn test_rejected_code_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let result = provider(&server).exchange("stale-code").await;
    assert!(matches!(result, Err(AuthError::Provider(_))));
}

#[tokio::test]
async fn test_authorization_url_uses_configured_endpoint() {
    let server = MockServer::start().await;
    let url = provider(&server).authorization_url("state-1");
    assert!(url.starts_with(&format!("{}/o/oauth2/v2/auth?", server.uri())));
    assert!(url.contains("state=state-1"));
}
