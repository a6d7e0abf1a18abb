use crate::client_tests::helpers::{
    MockVpn, Recorder, Script, TokenResponder, register, token_set,
};

use vpn_core::oauth::token::new_cell;
use vpn_core::oauth::{OAuthToken, TokenClient};

use std::time::Duration;

use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// **VALUE**: Refreshing yields a different access token and stores it.
///
/// **WHY THIS MATTERS**: Hosts refresh ahead of expiry so tunnels do not drop
/// on reconnect.
///
/// **BUG THIS CATCHES**: Would catch the refreshed token not replacing the old
/// one in the server's token cell.
#[tokio::test]
async fn given_authorized_server_when_refreshing_then_access_token_changes() {
    // GIVEN: Authorized through the browser, holding access-1
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();
    client.get_config(&identity, false, None).await.unwrap();
    let before = client.token(&identity).await.unwrap().unwrap();

    // WHEN
    let refreshed = client.refresh_token(&identity).await.unwrap();

    // THEN
    assert_ne!(refreshed.access.expose(), before.access.expose());
    assert_eq!(refreshed.access.expose(), "access-2");
    let stored = client.token(&identity).await.unwrap().unwrap();
    assert_eq!(stored.access.expose(), "access-2");
    assert_eq!(stored.issuer, vpn.base_url());
}

/// **VALUE**: A token the portal rejects is refreshed once and the request
/// retried, without opening the browser.
///
/// **WHY THIS MATTERS**: Portals revoke access tokens early. A refresh is
/// invisible to the user; a browser window is not.
///
/// **BUG THIS CATCHES**: Would catch a 401 from `info` going straight to the
/// browser flow, or the retry reusing the rejected token.
#[tokio::test]
async fn given_rejected_access_token_when_getting_config_then_refreshed_and_retried() {
    // GIVEN: The portal rejects "stale-access"
    let vpn = MockVpn::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/info"))
        .and(header("authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(1)
        .expect(1)
        .mount(&vpn.server)
        .await;
    vpn.mount_single_profile().await;

    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    // WHEN
    client
        .get_config(&identity, false, Some(token_set("stale-access", &vpn.base_url())))
        .await
        .unwrap();

    // THEN
    assert!(recorder.authorization_urls().is_empty());
    let stored = client.token(&identity).await.unwrap().unwrap();
    assert_eq!(stored.access.expose(), "access-1");
}

/// **VALUE**: Two refreshes racing on the same rejected token send one request.
///
/// **WHY THIS MATTERS**: Refresh tokens may be single use. A second refresh
/// with an already rotated token would fail and log the user out.
///
/// **BUG THIS CATCHES**: Would catch the token cell lock being released
/// during the request.
#[tokio::test]
async fn given_concurrent_refreshes_when_same_token_rejected_then_single_request() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(TokenResponder::default())
        .expect(1)
        .mount(&server)
        .await;

    let token_url = Url::parse(&format!("{}/oauth/token", server.uri())).unwrap();
    let tokens = TokenClient::new(reqwest::Client::new(), token_url, "test-client");
    let cell = new_cell(OAuthToken::new(token_set("access-0", "https://vpn.example.org/")));

    // WHEN
    let (first, second) = tokio::join!(
        tokens.refresh_cell(&cell, Some("access-0")),
        tokens.refresh_cell(&cell, Some("access-0"))
    );

    // THEN
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.access.expose(), "access-1");
    assert_eq!(second.access.expose(), "access-1");
    assert_eq!(cell.lock().await.access(), Some("access-1"));
}

#[tokio::test]
async fn given_rejected_grant_when_refreshing_then_token_error_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "refresh token expired"
        })))
        .mount(&server)
        .await;

    let token_url = Url::parse(&format!("{}/oauth/token", server.uri())).unwrap();
    let tokens = TokenClient::new(reqwest::Client::new(), token_url, "test-client");
    let cell = new_cell(OAuthToken::new(token_set("access-0", "https://vpn.example.org/")));

    let error = tokio::time::timeout(Duration::from_secs(5), tokens.refresh_cell(&cell, None))
        .await
        .unwrap()
        .unwrap_err();

    assert!(error.is_rejected_grant());
    assert_eq!(error.message(), "invalid_grant: refresh token expired");
    assert_eq!(cell.lock().await.access(), Some("access-0"));
}
