use crate::client_tests::helpers::{
    MockVpn, Recorder, Script, expired_token_set, register, token_set,
};

use vpn_core::fsm::StateId;

use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

/// **VALUE**: A rejected access token whose refresh also fails falls back to
/// the browser once, then the profile list is fetched again.
///
/// **WHY THIS MATTERS**: Revoked refresh tokens are routine after a password
/// change. The user has to log in again, but the flow must still end with a
/// configuration instead of an error.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A failed refresh aborts the flow
/// - The dropped token is reused after re-authorization
/// - The machine skips back to `RequestConfig` before fetching again
#[tokio::test]
async fn given_rejected_token_and_revoked_refresh_when_getting_config_then_browser_runs_again() {
    // GIVEN: "stale-access" is rejected and refreshes fail
    let vpn = MockVpn::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/info"))
        .and(header("authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(1)
        .expect(1)
        .mount(&vpn.server)
        .await;
    vpn.reject_refresh().await;
    vpn.mount_single_profile().await;

    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    // WHEN
    let config = client
        .get_config(&identity, false, Some(token_set("stale-access", &vpn.base_url())))
        .await
        .unwrap();

    // THEN
    assert!(!config.remotes.is_empty());
    assert_eq!(recorder.authorization_urls().len(), 1);
    assert_eq!(
        recorder.visited(),
        vec![
            StateId::NoServer,
            StateId::LoadingServer,
            StateId::ChosenServer,
            StateId::Authorized,
            StateId::RequestConfig,
            StateId::OAuthStarted,
            StateId::Authorized,
            StateId::RequestConfig,
            StateId::ChosenProfile,
            StateId::GotConfig,
        ]
    );
    let stored = client.token(&identity).await.unwrap().unwrap();
    assert_eq!(stored.access.expose(), "access-1");
}

/// **VALUE**: An expired token is refreshed before the first request, without
/// the browser.
///
/// **WHY THIS MATTERS**: Hosts pass the token they stored last session, which is
/// usually expired by the time the user reconnects.
///
/// **BUG THIS CATCHES**: Would catch an expired token being sent as is, or
/// expiry triggering a full browser login.
#[tokio::test]
async fn given_expired_token_when_getting_config_then_refreshed_without_browser() {
    // GIVEN
    let vpn = MockVpn::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/info"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(1)
        .expect(0)
        .mount(&vpn.server)
        .await;
    vpn.mount_single_profile().await;

    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    // WHEN
    client
        .get_config(
            &identity,
            false,
            Some(expired_token_set("old-access", &vpn.base_url())),
        )
        .await
        .unwrap();

    // THEN
    assert!(recorder.authorization_urls().is_empty());
    assert_eq!(
        recorder.visited(),
        vec![
            StateId::NoServer,
            StateId::LoadingServer,
            StateId::ChosenServer,
            StateId::Authorized,
            StateId::RequestConfig,
            StateId::ChosenProfile,
            StateId::GotConfig,
        ]
    );
    let stored = client.token(&identity).await.unwrap().unwrap();
    assert_eq!(stored.access.expose(), "access-1");
    assert_eq!(stored.refresh.expose(), "refresh-1");
}

/// **VALUE**: An expired token whose refresh is rejected is dropped and the
/// browser flow runs.
///
/// **BUG THIS CATCHES**: Would catch a rejected refresh surfacing as an error
/// instead of re-authorizing, or the expired token surviving the fallback.
#[tokio::test]
async fn given_expired_token_and_revoked_refresh_when_getting_config_then_browser_runs() {
    // GIVEN
    let vpn = MockVpn::start().await;
    vpn.reject_refresh().await;
    vpn.mount_single_profile().await;

    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    // WHEN
    client
        .get_config(
            &identity,
            false,
            Some(expired_token_set("old-access", &vpn.base_url())),
        )
        .await
        .unwrap();

    // THEN
    assert_eq!(recorder.authorization_urls().len(), 1);
    assert_eq!(
        recorder.visited(),
        vec![
            StateId::NoServer,
            StateId::LoadingServer,
            StateId::ChosenServer,
            StateId::OAuthStarted,
            StateId::Authorized,
            StateId::RequestConfig,
            StateId::ChosenProfile,
            StateId::GotConfig,
        ]
    );
    let stored = client.token(&identity).await.unwrap().unwrap();
    assert_eq!(stored.access.expose(), "access-1");
}
