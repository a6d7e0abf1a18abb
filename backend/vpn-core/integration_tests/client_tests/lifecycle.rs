use crate::client_tests::helpers::{
    APP_ID, MockVpn, Recorder, Script, register, token_set,
};

use vpn_core::config::{PersistedState, state_file};
use vpn_core::fsm::{StateData, StateId};
use vpn_core::{Client, ErrorKind};

use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

/// **VALUE**: The host cannot jump to Connected without a configuration.
///
/// **WHY THIS MATTERS**: The state machine is the only guard against the host
/// UI and the core drifting apart.
///
/// **BUG THIS CATCHES**: Would catch illegal transitions being applied, or the
/// callback firing for them.
#[tokio::test]
async fn given_no_server_when_reporting_connected_then_state_error_and_state_kept() {
    // GIVEN
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve("http://unused/"), &recorder).await;

    // WHEN
    let error = client.set_connecting().await.unwrap_err();

    // THEN
    assert_eq!(error.kind(), ErrorKind::State);
    assert_eq!(
        error.message(),
        "invalid transition from No_Server to Connecting"
    );
    assert_eq!(client.current_state().await, StateId::NoServer);
    assert_eq!(recorder.transitions().len(), 1);
}

#[tokio::test]
async fn given_config_when_tunnel_goes_up_and_down_then_back_in_got_config() {
    // GIVEN
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();
    client
        .get_config(&identity, false, Some(token_set("access-0", &vpn.base_url())))
        .await
        .unwrap();

    // WHEN
    client.set_connecting().await.unwrap();
    client.set_connected().await.unwrap();
    client.set_disconnecting().await.unwrap();
    client.set_disconnected().await.unwrap();

    // THEN
    assert_eq!(client.current_state().await, StateId::GotConfig);
    assert_eq!(
        recorder.visited()[recorder.visited().len() - 4..],
        [
            StateId::Connecting,
            StateId::Connected,
            StateId::Disconnecting,
            StateId::GotConfig
        ]
    );
}

/// **VALUE**: Cleanup tells the portal the session is over, with the stored token.
///
/// **WHY THIS MATTERS**: Portals limit concurrent sessions per user. Sessions
/// that are never closed lock users out.
///
/// **BUG THIS CATCHES**: Would catch the disconnect call missing its bearer token.
#[tokio::test]
async fn given_authorized_server_when_cleaning_up_then_disconnect_posted() {
    // GIVEN
    let vpn = MockVpn::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/disconnect"))
        .and(header("authorization", "Bearer access-0"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&vpn.server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();
    vpn.mount_single_profile().await;
    client
        .get_config(&identity, false, Some(token_set("access-0", &vpn.base_url())))
        .await
        .unwrap();

    // WHEN/THEN
    client.cleanup(&identity).await.unwrap();
}

#[tokio::test]
async fn given_server_without_token_when_cleaning_up_then_nothing_sent() {
    let vpn = MockVpn::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/disconnect"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&vpn.server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    client.cleanup(&identity).await.unwrap();
}

/// **VALUE**: Servers, tokens and the chosen profile survive deregistering and
/// registering again.
///
/// **WHY THIS MATTERS**: Users expect to reconnect after a restart without
/// opening the browser.
///
/// **BUG THIS CATCHES**: Would catch state not being written on deregister, or
/// not restored on register.
#[tokio::test]
async fn given_config_obtained_when_registering_again_then_server_and_token_restored() {
    // GIVEN
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();
    client.get_config(&identity, false, None).await.unwrap();

    // WHEN
    client.deregister().await.unwrap();
    let restored = register(temp_dir.path(), Script::approve(vpn.base_url()), &Recorder::default()).await;

    // THEN
    let stored = PersistedState::load(temp_dir.path(), APP_ID).unwrap();
    assert_eq!(stored.current.as_deref(), Some(identity.as_str()));
    assert!(state_file(temp_dir.path(), APP_ID).exists());

    let current = restored.current_server().await.unwrap();
    assert_eq!(current.identity, identity);
    assert_eq!(current.current_profile.as_deref(), Some("internet"));
    let token = restored.token(&identity).await.unwrap().unwrap();
    assert_eq!(token.access.expose(), "access-1");
}

#[tokio::test]
async fn given_deregistered_client_when_calling_then_state_error() {
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve("http://unused/"), &recorder).await;

    client.deregister().await.unwrap();
    let error = client
        .add_custom_server("https://vpn.example.org")
        .await
        .unwrap_err();

    assert!(!client.is_registered());
    assert_eq!(error.kind(), ErrorKind::State);
    assert_eq!(error.message(), "client is not registered");
}

#[tokio::test]
async fn given_invalid_settings_when_registering_then_validation_error() {
    let temp_dir = TempDir::new().unwrap();
    let settings = vpn_core::ClientSettings::new("", temp_dir.path());

    let result = Client::register_with(settings, Box::new(|_: StateId, _: StateId, _: &StateData| true)).await;

    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Validation));
}

#[tokio::test]
async fn given_corrupt_state_file_when_registering_then_starts_empty() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(state_file(temp_dir.path(), APP_ID), "{ broken").unwrap();
    let recorder = Recorder::default();

    let client = register(temp_dir.path(), Script::approve("http://unused/"), &recorder).await;

    assert!(client.servers().await.is_empty());
    assert_eq!(client.current_state().await, StateId::NoServer);
}

#[tokio::test]
async fn given_servers_when_removing_then_listed_servers_shrink() {
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve("http://unused/"), &recorder).await;
    let first = client.add_custom_server("https://a.example.org").await.unwrap();
    client
        .add_institute_access("https://b.example.org/")
        .await
        .unwrap();

    client.remove_server(&first).await.unwrap();

    let servers = client.servers().await;
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].identity, "https://b.example.org/");
    assert_eq!(
        client.remove_server(&first).await.unwrap_err().kind(),
        ErrorKind::State
    );
}

/// **VALUE**: Going back with nothing pending returns to NoServer.
///
/// **WHY THIS MATTERS**: The host's back button must work from GotConfig.
///
/// **BUG THIS CATCHES**: Would catch go_back being a no-op without a pending wait.
#[tokio::test]
async fn given_got_config_when_going_back_then_no_server() {
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();
    client
        .get_config(&identity, false, Some(token_set("access-0", &vpn.base_url())))
        .await
        .unwrap();

    client.go_back().await.unwrap();

    assert_eq!(client.current_state().await, StateId::NoServer);
}
