use crate::client_tests::helpers::{
    MockVpn, OPENVPN_CONFIG, Recorder, Script, profile, register, token_set, write_state,
};

use vpn_core::ErrorKind;
use vpn_core::fsm::StateId;

use models::{Protocol, Transport};

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

/// **VALUE**: Runs the whole flow against a mock portal: metadata, browser
/// authorization, profile list, connect.
///
/// **WHY THIS MATTERS**: This is the path every first-time user takes. Every
/// module takes part: registry, FSM, OAuth listener, token endpoint, API v3.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The state sequence differs from LoadingServer through GotConfig
/// - The authorization URL misses PKCE parameters
/// - The token is not stored on the server after the exchange
#[tokio::test]
async fn given_new_server_when_getting_config_then_full_flow_reaches_got_config() {
    // GIVEN: A portal with one profile
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    // WHEN
    let config = client.get_config(&identity, false, None).await.unwrap();

    // THEN: Config with remotes, machine in GotConfig
    assert_eq!(config.protocol, Protocol::OpenVpn);
    assert_eq!(config.remotes.len(), 2);
    assert_eq!(client.current_state().await, StateId::GotConfig);
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

    // THEN: PKCE and the loopback redirect are on the authorization URL
    let authorization_url = &recorder.authorization_urls()[0];
    assert!(authorization_url.contains("code_challenge_method=S256"));
    assert!(authorization_url.contains("response_type=code"));
    assert!(authorization_url.contains("scope=config"));
    assert!(authorization_url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A"));

    // THEN: Token stored
    let token = client.token(&identity).await.unwrap().unwrap();
    assert_eq!(token.access.expose(), "access-1");
    assert_eq!(
        client.current_server().await.unwrap().current_profile.as_deref(),
        Some("internet")
    );
}

/// **VALUE**: Verifies `prefer_tcp` reaches the portal and reorders the remotes.
///
/// **WHY THIS MATTERS**: Users on networks that block UDP rely on this switch.
///
/// **BUG THIS CATCHES**: Would catch the flag being dropped on either side.
#[tokio::test]
async fn given_prefer_tcp_when_getting_config_then_tcp_remote_listed_first() {
    // GIVEN
    let vpn = MockVpn::start().await;
    vpn.mount_profiles(json!([profile("internet", "Internet")]))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/connect"))
        .and(body_string_contains("prefer_tcp=yes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(OPENVPN_CONFIG, "application/x-openvpn-profile"),
        )
        .expect(1)
        .mount(&vpn.server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();
    let token = token_set("access-0", &vpn.base_url());

    // WHEN
    let config = client.get_config(&identity, true, Some(token)).await.unwrap();

    // THEN
    assert!(
        config
            .config
            .ends_with("remote eduvpnserver 1194 tcp\nremote eduvpnserver 1194 udp"),
        "{}",
        config.config
    );
    assert_eq!(config.first_remote().unwrap().transport, Transport::Tcp);
    assert!(recorder.authorization_urls().is_empty());
}

#[tokio::test]
async fn given_prefer_udp_when_getting_config_then_udp_remote_listed_first() {
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    let config = client
        .get_config(&identity, false, Some(token_set("access-0", &vpn.base_url())))
        .await
        .unwrap();

    assert!(
        config
            .config
            .ends_with("remote eduvpnserver 1194 udp\nremote eduvpnserver 1194 tcp")
    );
}

/// **VALUE**: A stored profile id the portal no longer offers is replaced by
/// the first offered profile without asking.
///
/// **WHY THIS MATTERS**: Portals rename and remove profiles. A stale choice must
/// not block the connection.
///
/// **BUG THIS CATCHES**: Would catch the stale id being sent to `connect`, or
/// the host being asked although a choice existed.
#[tokio::test]
async fn given_stored_unknown_profile_when_getting_config_then_first_profile_used() {
    // GIVEN: A previous run stored "IDONOTEXIST"
    let vpn = MockVpn::start().await;
    vpn.mount_profiles(json!([
        profile("internet", "Internet"),
        profile("employees", "Employees")
    ]))
    .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/connect"))
        .and(body_string_contains("profile_id=internet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(OPENVPN_CONFIG, "application/x-openvpn-profile"),
        )
        .expect(1)
        .mount(&vpn.server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    write_state(
        temp_dir.path(),
        &vpn.base_url(),
        Some("IDONOTEXIST"),
        Some(token_set("access-0", &vpn.base_url())),
    );
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;

    // WHEN
    client.get_config(&vpn.base_url(), false, None).await.unwrap();

    // THEN
    let profiles = client.profiles(&vpn.base_url()).await.unwrap();
    assert_eq!(profiles.current.as_deref(), Some("internet"));
    assert!(recorder.offered_profiles().is_empty());
}

/// **VALUE**: Several profiles and no stored choice ask the host, and the
/// answer sent through the reply handle is used.
///
/// **WHY THIS MATTERS**: The reply handle is the only way a UI can answer while
/// the flow is blocked.
///
/// **BUG THIS CATCHES**: Would catch the reply being ignored or the flow
/// auto-selecting the first profile.
#[tokio::test]
async fn given_two_profiles_when_host_chooses_then_chosen_profile_connected() {
    // GIVEN
    let vpn = MockVpn::start().await;
    vpn.mount_profiles(json!([
        profile("internet", "Internet"),
        profile("employees", "Employees")
    ]))
    .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/connect"))
        .and(body_string_contains("profile_id=employees"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(OPENVPN_CONFIG, "application/x-openvpn-profile"),
        )
        .expect(1)
        .mount(&vpn.server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let script = Script::approve(vpn.base_url()).choosing_profile("employees");
    let client = register(temp_dir.path(), script, &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    // WHEN
    client
        .get_config(&identity, false, Some(token_set("access-0", &vpn.base_url())))
        .await
        .unwrap();

    // THEN
    assert_eq!(
        recorder.offered_profiles(),
        vec![vec![String::from("internet"), String::from("employees")]]
    );
    assert!(recorder.visited().contains(&StateId::AskProfile));
    assert_eq!(
        client.profiles(&identity).await.unwrap().current.as_deref(),
        Some("employees")
    );
}

#[tokio::test]
async fn given_portal_without_profiles_when_getting_config_then_protocol_error_and_no_server() {
    let vpn = MockVpn::start().await;
    vpn.mount_profiles(json!([])).await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    let error = client
        .get_config(&identity, false, Some(token_set("access-0", &vpn.base_url())))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Protocol);
    assert_eq!(client.current_state().await, StateId::NoServer);
    assert_eq!(recorder.errors().len(), 1);
}

/// **VALUE**: The URL the host added a server with is enough to fetch its
/// configuration and remove it again.
///
/// **WHY THIS MATTERS**: Hosts keep what the user typed, usually without a
/// trailing slash, and never look at the normalized identity.
///
/// **BUG THIS CATCHES**: Would catch lookups by the raw string failing with
/// "no server with identity".
#[tokio::test]
async fn given_server_added_without_slash_when_getting_config_by_same_url_then_config_returned() {
    // GIVEN
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve(vpn.base_url()), &recorder).await;
    let raw_url = vpn.server.uri();
    assert!(!raw_url.ends_with('/'));
    client.add_custom_server(&raw_url).await.unwrap();

    // WHEN
    let config = client.get_config(&raw_url, false, None).await.unwrap();

    // THEN
    assert!(!config.remotes.is_empty());
    assert_eq!(client.current_server().await.unwrap().identity, vpn.base_url());
    assert!(client.token(&raw_url).await.unwrap().is_some());
    assert_eq!(client.profiles(&raw_url).await.unwrap().current.as_deref(), Some("internet"));
    client.remove_server(&raw_url).await.unwrap();
    assert!(client.servers().await.is_empty());
}
