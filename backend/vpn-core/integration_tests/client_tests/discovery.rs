use crate::client_tests::helpers::{MockVpn, Recorder, Script, register_with_discovery};

use vpn_core::ErrorKind;
use vpn_core::fsm::StateId;

use models::ServerType;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG_ID: &str = "https://idp.example.org";

/// Discovery documents pointing the organization's home and the "nl"
/// location at `vpn`. "de" points elsewhere and is never contacted.
async fn start_discovery(vpn: &MockVpn, expected_fetches: u64) -> MockServer {
    let discovery = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/organization_list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "v": 1,
            "organization_list": [{
                "display_name": { "en": "Example University", "nl": "Voorbeeld Universiteit" },
                "org_id": ORG_ID,
                "secure_internet_home": vpn.base_url(),
                "keyword_list": "example"
            }]
        })))
        .expect(expected_fetches)
        .mount(&discovery)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/server_list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "v": 1,
            "server_list": [
                {
                    "base_url": vpn.base_url(),
                    "country_code": "nl",
                    "server_type": "secure_internet",
                    "public_key_list": []
                },
                {
                    "base_url": "https://de.example.org/",
                    "country_code": "de",
                    "server_type": "secure_internet"
                },
                {
                    "base_url": "https://ia.example.org/",
                    "display_name": "Institute",
                    "server_type": "institute_access"
                }
            ]
        })))
        .mount(&discovery)
        .await;

    discovery
}

/// **VALUE**: Discovery documents are fetched once and served from memory after.
///
/// **WHY THIS MATTERS**: Hosts list organizations on every keystroke of a search
/// box. One download per keystroke would hammer the discovery server.
///
/// **BUG THIS CATCHES**: Would catch the cache being bypassed.
#[tokio::test]
async fn given_fresh_cache_when_listing_organizations_twice_then_single_fetch() {
    // GIVEN
    let vpn = MockVpn::start().await;
    let discovery = start_discovery(&vpn, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register_with_discovery(
        temp_dir.path(),
        Script::approve(vpn.base_url()),
        &recorder,
        Some(format!("{}/v2/", discovery.uri())),
    )
    .await;

    // WHEN
    let first = client.disco_organizations().await.unwrap();
    let second = client.disco_organizations().await.unwrap();

    // THEN
    assert_eq!(first.organization_list.len(), 1);
    assert_eq!(first.version, second.version);
    assert_eq!(
        first.search("voorbeeld").len(),
        1,
        "localized names are searchable"
    );
    assert_eq!(
        client.localized(&first.organization_list[0].display_name),
        "Example University"
    );
    let servers = client.disco_servers().await.unwrap();
    assert_eq!(servers.secure_internet_locations().len(), 2);
}

/// **VALUE**: A secure internet server asks for a location, authorizes against
/// the home server and fetches its config from the chosen location.
///
/// **WHY THIS MATTERS**: Secure internet splits identity (home) from egress
/// (location). Mixing them up sends tokens to the wrong server.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Several locations do not trigger AskLocation
/// - The chosen location is not stored on the server
/// - The expected issuer is the location instead of the home server
#[tokio::test]
async fn given_secure_internet_server_when_getting_config_then_location_asked_and_used() {
    // GIVEN
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let discovery = start_discovery(&vpn, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register_with_discovery(
        temp_dir.path(),
        Script::approve(vpn.base_url()).choosing_location("nl"),
        &recorder,
        Some(format!("{}/v2/", discovery.uri())),
    )
    .await;
    let identity = client.add_secure_internet(ORG_ID).await.unwrap();

    // WHEN
    let config = client.get_config(&identity, false, None).await.unwrap();

    // THEN
    assert!(!config.remotes.is_empty());
    let offered = recorder.offered_locations();
    assert_eq!(offered.len(), 1);
    assert!(offered[0].contains(&String::from("nl")));
    assert!(offered[0].contains(&String::from("de")));
    assert!(recorder.visited().contains(&StateId::AskLocation));
    assert!(recorder.visited().contains(&StateId::ChosenLocation));

    let summary = client.current_server().await.unwrap();
    assert_eq!(summary.kind, ServerType::SecureInternet);
    assert_eq!(summary.location.as_deref(), Some("nl"));
    assert_eq!(summary.base_url, vpn.base_url());
}

#[tokio::test]
async fn given_unknown_organization_when_adding_then_validation_error() {
    let vpn = MockVpn::start().await;
    let discovery = start_discovery(&vpn, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register_with_discovery(
        temp_dir.path(),
        Script::approve(vpn.base_url()),
        &recorder,
        Some(format!("{}/v2/", discovery.uri())),
    )
    .await;

    let error = client
        .add_secure_internet("https://unknown.example.org")
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
    assert!(client.servers().await.is_empty());
}

#[tokio::test]
async fn given_unreachable_discovery_when_listing_then_network_error() {
    let discovery = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register_with_discovery(
        temp_dir.path(),
        Script::approve("http://unused/"),
        &recorder,
        Some(format!("{}/v2/", discovery.uri())),
    )
    .await;

    let error = client.disco_servers().await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Network);
    assert_eq!(error.status_code().map(|code| code.0), Some(404));
}
