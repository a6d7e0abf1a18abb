use crate::config::{PersistedServer, PersistedState, state_file};
use crate::error::ConfigError;
use crate::oauth::token::{OAuthToken, TokenSet};
use crate::ClientSettings;

use common::RedactedToken;
use models::ServerType;

use std::time::Duration;

use tempfile::TempDir;

const APP_ID: &str = "org.example.vpn";

fn stored_server(identity: &str) -> PersistedServer {
    PersistedServer {
        identity: identity.to_string(),
        kind: ServerType::Custom,
        home_url: identity.to_string(),
        base_url: identity.to_string(),
        location: None,
        profile: Some(String::from("employees")),
        token: OAuthToken::new(TokenSet {
            access: RedactedToken::new("access-1"),
            refresh: RedactedToken::new("refresh-1"),
            expires_at: 4_000_000_000,
            issuer: identity.to_string(),
        }),
    }
}

#[test]
fn given_no_state_file_when_loading_then_empty_default() {
    let temp_dir = TempDir::new().unwrap();

    let state = PersistedState::load(temp_dir.path(), APP_ID).unwrap();

    assert_eq!(state, PersistedState::default());
    assert_eq!(state.version, 1);
}

/// **VALUE**: Servers, tokens and selections survive a save/load cycle.
///
/// **WHY THIS MATTERS**: Losing tokens on restart forces users through the
/// browser again on every launch.
///
/// **BUG THIS CATCHES**: Would catch tokens being skipped during serialization,
/// or the temp file never being renamed into place.
#[test]
fn given_state_with_token_when_saved_then_loads_identically() {
    // GIVEN
    let temp_dir = TempDir::new().unwrap();
    let state = PersistedState {
        version: 1,
        servers: vec![stored_server("https://vpn.example.org/")],
        current: Some(String::from("https://vpn.example.org/")),
    };

    // WHEN
    state.save(temp_dir.path(), APP_ID).unwrap();
    let loaded = PersistedState::load(temp_dir.path(), APP_ID).unwrap();

    // THEN
    assert_eq!(loaded, state);
    assert_eq!(loaded.servers[0].token.access(), Some("access-1"));
    assert!(state_file(temp_dir.path(), APP_ID).exists());
    assert!(!temp_dir.path().join(format!("{APP_ID}.json.tmp")).exists());
}

#[test]
fn given_corrupt_state_file_when_loading_then_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(state_file(temp_dir.path(), APP_ID), "{ not json").unwrap();

    let result = PersistedState::load(temp_dir.path(), APP_ID);

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn given_invalid_states_when_validating_then_each_rejected() {
    let server = stored_server("https://vpn.example.org/");

    let future_version = PersistedState {
        version: 2,
        ..PersistedState::default()
    };
    let duplicate = PersistedState {
        servers: vec![server.clone(), server.clone()],
        ..PersistedState::default()
    };
    let dangling_current = PersistedState {
        current: Some(String::from("https://other.example.org/")),
        ..PersistedState::default()
    };
    let bad_url = PersistedState {
        servers: vec![PersistedServer {
            base_url: String::from("ftp://vpn.example.org/"),
            ..server
        }],
        ..PersistedState::default()
    };

    for state in [future_version, duplicate, dangling_current, bad_url] {
        assert!(
            matches!(state.validate(), Err(ConfigError::ValidationError { .. })),
            "{state:?} should be rejected"
        );
    }
}

#[test]
fn given_invalid_state_when_saving_then_nothing_written() {
    let temp_dir = TempDir::new().unwrap();
    let state = PersistedState {
        current: Some(String::from("https://missing.example.org/")),
        ..PersistedState::default()
    };

    assert!(state.save(temp_dir.path(), APP_ID).is_err());
    assert!(!state_file(temp_dir.path(), APP_ID).exists());
}

#[test]
fn given_defaults_when_building_settings_then_valid_with_directory_discovery_url() {
    let settings = ClientSettings::new(APP_ID, "/tmp/vpn")
        .with_discovery_url("https://disco.example.org/v2");

    assert!(settings.validate().is_ok());
    assert_eq!(
        settings.discovery_base().unwrap().as_str(),
        "https://disco.example.org/v2/"
    );
}

#[test]
fn given_bad_settings_when_validating_then_validation_error() {
    let cases = [
        ClientSettings::new("", "/tmp/vpn"),
        ClientSettings::new("org/example", "/tmp/vpn"),
        ClientSettings::new(APP_ID, "/tmp/vpn").with_discovery_url("not a url"),
        ClientSettings::new(APP_ID, "/tmp/vpn").with_discovery_url("file:///etc/"),
        ClientSettings::new(APP_ID, "/tmp/vpn").with_http_timeout(Duration::ZERO),
    ];

    for settings in cases {
        assert!(
            matches!(settings.validate(), Err(ConfigError::ValidationError { .. })),
            "{settings:?} should be rejected"
        );
    }
}

#[test]
fn given_explicit_config_dir_when_resolving_then_used_as_is() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ClientSettings::new(APP_ID, temp_dir.path());

    assert_eq!(settings.resolved_config_dir().unwrap(), temp_dir.path());
}

/// **VALUE**: A bad discovery URL is reported at the line that asked for it.
///
/// **BUG THIS CATCHES**: Would catch the location being taken inside the error
/// closure, which always points into settings.rs.
#[test]
fn given_non_http_discovery_url_when_resolving_base_then_error_located_at_caller() {
    // GIVEN
    let settings = ClientSettings::new(APP_ID, "/tmp/vpn").with_discovery_url("ftp://disco.example.org/");

    // WHEN
    let expected_line = line!() + 1;
    let error = settings.discovery_base().unwrap_err();

    // THEN
    match error {
        ConfigError::ValidationError { location, reason } => {
            assert!(location.file.ends_with("config.rs"), "{}", location.file);
            assert!(location.file.contains("tests"), "{}", location.file);
            assert_eq!(location.line, expected_line);
            assert!(reason.contains("ftp://disco.example.org/"), "{reason}");
        }
        other => panic!("expected ValidationError, got {other:?}"),
    }
}
