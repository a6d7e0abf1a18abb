use crate::error::ServerError;
use crate::server::registry::{ServerRegistry, normalize_url};

use models::ServerType;

#[test]
fn given_url_without_trailing_slash_when_normalizing_then_slash_added_and_query_dropped() {
    let url = normalize_url("  https://vpn.example.org/portal?x=1#frag ").unwrap();

    assert_eq!(url.as_str(), "https://vpn.example.org/portal/");
}

#[test]
fn given_non_http_or_relative_url_when_normalizing_then_invalid_url() {
    for raw in ["ftp://vpn.example.org/", "vpn.example.org", "", "mailto:someone@example.org"] {
        let result = normalize_url(raw);
        assert!(
            matches!(result, Err(ServerError::InvalidUrl { .. })),
            "{raw} should be rejected"
        );
    }
}

/// **VALUE**: Adding the same server twice keeps one entry.
///
/// **WHY THIS MATTERS**: Hosts re-add servers on every launch. Duplicates would
/// split tokens and profile selections between two entries.
///
/// **BUG THIS CATCHES**: Would catch identity derived from the raw, unnormalized URL.
#[test]
fn given_same_server_with_and_without_slash_when_adding_then_single_entry() {
    // GIVEN
    let mut registry = ServerRegistry::default();

    // WHEN
    let first = registry.add_custom("https://vpn.example.org").unwrap();
    let second = registry.add_custom("https://vpn.example.org/").unwrap();

    // THEN
    assert_eq!(first, second);
    assert_eq!(first, "https://vpn.example.org/");
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn given_servers_when_iterating_then_insertion_order_and_kind_kept() {
    let mut registry = ServerRegistry::default();
    registry.add_institute_access("https://b.example.org/").unwrap();
    registry
        .add_secure_internet("https://idp.example.org", "https://home.example.org")
        .unwrap();

    let mut kinds = Vec::new();
    for server in registry.iter() {
        kinds.push(server.lock().await.kind);
    }

    assert_eq!(kinds, vec![ServerType::InstituteAccess, ServerType::SecureInternet]);
    assert_eq!(
        registry.identities(),
        &["https://b.example.org/".to_string(), "https://idp.example.org".to_string()]
    );
}

#[test]
fn given_current_server_when_removed_then_current_cleared() {
    let mut registry = ServerRegistry::default();
    let identity = registry.add_custom("https://vpn.example.org/").unwrap();
    registry.set_current(&identity).unwrap();

    assert!(registry.remove(&identity).is_some());

    assert!(registry.current_identity().is_none());
    assert!(registry.current().is_none());
    assert!(registry.is_empty());
    assert!(registry.remove(&identity).is_none());
}

#[test]
fn given_unknown_identity_when_setting_current_then_not_found() {
    let mut registry = ServerRegistry::default();

    let error = registry.set_current("https://nowhere.example/").unwrap_err();

    assert!(matches!(error, ServerError::NotFound { .. }));
    assert!(error.message().contains("https://nowhere.example/"));
}

#[test]
fn given_blank_org_id_when_adding_secure_internet_then_rejected() {
    let mut registry = ServerRegistry::default();

    let result = registry.add_secure_internet("  ", "https://home.example.org/");

    assert!(result.is_err());
    assert!(registry.is_empty());
}

/// **VALUE**: A server added by URL is found again by the URL the host typed.
///
/// **WHY THIS MATTERS**: Hosts keep the URL the user entered and pass it back to
/// `get_config` or `remove_server`. The stored identity carries a trailing `/`.
///
/// **BUG THIS CATCHES**: Would catch lookups comparing the raw string with the
/// normalized identity.
#[test]
fn given_server_added_without_slash_when_looking_up_raw_url_then_found() {
    // GIVEN
    let mut registry = ServerRegistry::default();
    let identity = registry.add_custom("https://vpn.example.org").unwrap();
    registry
        .add_secure_internet("https://idp.example.org", "https://home.example.org")
        .unwrap();

    // WHEN
    let current = registry.set_current("https://vpn.example.org").unwrap();

    // THEN
    assert_eq!(current, identity);
    assert!(registry.get("https://vpn.example.org").is_some());
    assert!(registry.get("https://idp.example.org").is_some());
    assert!(registry.get("https://idp.example.org/").is_none());
    assert!(registry.remove("https://vpn.example.org").is_some());
    assert!(registry.current_identity().is_none());
    assert_eq!(registry.len(), 1);
}
