use crate::{DisplayName, Profile, ProfileList, Protocol};

fn profile(id: &str, protocols: &[&str]) -> Profile {
    Profile {
        profile_id: id.to_string(),
        display_name: DisplayName::Plain(id.to_uppercase()),
        vpn_proto_list: protocols.iter().map(|p| p.to_string()).collect(),
        default_gateway: true,
    }
}

/// **VALUE**: Verifies that a stored profile id the server no longer offers is replaced.
///
/// **WHY THIS MATTERS**: Servers rename and remove profiles. A persisted selection that
/// points nowhere would make every connect call fail until the user intervenes.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Reconciliation stops running after a list refresh
/// - The fallback picks something other than the first profile
#[test]
fn given_stale_current_profile_when_list_replaced_then_first_profile_selected() {
    // GIVEN: A selection that does not exist on the server
    let mut profiles = ProfileList::default();
    profiles.set_unchecked("IDONOTEXIST");

    // WHEN: The fetched list arrives
    let corrected = profiles.replace(vec![
        profile("employees", &["openvpn"]),
        profile("guests", &["wireguard"]),
    ]);

    // THEN: Selection falls back to the first profile
    assert!(corrected);
    assert_eq!(profiles.current.as_deref(), Some("employees"));
}

#[test]
fn given_valid_current_profile_when_list_replaced_then_selection_kept() {
    let mut profiles = ProfileList::default();
    profiles.set_unchecked("guests");

    let corrected = profiles.replace(vec![
        profile("employees", &["openvpn"]),
        profile("guests", &["wireguard"]),
    ]);

    assert!(!corrected);
    assert_eq!(profiles.current_profile().unwrap().profile_id, "guests");
}

#[test]
fn given_no_selection_when_reconciling_then_nothing_chosen() {
    // GIVEN: Two profiles and no choice yet
    let mut profiles = ProfileList::default();

    // WHEN
    let corrected = profiles.replace(vec![profile("a", &[]), profile("b", &[])]);

    // THEN: The choice is left to the user
    assert!(!corrected);
    assert!(profiles.current.is_none());
}

#[test]
fn given_unknown_id_when_selecting_against_fetched_list_then_rejected() {
    let mut profiles = ProfileList::default();
    profiles.replace(vec![profile("a", &["openvpn"])]);

    let error = profiles.select("b").unwrap_err();

    assert_eq!(error.message(), "Unknown profile id: b");
    assert!(profiles.current.is_none());
}

#[test]
fn given_mixed_profiles_when_listing_protocols_then_union_without_duplicates() {
    let profiles = ProfileList {
        list: vec![
            profile("a", &["openvpn"]),
            profile("b", &["wireguard", "openvpn"]),
            profile("legacy", &[]),
        ],
        current: None,
    };

    assert_eq!(
        profiles.supported_protocols(),
        vec![Protocol::OpenVpn, Protocol::WireGuard]
    );
    assert_eq!(profiles.get("legacy").unwrap().protocols(), vec![Protocol::OpenVpn]);
}

#[test]
fn given_content_type_with_parameters_when_mapping_then_protocol_found() {
    assert_eq!(
        Protocol::from_content_type("application/x-wireguard-profile; charset=utf-8"),
        Some(Protocol::WireGuard)
    );
    assert_eq!(Protocol::from_content_type("text/plain"), None);
}
