use crate::{ConnectionProfile, ModelError, Protocol, RemoteEndpoint, Transport};

/// **VALUE**: Verifies that the builder refuses an empty configuration text.
///
/// **WHY THIS MATTERS**: The host writes `config` straight into a tunnel file. An empty
/// text would only fail later inside OpenVPN/WireGuard with a far less useful message.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The whitespace check is dropped
/// - Builder accepts a missing config
#[test]
fn given_blank_config_when_building_then_returns_validation_error() {
    // GIVEN: Builder with whitespace-only config
    let builder = ConnectionProfile::builder()
        .with_protocol(Protocol::OpenVpn)
        .with_config("  \n");

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Should return validation error
    match result.unwrap_err() {
        ModelError::Validation { message, .. } => {
            assert_eq!(message, "Config cannot be empty");
        }
    }
}

#[test]
fn given_missing_protocol_when_building_then_returns_validation_error() {
    // GIVEN: Builder without protocol
    let builder = ConnectionProfile::builder().with_config("remote vpn.example 1194 udp");

    // WHEN/THEN
    let error = builder.build().unwrap_err();
    assert_eq!(error.message(), "Protocol is required");
    assert!(error.to_string().starts_with("Validation Error: Protocol is required ["));
}

#[test]
fn given_complete_builder_when_building_then_keeps_remote_order() {
    // GIVEN: Two remotes in config order
    let tcp = RemoteEndpoint {
        host: String::from("vpn.example"),
        port: Some(1194),
        transport: Transport::Tcp,
    };
    let udp = RemoteEndpoint {
        host: String::from("vpn.example"),
        port: Some(1194),
        transport: Transport::Udp,
    };

    // WHEN: Building
    let profile = ConnectionProfile::builder()
        .with_protocol(Protocol::OpenVpn)
        .with_config("remote vpn.example 1194 tcp\nremote vpn.example 1194 udp")
        .with_remote(tcp.clone())
        .with_remote(udp.clone())
        .build()
        .unwrap();

    // THEN: Order and content type are preserved
    assert_eq!(profile.remotes, vec![tcp, udp]);
    assert_eq!(profile.content_type(), "application/x-openvpn-profile");
    assert_eq!(profile.first_remote().unwrap().to_string(), "vpn.example 1194 tcp");
}

#[test]
fn given_openvpn_proto_tokens_when_parsing_transport_then_maps_families() {
    assert_eq!(Transport::parse("tcp4-client"), Some(Transport::Tcp));
    assert_eq!(Transport::parse("TCP"), Some(Transport::Tcp));
    assert_eq!(Transport::parse("udp6"), Some(Transport::Udp));
    assert_eq!(Transport::parse("sctp"), None);
}
