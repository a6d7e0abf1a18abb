use crate::transport::{order_for, order_remotes, parse_remote, wireguard_endpoints};

use models::{Protocol, Transport};

const CONFIG: &str = "client\ndev tun\nremote-random\nremote eduvpnserver 1194 udp\nremote eduvpnserver 1194 tcp\nverb 3\n\n";

/// **VALUE**: Verifies TCP-first ordering produces the exact trailing lines the client expects.
///
/// **WHY THIS MATTERS**: On networks that block UDP, OpenVPN would otherwise burn its
/// connect timeout on every UDP remote before trying TCP.
///
/// **BUG THIS CATCHES**: Would catch an unstable sort or remotes moved out of their slots.
#[test]
fn given_prefer_tcp_when_ordering_then_tcp_remote_first_in_same_slots() {
    // GIVEN: UDP listed before TCP

    // WHEN
    let (config, remotes) = order_remotes(CONFIG, Transport::Tcp);

    // THEN
    assert_eq!(
        config,
        "client\ndev tun\nremote-random\nremote eduvpnserver 1194 tcp\nremote eduvpnserver 1194 udp\nverb 3"
    );
    assert_eq!(remotes[0].transport, Transport::Tcp);
    assert_eq!(remotes[1].transport, Transport::Udp);
}

#[test]
fn given_prefer_udp_when_ordering_then_udp_remote_first() {
    let (config, _) = order_for(
        Protocol::OpenVpn,
        "remote eduvpnserver 1194 tcp\nremote eduvpnserver 1194 udp",
        false,
    );

    assert!(config.ends_with("remote eduvpnserver 1194 udp\nremote eduvpnserver 1194 tcp"));
}

#[test]
fn given_mixed_remotes_when_ordering_then_partition_is_stable() {
    let config = "remote a 1 udp\nremote b 2 tcp\nremote c 3 udp\nremote d 4 tcp";

    let (ordered, remotes) = order_remotes(config, Transport::Tcp);

    assert_eq!(ordered, "remote b 2 tcp\nremote d 4 tcp\nremote a 1 udp\nremote c 3 udp");
    let hosts: Vec<_> = remotes.iter().map(|r| r.host.as_str()).collect();
    assert_eq!(hosts, vec!["b", "d", "a", "c"]);
}

#[test]
fn given_remote_without_proto_when_parsing_then_config_default_applies() {
    let (_, remotes) = order_remotes("proto tcp-client\nremote host.example 443", Transport::Udp);

    assert_eq!(remotes.len(), 1);
    assert_eq!(remotes[0].transport, Transport::Tcp);
    assert_eq!(remotes[0].port, Some(443));
    assert!(parse_remote("remote-cert-tls server", Transport::Udp).is_none());
}

#[test]
fn given_wireguard_config_when_ordering_then_endpoint_reported_as_udp() {
    // GIVEN
    let config = "[Interface]\nAddress = 10.0.0.2/24\n\n[Peer]\nEndpoint = vpn.example.org:51820\n";

    // WHEN
    let (text, remotes) = order_for(Protocol::WireGuard, config, true);

    // THEN
    assert!(text.ends_with("Endpoint = vpn.example.org:51820"));
    assert_eq!(remotes.len(), 1);
    assert_eq!(remotes[0].host, "vpn.example.org");
    assert_eq!(remotes[0].port, Some(51820));
    assert_eq!(remotes[0].transport, Transport::Udp);
}

#[test]
fn given_ipv6_endpoint_when_parsing_then_brackets_stripped() {
    let remotes = wireguard_endpoints("Endpoint = [2001:db8::1]:51820");

    assert_eq!(remotes[0].host, "2001:db8::1");
    assert_eq!(remotes[0].port, Some(51820));
}

/// **VALUE**: Every WireGuard peer endpoint is reported, in config order.
///
/// **BUG THIS CATCHES**: Would catch the remote list being cut to the first peer
/// while the text still carries the others.
#[test]
fn given_wireguard_config_with_two_peers_when_ordering_then_all_endpoints_reported() {
    // GIVEN
    let config = "[Interface]\nAddress = 10.0.0.2/24\n\n[Peer]\nEndpoint = a.example.org:51820\n\n[Peer]\nEndpoint = b.example.org:51821\n";

    // WHEN
    let (_, remotes) = order_for(Protocol::WireGuard, config, false);

    // THEN
    let hosts: Vec<&str> = remotes.iter().map(|remote| remote.host.as_str()).collect();
    assert_eq!(hosts, vec!["a.example.org", "b.example.org"]);
    assert_eq!(remotes[1].port, Some(51821));
}
