//! Orders the transport candidates embedded in a configuration text.
//!
//! OpenVPN configs list `remote <host> [port] [proto]` lines; the client tries
//! them top to bottom. Reordering moves the preferred transport first while
//! keeping every other line where it was.

use models::{Protocol, RemoteEndpoint, Transport};

use std::sync::OnceLock;

use regex::Regex;

const REMOTE_LINE_PATTERN: &str = r"^\s*remote\s+(\S+)(?:\s+(\d+))?(?:\s+(\S+))?\s*$";
const PROTO_LINE_PATTERN: &str = r"(?m)^\s*proto\s+(\S+)\s*$";
const ENDPOINT_LINE_PATTERN: &str = r"(?i)^\s*Endpoint\s*=\s*(\S+)\s*$";

static REMOTE_LINE: OnceLock<Regex> = OnceLock::new();
static PROTO_LINE: OnceLock<Regex> = OnceLock::new();
static ENDPOINT_LINE: OnceLock<Regex> = OnceLock::new();

fn remote_line() -> &'static Regex {
    REMOTE_LINE.get_or_init(|| Regex::new(REMOTE_LINE_PATTERN).expect("valid regex pattern"))
}

fn proto_line() -> &'static Regex {
    PROTO_LINE.get_or_init(|| Regex::new(PROTO_LINE_PATTERN).expect("valid regex pattern"))
}

fn endpoint_line() -> &'static Regex {
    ENDPOINT_LINE.get_or_init(|| Regex::new(ENDPOINT_LINE_PATTERN).expect("valid regex pattern"))
}

/// Parses one `remote` line. Without an explicit proto the config-wide
/// `default` applies.
pub fn parse_remote(line: &str, default: Transport) -> Option<RemoteEndpoint> {
    let captures = remote_line().captures(line)?;
    let host = captures.get(1)?.as_str().to_string();
    let port = captures.get(2).and_then(|m| m.as_str().parse().ok());
    let transport = match captures.get(3) {
        Some(proto) => Transport::parse(proto.as_str())?,
        None => default,
    };
    Some(RemoteEndpoint {
        host,
        port,
        transport,
    })
}

/// Transport of a `proto` directive, UDP when absent.
pub fn default_transport(config: &str) -> Transport {
    proto_line()
        .captures(config)
        .and_then(|captures| captures.get(1))
        .and_then(|proto| Transport::parse(proto.as_str()))
        .unwrap_or(Transport::Udp)
}

/// Stably partitions `remote` lines so `preferred` ones come first, writing
/// them back into the slots remote lines occupied. Trailing whitespace of the
/// text is trimmed. Returns the text and the remotes in their new order.
pub fn order_remotes(config: &str, preferred: Transport) -> (String, Vec<RemoteEndpoint>) {
    let default = default_transport(config);
    let mut lines: Vec<&str> = config.trim_end().split('\n').collect();

    let mut slots = Vec::new();
    let mut remotes = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if let Some(remote) = parse_remote(line.trim_end_matches('\r'), default) {
            slots.push(index);
            remotes.push((*line, remote));
        }
    }

    let (first, rest): (Vec<_>, Vec<_>) = remotes
        .into_iter()
        .partition(|(_, remote)| remote.transport == preferred);

    let mut ordered = Vec::with_capacity(slots.len());
    for (slot, (line, remote)) in slots.into_iter().zip(first.into_iter().chain(rest)) {
        lines[slot] = line;
        ordered.push(remote);
    }

    (lines.join("\n"), ordered)
}

/// WireGuard `Endpoint = host:port` entries. Always UDP.
pub fn wireguard_endpoints(config: &str) -> Vec<RemoteEndpoint> {
    config
        .lines()
        .filter_map(|line| endpoint_line().captures(line))
        .filter_map(|captures| captures.get(1))
        .filter_map(|value| split_host_port(value.as_str()))
        .map(|(host, port)| RemoteEndpoint {
            host,
            port,
            transport: Transport::Udp,
        })
        .collect()
}

fn split_host_port(value: &str) -> Option<(String, Option<u16>)> {
    if let Some(rest) = value.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':').and_then(|port| port.parse().ok());
        return Some((host.to_string(), port));
    }
    match value.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => {
            Some((host.to_string(), port.parse().ok()))
        }
        _ => Some((value.to_string(), None)),
    }
}

/// Orders a configuration of either protocol for `prefer_tcp`.
pub fn order_for(protocol: Protocol, config: &str, prefer_tcp: bool) -> (String, Vec<RemoteEndpoint>) {
    match protocol {
        Protocol::OpenVpn => {
            let preferred = if prefer_tcp { Transport::Tcp } else { Transport::Udp };
            order_remotes(config, preferred)
        }
        Protocol::WireGuard => {
            let config = config.trim_end().to_string();
            let endpoints = wireguard_endpoints(&config);
            (config, endpoints)
        }
    }
}
