pub mod builder;

use crate::Protocol;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    /// Parses OpenVPN proto tokens (`udp`, `udp6`, `tcp`, `tcp4-client`, ...).
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.to_ascii_lowercase();
        if token.starts_with("tcp") {
            Some(Transport::Tcp)
        } else if token.starts_with("udp") {
            Some(Transport::Udp)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
        }
    }
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}

/// A `remote` (OpenVPN) or `Endpoint` (WireGuard) entry of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub host: String,
    pub port: Option<u16>,
    pub transport: Transport,
}

impl Display for RemoteEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self.port {
            Some(port) => write!(f, "{} {} {}", self.host, port, self.transport),
            None => write!(f, "{} {}", self.host, self.transport),
        }
    }
}

/// Tunnel configuration handed to the host.
///
/// `remotes` lists the endpoints in the order they appear in `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub protocol: Protocol,
    pub config: String,
    pub remotes: Vec<RemoteEndpoint>,
}

impl ConnectionProfile {
    pub fn builder() -> builder::ConnectionProfileBuilder {
        builder::ConnectionProfileBuilder::default()
    }

    pub fn content_type(&self) -> &'static str {
        self.protocol.content_type()
    }

    pub fn first_remote(&self) -> Option<&RemoteEndpoint> {
        self.remotes.first()
    }
}
