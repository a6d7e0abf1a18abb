use crate::{DisplayName, ModelError};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};

pub const OPENVPN_CONTENT_TYPE: &str = "application/x-openvpn-profile";
pub const WIREGUARD_CONTENT_TYPE: &str = "application/x-wireguard-profile";

/// Tunnel protocol of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    OpenVpn,
    WireGuard,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::OpenVpn => "openvpn",
            Protocol::WireGuard => "wireguard",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Protocol::OpenVpn => OPENVPN_CONTENT_TYPE,
            Protocol::WireGuard => WIREGUARD_CONTENT_TYPE,
        }
    }

    /// Maps a `Content-Type` header value (parameters ignored) to a protocol.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let mime = value.split(';').next().unwrap_or_default().trim();
        if mime.eq_ignore_ascii_case(OPENVPN_CONTENT_TYPE) {
            Some(Protocol::OpenVpn)
        } else if mime.eq_ignore_ascii_case(WIREGUARD_CONTENT_TYPE) {
            Some(Protocol::WireGuard)
        } else {
            None
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}

/// One VPN profile as listed by `<api>/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub profile_id: String,
    pub display_name: DisplayName,
    /// Raw protocol names; unknown entries are kept but never negotiated.
    #[serde(default)]
    pub vpn_proto_list: Vec<String>,
    #[serde(default)]
    pub default_gateway: bool,
}

impl Profile {
    pub fn supports(&self, protocol: Protocol) -> bool {
        self.vpn_proto_list
            .iter()
            .any(|name| name.eq_ignore_ascii_case(protocol.as_str()))
    }

    /// Profiles from servers that predate `vpn_proto_list` only speak OpenVPN.
    pub fn protocols(&self) -> Vec<Protocol> {
        if self.vpn_proto_list.is_empty() {
            return vec![Protocol::OpenVpn];
        }
        [Protocol::OpenVpn, Protocol::WireGuard]
            .into_iter()
            .filter(|protocol| self.supports(*protocol))
            .collect()
    }
}

/// Profiles of a server plus the selected one.
///
/// `current`, once set, should name an entry of `list`. Stale ids are
/// corrected by [`ProfileList::reconcile`] after every refresh of `list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileList {
    #[serde(default)]
    pub list: Vec<Profile>,
    #[serde(default)]
    pub current: Option<String>,
}

impl ProfileList {
    pub fn get(&self, profile_id: &str) -> Option<&Profile> {
        self.list.iter().find(|profile| profile.profile_id == profile_id)
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    /// Replaces the fetched list and reconciles the selection against it.
    ///
    /// Returns `true` when a stale selection was replaced.
    pub fn replace(&mut self, list: Vec<Profile>) -> bool {
        self.list = list;
        self.reconcile()
    }

    /// A selected id that is not in `list` silently becomes the first profile.
    pub fn reconcile(&mut self) -> bool {
        let Some(current) = self.current.as_deref() else {
            return false;
        };
        if self.get(current).is_some() {
            return false;
        }
        self.current = self.list.first().map(|profile| profile.profile_id.clone());
        true
    }

    /// Stores a selection. The id must be known once a list has been fetched.
    #[track_caller]
    pub fn select(&mut self, profile_id: impl Into<String>) -> Result<(), ModelError> {
        let profile_id = profile_id.into();
        if profile_id.is_empty() {
            return Err(ModelError::validation("Profile id cannot be empty"));
        }
        if !self.list.is_empty() && self.get(&profile_id).is_none() {
            return Err(ModelError::validation(format!(
                "Unknown profile id: {profile_id}"
            )));
        }
        self.current = Some(profile_id);
        Ok(())
    }

    /// Stores an id without checking it against the list.
    pub fn set_unchecked(&mut self, profile_id: impl Into<String>) {
        self.current = Some(profile_id.into());
    }

    pub fn supported_protocols(&self) -> Vec<Protocol> {
        let mut protocols = Vec::new();
        for protocol in self.list.iter().flat_map(Profile::protocols) {
            if !protocols.contains(&protocol) {
                protocols.push(protocol);
            }
        }
        protocols
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
