use crate::ServerType;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FALLBACK_LOCALES: [&str; 2] = ["en-US", "en"];

/// Display name that is either a plain string or a locale map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayName {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl DisplayName {
    /// Picks the best translation for `locale`: exact tag, then language
    /// prefix, then English, then whatever comes first.
    pub fn localized(&self, locale: &str) -> &str {
        let map = match self {
            DisplayName::Plain(name) => return name,
            DisplayName::Localized(map) => map,
        };

        if let Some(name) = map.get(locale) {
            return name;
        }

        let language = locale.split(['-', '_']).next().unwrap_or(locale);
        if let Some((_, name)) = map
            .iter()
            .find(|(tag, _)| tag.split(['-', '_']).next() == Some(language))
        {
            return name;
        }

        FALLBACK_LOCALES
            .iter()
            .find_map(|tag| map.get(*tag))
            .or_else(|| map.values().next())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Case-insensitive search over every translation.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        match self {
            DisplayName::Plain(name) => name.to_lowercase().contains(&needle),
            DisplayName::Localized(map) => map
                .values()
                .any(|name| name.to_lowercase().contains(&needle)),
        }
    }
}

impl Default for DisplayName {
    fn default() -> Self {
        DisplayName::Plain(String::new())
    }
}

/// Entry of `organization_list.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub display_name: DisplayName,
    pub org_id: String,
    pub secure_internet_home: String,
    #[serde(default)]
    pub keyword_list: Option<DisplayName>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationList {
    #[serde(rename = "v")]
    pub version: u64,
    #[serde(default)]
    pub organization_list: Vec<Organization>,
    /// Unix seconds of the fetch that produced this copy. Not part of the document.
    #[serde(skip)]
    pub fetched_at: u64,
}

impl OrganizationList {
    pub fn find(&self, org_id: &str) -> Option<&Organization> {
        self.organization_list
            .iter()
            .find(|organization| organization.org_id == org_id)
    }

    pub fn search(&self, needle: &str) -> Vec<&Organization> {
        self.organization_list
            .iter()
            .filter(|organization| {
                organization.display_name.matches(needle)
                    || organization
                        .keyword_list
                        .as_ref()
                        .is_some_and(|keywords| keywords.matches(needle))
            })
            .collect()
    }
}

/// Entry of `server_list.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryServer {
    #[serde(default)]
    pub authentication_url_template: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub display_name: Option<DisplayName>,
    #[serde(default)]
    pub public_key_list: Vec<String>,
    pub server_type: ServerType,
    #[serde(default)]
    pub support_contact: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerList {
    #[serde(rename = "v")]
    pub version: u64,
    #[serde(default)]
    pub server_list: Vec<DiscoveryServer>,
    #[serde(skip)]
    pub fetched_at: u64,
}

impl ServerList {
    pub fn by_base_url(&self, base_url: &str) -> Option<&DiscoveryServer> {
        let wanted = base_url.trim_end_matches('/');
        self.server_list
            .iter()
            .find(|server| server.base_url.trim_end_matches('/') == wanted)
    }

    pub fn by_country(&self, country_code: &str) -> Option<&DiscoveryServer> {
        self.server_list.iter().find(|server| {
            server.server_type == ServerType::SecureInternet
                && server
                    .country_code
                    .as_deref()
                    .is_some_and(|code| code.eq_ignore_ascii_case(country_code))
        })
    }

    /// Country codes of every secure internet server, in document order.
    pub fn secure_internet_locations(&self) -> Vec<String> {
        self.server_list
            .iter()
            .filter(|server| server.server_type == ServerType::SecureInternet)
            .filter_map(|server| server.country_code.clone())
            .collect()
    }
}
