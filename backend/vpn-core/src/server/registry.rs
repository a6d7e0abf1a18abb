use super::Server;
use crate::error::ServerError;

use models::ServerType;

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;
use url::Url;

pub type SharedServer = Arc<Mutex<Server>>;

/// Parses an absolute http(s) URL and makes sure its path ends with `/`.
#[track_caller]
pub fn normalize_url(raw: &str) -> Result<Url, ServerError> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed)
        .map_err(|e| ServerError::invalid_url(format!("invalid server URL '{trimmed}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ServerError::invalid_url(format!(
            "server URL must be absolute http(s): '{trimmed}'"
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Servers keyed by identity, in insertion order, plus the current one.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: HashMap<String, SharedServer>,
    order: Vec<String>,
    current: Option<String>,
}

impl ServerRegistry {
    /// Inserts `server` unless its identity is present. Returns the identity.
    pub fn insert(&mut self, server: Server) -> String {
        let identity = server.identity.clone();
        if !self.servers.contains_key(&identity) {
            info!("Adding {} server {identity}", server.kind);
            self.order.push(identity.clone());
            self.servers
                .insert(identity.clone(), Arc::new(Mutex::new(server)));
        }
        identity
    }

    pub fn add_custom(&mut self, url: &str) -> Result<String, ServerError> {
        self.add_by_url(url, ServerType::Custom)
    }

    pub fn add_institute_access(&mut self, url: &str) -> Result<String, ServerError> {
        self.add_by_url(url, ServerType::InstituteAccess)
    }

    pub fn add_secure_internet(&mut self, org_id: &str, home_url: &str) -> Result<String, ServerError> {
        if org_id.trim().is_empty() {
            return Err(ServerError::invalid_url("organization id cannot be empty"));
        }
        let home = normalize_url(home_url)?;
        Ok(self.insert(Server::new(org_id.trim(), ServerType::SecureInternet, home)))
    }

    fn add_by_url(&mut self, url: &str, kind: ServerType) -> Result<String, ServerError> {
        let url = normalize_url(url)?;
        Ok(self.insert(Server::new(url.to_string(), kind, url)))
    }

    /// The stored key for `identity`. URLs are compared normalized, anything
    /// else (organization ids) as given.
    fn key(&self, identity: &str) -> Option<String> {
        if self.servers.contains_key(identity) {
            return Some(identity.to_string());
        }
        let normalized = normalize_url(identity).ok()?;
        self.servers
            .contains_key(normalized.as_str())
            .then(|| normalized.to_string())
    }

    pub fn remove(&mut self, identity: &str) -> Option<SharedServer> {
        let key = self.key(identity)?;
        let removed = self.servers.remove(&key)?;
        self.order.retain(|id| *id != key);
        if self.current.as_deref() == Some(key.as_str()) {
            self.current = None;
        }
        info!("Removed server {key}");
        Some(removed)
    }

    pub fn get(&self, identity: &str) -> Option<SharedServer> {
        let key = self.key(identity)?;
        self.servers.get(&key).cloned()
    }

    /// Makes `identity` current. Returns the stored identity.
    #[track_caller]
    pub fn set_current(&mut self, identity: &str) -> Result<String, ServerError> {
        let Some(key) = self.key(identity) else {
            return Err(ServerError::not_found(identity));
        };
        self.current = Some(key.clone());
        Ok(key)
    }

    pub fn current_identity(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<SharedServer> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    pub fn identities(&self) -> &[String] {
        &self.order
    }

    /// Servers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = SharedServer> + '_ {
        self.order.iter().filter_map(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
