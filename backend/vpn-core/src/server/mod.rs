pub mod api;
pub mod endpoints;
pub mod registry;

pub use endpoints::Endpoints;
pub use registry::{ServerRegistry, normalize_url};

use crate::error::{OAuthError, ServerError};
use crate::oauth::token::{OAuthToken, TokenCell, new_cell};

use models::{ProfileList, ServerType};

use std::sync::Arc;

use log::debug;
use reqwest::Client;
use serde::Serialize;
use url::Url;

/// The server a configuration is fetched from, with its metadata and profiles.
#[derive(Debug, Clone)]
pub struct ServerBase {
    pub url: Url,
    pub endpoints: Option<Endpoints>,
    pub profiles: ProfileList,
}

impl ServerBase {
    pub fn new(url: Url) -> Self {
        ServerBase {
            url,
            endpoints: None,
            profiles: ProfileList::default(),
        }
    }
}

#[derive(Debug)]
pub struct Server {
    /// Normalized base URL, or the organization id for secure internet.
    pub identity: String,
    pub kind: ServerType,
    /// Server that authorizes. The secure internet home, otherwise the base URL.
    pub home_url: Url,
    pub home_endpoints: Option<Endpoints>,
    /// Chosen country code, secure internet only.
    pub location: Option<String>,
    pub base: ServerBase,
    pub token: TokenCell,
}

impl Server {
    pub fn new(identity: impl Into<String>, kind: ServerType, home_url: Url) -> Self {
        Server {
            identity: identity.into(),
            kind,
            base: ServerBase::new(home_url.clone()),
            home_url,
            home_endpoints: None,
            location: None,
            token: new_cell(OAuthToken::default()),
        }
    }

    /// Moves a secure internet server to another country's server.
    /// Endpoints and profiles of the previous location are dropped.
    pub fn set_location(&mut self, country_code: impl Into<String>, url: Url) {
        self.location = Some(country_code.into());
        if self.base.url != url {
            self.base = ServerBase::new(url);
        }
    }

    pub fn needs_location(&self) -> bool {
        self.kind == ServerType::SecureInternet && self.location.is_none()
    }

    /// The expected `iss` of the authorization redirect.
    pub fn issuer(&self) -> &str {
        self.home_url.as_str()
    }

    pub fn api_endpoint(&self) -> Result<Url, ServerError> {
        self.base
            .endpoints
            .as_ref()
            .map(|endpoints| endpoints.api.clone())
            .ok_or_else(|| ServerError::metadata(format!("{} is not initialized", self.identity)))
    }

    pub fn authorization_endpoints(&self) -> Result<Endpoints, ServerError> {
        self.home_endpoints
            .clone()
            .ok_or_else(|| ServerError::metadata(format!("{} is not initialized", self.identity)))
    }

    /// Everything authorizing this server needs, usable without holding the
    /// server lock.
    pub fn auth_context(&self) -> Result<AuthContext, ServerError> {
        Ok(AuthContext {
            identity: self.identity.clone(),
            issuer: self.issuer().to_string(),
            endpoints: self.authorization_endpoints()?,
            token: Arc::clone(&self.token),
        })
    }

    /// Loads endpoints of the base and home servers if not loaded yet.
    pub async fn initialize(&mut self, client: &Client) -> Result<(), ServerError> {
        if self.base.endpoints.is_none() {
            self.base.endpoints = Some(endpoints::fetch(client, &self.base.url).await?);
        }

        if self.home_endpoints.is_none() {
            self.home_endpoints = if self.home_url == self.base.url {
                self.base.endpoints.clone()
            } else {
                Some(endpoints::fetch(client, &self.home_url).await?)
            };
        }

        debug!("Server {} initialized", self.identity);
        Ok(())
    }

    pub fn summary(&self) -> ServerSummary {
        ServerSummary {
            identity: self.identity.clone(),
            kind: self.kind,
            base_url: self.base.url.to_string(),
            location: self.location.clone(),
            current_profile: self.base.profiles.current.clone(),
        }
    }
}

/// Identity, issuer, OAuth endpoints and token cell of a server.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: String,
    pub issuer: String,
    pub endpoints: Endpoints,
    pub token: TokenCell,
}

impl AuthContext {
    pub async fn access_token(&self) -> Result<String, OAuthError> {
        self.token
            .lock()
            .await
            .access()
            .map(str::to_string)
            .ok_or_else(|| OAuthError::missing_token(format!("{} has no token", self.identity)))
    }
}

/// Read-only view of a server for hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSummary {
    pub identity: String,
    pub kind: ServerType,
    pub base_url: String,
    pub location: Option<String>,
    pub current_profile: Option<String>,
}
