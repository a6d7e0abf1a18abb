//! Cached discovery lists (`organization_list.json`, `server_list.json`).
//!
//! Lists are refetched once they are older than [`STALE_AFTER_SECS`]. A failed
//! refresh keeps serving the cached copy. Documents with a lower version than
//! the cached one are ignored. Signatures are checked only when the host
//! supplies a [`DiscoveryVerifier`].

use crate::error::DiscoveryError;
use crate::oauth::token::unix_now;

use common::HttpStatusCode;
use models::{OrganizationList, ServerList};

use std::sync::Arc;

use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

pub const ORGANIZATION_LIST_FILE: &str = "organization_list.json";
pub const SERVER_LIST_FILE: &str = "server_list.json";
pub const SIGNATURE_SUFFIX: &str = ".minisig";
pub const STALE_AFTER_SECS: u64 = 60 * 60;

/// Host-supplied check of a discovery document against its `.minisig`.
pub trait DiscoveryVerifier: Send + Sync {
    fn verify(&self, file_name: &str, document: &[u8], signature: &[u8]) -> Result<(), String>;
}

pub fn is_stale(fetched_at: u64, now: u64) -> bool {
    now.saturating_sub(fetched_at) >= STALE_AFTER_SECS
}

trait Versioned {
    fn version(&self) -> u64;
    fn fetched_at(&self) -> u64;
    fn stamp(&mut self, now: u64);
}

impl Versioned for OrganizationList {
    fn version(&self) -> u64 {
        self.version
    }
    fn fetched_at(&self) -> u64 {
        self.fetched_at
    }
    fn stamp(&mut self, now: u64) {
        self.fetched_at = now;
    }
}

impl Versioned for ServerList {
    fn version(&self) -> u64 {
        self.version
    }
    fn fetched_at(&self) -> u64 {
        self.fetched_at
    }
    fn stamp(&mut self, now: u64) {
        self.fetched_at = now;
    }
}

pub struct Discovery {
    client: Client,
    base_url: Url,
    verifier: Option<Arc<dyn DiscoveryVerifier>>,
    organizations: RwLock<Option<OrganizationList>>,
    servers: RwLock<Option<ServerList>>,
}

impl Discovery {
    pub fn new(client: Client, base_url: Url) -> Self {
        Discovery {
            client,
            base_url,
            verifier: None,
            organizations: RwLock::new(None),
            servers: RwLock::new(None),
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn DiscoveryVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn organizations(&self) -> Result<OrganizationList, DiscoveryError> {
        self.cached_or_fetch(&self.organizations, ORGANIZATION_LIST_FILE)
            .await
    }

    pub async fn servers(&self) -> Result<ServerList, DiscoveryError> {
        self.cached_or_fetch(&self.servers, SERVER_LIST_FILE).await
    }

    /// `secure_internet_home` of an organization.
    pub async fn secure_internet_home(&self, org_id: &str) -> Result<String, DiscoveryError> {
        let organizations = self.organizations().await?;
        organizations
            .find(org_id)
            .map(|organization| organization.secure_internet_home.clone())
            .ok_or_else(|| DiscoveryError::not_found(format!("unknown organization '{org_id}'")))
    }

    /// Base URL of the secure internet server in `country_code`.
    pub async fn location_url(&self, country_code: &str) -> Result<String, DiscoveryError> {
        let servers = self.servers().await?;
        servers
            .by_country(country_code)
            .map(|server| server.base_url.clone())
            .ok_or_else(|| DiscoveryError::not_found(format!("unknown location '{country_code}'")))
    }

    async fn cached_or_fetch<T>(
        &self,
        slot: &RwLock<Option<T>>,
        file_name: &str,
    ) -> Result<T, DiscoveryError>
    where
        T: Versioned + DeserializeOwned + Clone,
    {
        let now = unix_now();
        if let Some(cached) = slot.read().await.as_ref()
            && !is_stale(cached.fetched_at(), now)
        {
            return Ok(cached.clone());
        }

        let mut slot = slot.write().await;
        let fetched = self.fetch::<T>(file_name).await;

        match fetched {
            Ok(mut document) => {
                if let Some(cached) = slot.as_mut()
                    && document.version() < cached.version()
                {
                    warn!(
                        "Ignoring {file_name} version {} older than cached {}",
                        document.version(),
                        cached.version()
                    );
                    cached.stamp(now);
                    return Ok(cached.clone());
                }
                document.stamp(now);
                info!("Discovery {file_name} updated to version {}", document.version());
                *slot = Some(document.clone());
                Ok(document)
            }
            Err(e) => match slot.as_ref() {
                Some(cached) => {
                    warn!("Failed refreshing {file_name}, using cached copy: {e}");
                    Ok(cached.clone())
                }
                None => Err(e),
            },
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, file_name: &str) -> Result<T, DiscoveryError> {
        let url = self.base_url.join(file_name)?;
        let document = self.get_bytes(&url).await?;

        if let Some(verifier) = &self.verifier {
            let signature_url = self.base_url.join(&format!("{file_name}{SIGNATURE_SUFFIX}"))?;
            let signature = self.get_bytes(&signature_url).await?;
            verifier
                .verify(file_name, &document, &signature)
                .map_err(|reason| {
                    DiscoveryError::signature(format!("{file_name} failed verification: {reason}"))
                })?;
        }

        Ok(serde_json::from_slice(&document)?)
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, DiscoveryError> {
        debug!("GET {url}");
        let response = self.client.get(url.clone()).send().await?;
        let status = HttpStatusCode(response.status().as_u16());
        if !status.is_success() {
            return Err(DiscoveryError::fetch(status, format!("failed fetching {url}")));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
