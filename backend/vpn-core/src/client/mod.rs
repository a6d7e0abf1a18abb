//! The host-facing client: registration, server management and the state
//! machine driven configuration flow.
//!
//! `Client` is explicitly constructed by [`Client::register`] and owned by the
//! host; share it behind an `Arc` when UI callbacks need to reach it while a
//! configuration request is pending.

mod authorize;
mod config_flow;

use crate::config::{ClientSettings, PersistedServer, PersistedState};
use crate::discovery::{Discovery, DiscoveryVerifier};
use crate::error::{CoreError, FsmError, ServerError};
use crate::fsm::{Fsm, Reply, StateCallback, StateData, StateId};
use crate::logger;
use crate::oauth::CancelHandle;
use crate::oauth::token::{TokenClient, TokenSet, new_cell};
use crate::server::registry::SharedServer;
use crate::server::{
    AuthContext, Server, ServerBase, ServerRegistry, ServerSummary, api, normalize_url,
};

use models::{DisplayName, OrganizationList, ProfileList, ServerList, ServerType};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use reqwest::Client as HttpClient;
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Replies and cancel handles the flow is currently blocked on.
#[derive(Default)]
struct PendingWaits {
    oauth: Option<CancelHandle>,
    profile: Option<Reply<String>>,
    location: Option<Reply<String>>,
}

impl PendingWaits {
    /// Returns `true` if anything was waiting.
    fn cancel_all(&mut self) -> bool {
        let mut cancelled = false;
        if let Some(handle) = self.oauth.take() {
            handle.cancel();
            cancelled = true;
        }
        for reply in [self.profile.take(), self.location.take()].into_iter().flatten() {
            cancelled |= reply.cancel();
        }
        cancelled
    }
}

pub struct Client {
    settings: ClientSettings,
    config_dir: PathBuf,
    http: HttpClient,
    fsm: Mutex<Fsm>,
    registry: RwLock<ServerRegistry>,
    discovery: Discovery,
    pending: Mutex<PendingWaits>,
    wireguard_key: RwLock<Option<String>>,
    registered: AtomicBool,
    has_config: AtomicBool,
}

impl Client {
    pub async fn register(
        app_id: &str,
        config_dir: impl Into<PathBuf>,
        locale: &str,
        callback: StateCallback,
        debug: bool,
    ) -> Result<Self, CoreError> {
        let settings = ClientSettings::new(app_id, config_dir)
            .with_locale(locale)
            .with_debug(debug);
        Self::register_with(settings, callback).await
    }

    /// Validates `settings`, restores persisted servers and moves the state
    /// machine from `Deregistered` to `NoServer`.
    pub async fn register_with(
        settings: ClientSettings,
        callback: StateCallback,
    ) -> Result<Self, CoreError> {
        Self::register_inner(settings, callback, None).await
    }

    /// Like [`Client::register_with`], verifying discovery documents with `verifier`.
    pub async fn register_with_verifier(
        settings: ClientSettings,
        callback: StateCallback,
        verifier: Arc<dyn DiscoveryVerifier>,
    ) -> Result<Self, CoreError> {
        Self::register_inner(settings, callback, Some(verifier)).await
    }

    async fn register_inner(
        settings: ClientSettings,
        callback: StateCallback,
        verifier: Option<Arc<dyn DiscoveryVerifier>>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let config_dir = settings.resolved_config_dir()?;

        if let Err(e) = logger::initialize(&config_dir, settings.debug) {
            warn!("File logging disabled: {e}");
        }

        let http = HttpClient::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(ServerError::from)?;

        let mut discovery = Discovery::new(http.clone(), settings.discovery_base()?);
        if let Some(verifier) = verifier {
            discovery = discovery.with_verifier(verifier);
        }

        let registry = match PersistedState::load(&config_dir, &settings.app_id) {
            Ok(state) => restore_registry(&state),
            Err(e) => {
                warn!("Ignoring stored state, starting empty: {e}");
                ServerRegistry::default()
            }
        };

        let mut fsm = Fsm::new(callback);
        if settings.debug {
            fsm = fsm.with_debug_graph(config_dir.clone());
        }
        fsm.require(StateId::NoServer, StateData::None)?;

        info!(
            "Client {} registered with {} stored server(s)",
            settings.app_id,
            registry.len()
        );

        Ok(Client {
            settings,
            config_dir,
            http,
            fsm: Mutex::new(fsm),
            registry: RwLock::new(registry),
            discovery,
            pending: Mutex::new(PendingWaits::default()),
            wireguard_key: RwLock::new(None),
            registered: AtomicBool::new(true),
            has_config: AtomicBool::new(false),
        })
    }

    /// Cancels pending waits and persists state. Later calls fail with a state error.
    pub async fn deregister(&self) -> Result<(), CoreError> {
        self.ensure_registered()?;
        self.pending.lock().await.cancel_all();
        self.save_state().await?;
        self.registered.store(false, Ordering::SeqCst);
        info!("Client {} deregistered", self.settings.app_id);
        Ok(())
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub async fn current_state(&self) -> StateId {
        self.fsm.lock().await.current()
    }

    // ============================================
    // SERVERS
    // ============================================

    pub async fn add_custom_server(&self, url: &str) -> Result<String, CoreError> {
        self.ensure_registered()?;
        Ok(self.registry.write().await.add_custom(url)?)
    }

    pub async fn add_institute_access(&self, url: &str) -> Result<String, CoreError> {
        self.ensure_registered()?;
        Ok(self.registry.write().await.add_institute_access(url)?)
    }

    /// Adds the organization's secure internet server, keyed by `org_id`.
    pub async fn add_secure_internet(&self, org_id: &str) -> Result<String, CoreError> {
        self.ensure_registered()?;
        let home = self.discovery.secure_internet_home(org_id).await?;
        Ok(self.registry.write().await.add_secure_internet(org_id, &home)?)
    }

    pub async fn remove_server(&self, identity: &str) -> Result<(), CoreError> {
        self.ensure_registered()?;
        if self.registry.write().await.remove(identity).is_none() {
            return Err(ServerError::not_found(identity).into());
        }
        if let Err(e) = self.save_state().await {
            warn!("Failed to persist state after removing {identity}: {e}");
        }
        Ok(())
    }

    pub async fn servers(&self) -> Vec<ServerSummary> {
        let servers: Vec<SharedServer> = self.registry.read().await.iter().collect();
        let mut summaries = Vec::with_capacity(servers.len());
        for server in servers {
            summaries.push(server.lock().await.summary());
        }
        summaries
    }

    pub async fn current_server(&self) -> Option<ServerSummary> {
        let server = self.registry.read().await.current()?;
        let summary = server.lock().await.summary();
        Some(summary)
    }

    pub async fn token(&self, identity: &str) -> Result<Option<TokenSet>, CoreError> {
        let server = self.server(identity).await?;
        let cell = Arc::clone(&server.lock().await.token);
        let token = cell.lock().await.get().cloned();
        Ok(token)
    }

    pub async fn profiles(&self, identity: &str) -> Result<ProfileList, CoreError> {
        let server = self.server(identity).await?;
        let profiles = server.lock().await.base.profiles.clone();
        Ok(profiles)
    }

    /// Public key offered when negotiating WireGuard. `None` disables WireGuard.
    pub async fn set_wireguard_public_key(&self, key: Option<String>) {
        *self.wireguard_key.write().await = key.filter(|key| !key.trim().is_empty());
    }

    // ============================================
    // SELECTIONS
    // ============================================

    /// Answers a pending AskProfile, or stores the choice on the current server.
    pub async fn set_profile_id(&self, profile_id: &str) -> Result<(), CoreError> {
        self.ensure_registered()?;
        if let Some(reply) = self.pending.lock().await.profile.take()
            && reply.send(profile_id.to_string())
        {
            return Ok(());
        }

        let server = self.current_shared().await?;
        let mut server = server.lock().await;
        if server.base.profiles.is_empty() {
            server.base.profiles.set_unchecked(profile_id);
        } else {
            server.base.profiles.select(profile_id)?;
        }
        debug!("Profile {profile_id} selected for {}", server.identity);
        Ok(())
    }

    /// Answers a pending AskLocation, or moves the current secure internet
    /// server to `country_code`.
    pub async fn set_secure_location(&self, country_code: &str) -> Result<(), CoreError> {
        self.ensure_registered()?;
        if let Some(reply) = self.pending.lock().await.location.take()
            && reply.send(country_code.to_string())
        {
            return Ok(());
        }

        let server = self.current_shared().await?;
        let url = self.discovery.location_url(country_code).await?;
        let url = normalize_url(&url)?;
        let mut server = server.lock().await;
        if server.kind != ServerType::SecureInternet {
            return Err(ServerError::unsupported(format!(
                "{} is not a secure internet server",
                server.identity
            ))
            .into());
        }
        server.set_location(country_code, url);
        Ok(())
    }

    /// Cancels a pending authorization. Returns `false` if none was pending.
    pub async fn cancel_oauth(&self) -> bool {
        match self.pending.lock().await.oauth.take() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels whatever the flow waits on, or returns to `NoServer` directly
    /// when nothing is pending.
    pub async fn go_back(&self) -> Result<(), CoreError> {
        self.ensure_registered()?;
        if self.pending.lock().await.cancel_all() {
            debug!("Go back cancelled a pending wait");
            return Ok(());
        }
        self.transition(StateId::NoServer, StateData::None).await
    }

    // ============================================
    // TUNNEL LIFECYCLE
    // ============================================

    pub async fn set_connecting(&self) -> Result<(), CoreError> {
        self.transition(StateId::Connecting, StateData::None).await
    }

    pub async fn set_connected(&self) -> Result<(), CoreError> {
        self.transition(StateId::Connected, StateData::None).await
    }

    pub async fn set_disconnecting(&self) -> Result<(), CoreError> {
        self.transition(StateId::Disconnecting, StateData::None).await
    }

    pub async fn set_disconnected(&self) -> Result<(), CoreError> {
        self.transition(StateId::GotConfig, StateData::None).await
    }

    /// Tells the server the session is over (`POST <api>/disconnect`).
    pub async fn cleanup(&self, identity: &str) -> Result<(), CoreError> {
        self.ensure_registered()?;
        let server = self.server(identity).await?;
        let mut server = server.lock().await;

        let Some(access) = server.token.lock().await.access().map(str::to_string) else {
            debug!("No token for {identity}, nothing to clean up");
            return Ok(());
        };

        server.initialize(&self.http).await?;
        let api_url = server.api_endpoint()?;
        api::disconnect(&self.http, &api_url, &access).await?;
        info!("Disconnected session on {identity}");
        Ok(())
    }

    /// Refreshes the server's access token. Concurrent callers share one request.
    pub async fn refresh_token(&self, identity: &str) -> Result<TokenSet, CoreError> {
        self.ensure_registered()?;
        let server = self.server(identity).await?;
        let auth = {
            let mut server = server.lock().await;
            if server.home_endpoints.is_none() {
                server.initialize(&self.http).await?;
            }
            server.auth_context()?
        };

        let seen = auth.token.lock().await.access().map(str::to_string);
        Ok(self
            .token_client(&auth)
            .refresh_cell(&auth.token, seen.as_deref())
            .await?)
    }

    // ============================================
    // DISCOVERY
    // ============================================

    pub async fn disco_organizations(&self) -> Result<OrganizationList, CoreError> {
        Ok(self.discovery.organizations().await?)
    }

    pub async fn disco_servers(&self) -> Result<ServerList, CoreError> {
        Ok(self.discovery.servers().await?)
    }

    /// `name` in the locale the client was registered with.
    pub fn localized<'a>(&self, name: &'a DisplayName) -> &'a str {
        name.localized(&self.settings.locale)
    }

    // ============================================
    // INTERNALS
    // ============================================

    #[track_caller]
    fn ensure_registered(&self) -> Result<(), CoreError> {
        if self.is_registered() {
            Ok(())
        } else {
            Err(FsmError::not_registered().into())
        }
    }

    pub(crate) async fn transition(&self, to: StateId, data: StateData) -> Result<(), CoreError> {
        self.ensure_registered()?;
        self.fsm.lock().await.require(to, data)?;
        Ok(())
    }

    pub(crate) fn token_client(&self, auth: &AuthContext) -> TokenClient {
        TokenClient::new(
            self.http.clone(),
            auth.endpoints.token.clone(),
            self.settings.app_id.clone(),
        )
    }

    async fn server(&self, identity: &str) -> Result<SharedServer, CoreError> {
        self.registry
            .read()
            .await
            .get(identity)
            .ok_or_else(|| ServerError::not_found(identity).into())
    }

    async fn current_shared(&self) -> Result<SharedServer, CoreError> {
        self.registry
            .read()
            .await
            .current()
            .ok_or_else(|| ServerError::not_found("<current>").into())
    }

    async fn snapshot(&self) -> PersistedState {
        let (servers, current) = {
            let registry = self.registry.read().await;
            let servers: Vec<SharedServer> = registry.iter().collect();
            (servers, registry.current_identity().map(str::to_string))
        };

        let mut persisted = Vec::with_capacity(servers.len());
        for shared in servers {
            let server = shared.lock().await;
            let token = server.token.lock().await.clone();
            persisted.push(PersistedServer {
                identity: server.identity.clone(),
                kind: server.kind,
                home_url: server.home_url.to_string(),
                base_url: server.base.url.to_string(),
                location: server.location.clone(),
                profile: server.base.profiles.current.clone(),
                token,
            });
        }

        PersistedState {
            servers: persisted,
            current,
            ..PersistedState::default()
        }
    }

    pub(crate) async fn save_state(&self) -> Result<(), CoreError> {
        let state = self.snapshot().await;
        state.save(&self.config_dir, &self.settings.app_id)?;
        Ok(())
    }
}

fn restore_registry(state: &PersistedState) -> ServerRegistry {
    let mut registry = ServerRegistry::default();
    for stored in &state.servers {
        let (home, base) = match (Url::parse(&stored.home_url), Url::parse(&stored.base_url)) {
            (Ok(home), Ok(base)) => (home, base),
            _ => {
                warn!("Skipping stored server {} with invalid URLs", stored.identity);
                continue;
            }
        };

        let mut server = Server::new(stored.identity.clone(), stored.kind, home);
        if base != server.home_url {
            server.base = ServerBase::new(base);
        }
        server.location = stored.location.clone();
        if let Some(profile) = &stored.profile {
            server.base.profiles.set_unchecked(profile.clone());
        }
        server.token = new_cell(stored.token.clone());
        registry.insert(server);
    }

    if let Some(current) = &state.current
        && let Err(e) = registry.set_current(current)
    {
        warn!("Stored current server is gone: {e}");
    }
    registry
}

