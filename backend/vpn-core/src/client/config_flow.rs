use super::Client;
use crate::error::{CoreError, DiscoveryError, FsmError, ServerError};
use crate::fsm::{ErrorSummary, Reply, StateData, StateId};
use crate::oauth::TokenSet;
use crate::server::api::{self, ConnectRequest, ConnectResponse};
use crate::server::registry::SharedServer;
use crate::server::{AuthContext, normalize_url};
use crate::transport;

use models::{ConnectionProfile, Profile, Protocol};

use std::sync::atomic::Ordering;

use log::{debug, info, warn};
use url::Url;

impl Client {
    /// Runs the whole flow for `identity`: load the server, authorize, pick a
    /// profile and fetch a configuration with its remotes ordered for
    /// `prefer_tcp`.
    ///
    /// On failure the machine returns to `NoServer` (or `GotConfig` when a
    /// previous configuration exists and the flow was cancelled) with the
    /// error summary as data, and the error is returned.
    pub async fn get_config(
        &self,
        identity: &str,
        prefer_tcp: bool,
        existing_token: Option<TokenSet>,
    ) -> Result<ConnectionProfile, CoreError> {
        self.ensure_registered()?;
        let server = {
            let mut registry = self.registry.write().await;
            let key = registry.set_current(identity)?;
            registry
                .get(&key)
                .ok_or_else(|| ServerError::not_found(identity))?
        };

        match self.run_config_flow(&server, prefer_tcp, existing_token).await {
            Ok(profile) => {
                self.has_config.store(true, Ordering::SeqCst);
                if let Err(e) = self.save_state().await {
                    warn!("Failed to persist state: {e}");
                }
                Ok(profile)
            }
            Err(error) => {
                self.fail_flow(&error).await;
                Err(error)
            }
        }
    }

    async fn fail_flow(&self, error: &CoreError) {
        warn!("Config flow failed: {error}");
        self.pending.lock().await.cancel_all();

        let mut fsm = self.fsm.lock().await;
        let back_to_config = self.has_config.load(Ordering::SeqCst)
            && error.is_cancellation()
            && fsm.has_transition(StateId::GotConfig);
        let target = if back_to_config {
            StateId::GotConfig
        } else {
            StateId::NoServer
        };

        if !fsm.transition(target, StateData::Error(ErrorSummary::from(error))) {
            warn!("Could not leave {} after error", fsm.current());
        }
    }

    /// The server lock is only held for bounded steps, never across the
    /// authorization, profile or location waits, so host getters stay live.
    async fn run_config_flow(
        &self,
        shared: &SharedServer,
        prefer_tcp: bool,
        existing_token: Option<TokenSet>,
    ) -> Result<ConnectionProfile, CoreError> {
        self.transition(StateId::LoadingServer, StateData::None).await?;
        let needs_location = shared.lock().await.needs_location();
        if needs_location {
            self.choose_location(shared).await?;
        }

        let (auth, api_url) = {
            let mut server = shared.lock().await;
            server.initialize(&self.http).await?;
            (server.auth_context()?, server.api_endpoint()?)
        };
        self.transition(StateId::ChosenServer, StateData::None).await?;

        if let Some(tokens) = existing_token {
            auth.token.lock().await.set(tokens);
        }
        self.ensure_authorized(&auth).await?;

        self.transition(StateId::RequestConfig, StateData::None).await?;
        let profiles = self.fetch_profiles(&auth, &api_url).await?;
        let profile = self.select_profile(shared, profiles).await?;

        let response = self.connect(&auth, &api_url, &profile, prefer_tcp).await?;
        let (config, remotes) =
            transport::order_for(response.protocol, &response.config, prefer_tcp);
        let profile = ConnectionProfile::builder()
            .with_protocol(response.protocol)
            .with_config(config)
            .with_remotes(remotes)
            .build()?;

        info!(
            "Got {} config for {} with {} remote(s)",
            profile.protocol,
            auth.identity,
            profile.remotes.len()
        );

        self.transition(StateId::GotConfig, StateData::GotConfig(profile.clone()))
            .await?;
        Ok(profile)
    }

    /// Picks the secure internet location, asking the host when there is a choice.
    async fn choose_location(&self, shared: &SharedServer) -> Result<(), CoreError> {
        let servers = self.discovery.servers().await?;
        let locations = servers.secure_internet_locations();

        let country = match locations.as_slice() {
            [] => return Err(DiscoveryError::not_found("no secure internet locations").into()),
            [only] => only.clone(),
            _ => {
                let (reply, receiver) = Reply::channel();
                self.pending.lock().await.location = Some(reply.clone());
                self.transition(
                    StateId::AskLocation,
                    StateData::AskLocation {
                        locations: locations.clone(),
                        reply,
                    },
                )
                .await?;

                let chosen = receiver
                    .await
                    .map_err(|_| FsmError::wait_cancelled("location"));
                self.pending.lock().await.location = None;
                let chosen = chosen?;

                if !locations
                    .iter()
                    .any(|location| location.eq_ignore_ascii_case(&chosen))
                {
                    return Err(
                        DiscoveryError::not_found(format!("unknown location '{chosen}'")).into(),
                    );
                }
                self.transition(StateId::ChosenLocation, StateData::None)
                    .await?;
                chosen
            }
        };

        let url = servers
            .by_country(&country)
            .map(|location| location.base_url.clone())
            .ok_or_else(|| DiscoveryError::not_found(format!("unknown location '{country}'")))?;
        let url = normalize_url(&url)?;
        shared.lock().await.set_location(country, url);
        Ok(())
    }

    /// `<api>/info`. A rejected token is refreshed once; if that does not help
    /// the token is dropped and the browser flow runs again.
    async fn fetch_profiles(
        &self,
        auth: &AuthContext,
        api_url: &Url,
    ) -> Result<Vec<Profile>, CoreError> {
        let access = auth.access_token().await?;

        match api::info(&self.http, api_url, &access).await {
            Err(e) if e.is_unauthorized() => debug!("Profile list rejected the access token"),
            other => return Ok(other?),
        }

        match self
            .token_client(auth)
            .refresh_cell(&auth.token, Some(access.as_str()))
            .await
        {
            Ok(refreshed) => {
                match api::info(&self.http, api_url, refreshed.access.expose()).await {
                    Err(e) if e.is_unauthorized() => {
                        debug!("Refreshed access token rejected as well")
                    }
                    other => return Ok(other?),
                }
            }
            Err(e) if e.is_rejected_grant() => {
                info!("Refresh token for {} rejected: {e}", auth.identity)
            }
            Err(e) => warn!("Token refresh failed: {e}"),
        }

        auth.token.lock().await.clear();
        self.authorize(auth).await?;
        self.transition(StateId::RequestConfig, StateData::None).await?;

        let access = auth.access_token().await?;
        Ok(api::info(&self.http, api_url, &access).await?)
    }

    /// Reconciles the stored choice with `profiles`, asking the host when
    /// several profiles exist and none is chosen. Returns the chosen profile.
    async fn select_profile(
        &self,
        shared: &SharedServer,
        profiles: Vec<Profile>,
    ) -> Result<Profile, CoreError> {
        if profiles.is_empty() {
            return Err(ServerError::unsupported("server offers no profiles").into());
        }

        let offered = {
            let mut server = shared.lock().await;
            if server.base.profiles.replace(profiles) {
                info!(
                    "Stored profile is not offered by {}, using {:?}",
                    server.identity, server.base.profiles.current
                );
            }

            let stored = &mut server.base.profiles;
            if stored.current.is_some() {
                None
            } else if let [only] = stored.list.as_slice() {
                let profile_id = only.profile_id.clone();
                stored.set_unchecked(profile_id);
                None
            } else {
                Some(stored.list.clone())
            }
        };

        if let Some(offered) = offered {
            let (reply, receiver) = Reply::channel();
            self.pending.lock().await.profile = Some(reply.clone());
            self.transition(
                StateId::AskProfile,
                StateData::AskProfile {
                    profiles: offered,
                    reply,
                },
            )
            .await?;

            let chosen = receiver
                .await
                .map_err(|_| FsmError::wait_cancelled("profile"));
            self.pending.lock().await.profile = None;
            shared.lock().await.base.profiles.select(chosen?)?;
        }

        let profile = shared
            .lock()
            .await
            .base
            .profiles
            .current_profile()
            .cloned()
            .ok_or_else(|| ServerError::unsupported("no profile chosen"))?;

        self.transition(StateId::ChosenProfile, StateData::None)
            .await?;
        Ok(profile)
    }

    /// `<api>/connect` for `profile`. A rejected token is refreshed once and
    /// the request retried.
    async fn connect(
        &self,
        auth: &AuthContext,
        api_url: &Url,
        profile: &Profile,
        prefer_tcp: bool,
    ) -> Result<ConnectResponse, CoreError> {
        let wireguard_key = self.wireguard_key.read().await.clone();
        let protocols = profile.protocols();
        let openvpn = protocols.contains(&Protocol::OpenVpn);
        let wireguard = protocols.contains(&Protocol::WireGuard) && wireguard_key.is_some();

        let protocol = if wireguard && (!prefer_tcp || !openvpn) {
            Protocol::WireGuard
        } else if openvpn {
            Protocol::OpenVpn
        } else {
            return Err(ServerError::unsupported(format!(
                "profile {} offers no protocol this client can use",
                profile.profile_id
            ))
            .into());
        };

        let request = ConnectRequest {
            profile_id: profile.profile_id.clone(),
            prefer_tcp,
            accept: vec![protocol],
            public_key: wireguard_key.filter(|_| protocol == Protocol::WireGuard),
        };

        let access = auth.access_token().await?;
        match api::connect(&self.http, api_url, &access, &request).await {
            Err(e) if e.is_unauthorized() => debug!("Connect rejected the access token"),
            other => return Ok(other?),
        }

        let refreshed = self
            .token_client(auth)
            .refresh_cell(&auth.token, Some(access.as_str()))
            .await?;
        Ok(api::connect(&self.http, api_url, refreshed.access.expose(), &request).await?)
    }
}
