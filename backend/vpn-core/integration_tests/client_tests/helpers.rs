//! Test helpers for client integration tests.
//!
//! This module provides:
//! - A mock VPN portal (well-known document, token endpoint, API v3)
//! - A scripted "browser" that answers the authorization redirect from the
//!   state callback
//! - A recorder for transitions and the data hosts receive with them

use vpn_core::config::{PersistedServer, PersistedState};
use vpn_core::fsm::{ErrorSummary, StateCallback, StateData, StateId};
use vpn_core::oauth::{CancelHandle, OAuthToken, TokenSet};
use vpn_core::{Client, ClientSettings};

use common::RedactedToken;
use models::ServerType;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const APP_ID: &str = "org.example.vpn.test";

pub const OPENVPN_CONTENT_TYPE: &str = "application/x-openvpn-profile";

/// UDP first, as portals usually send it.
pub const OPENVPN_CONFIG: &str = "client\ndev tun\nremote eduvpnserver 1194 udp\nremote eduvpnserver 1194 tcp\n";

/// Issues `access-N` / `refresh-N`, N counting requests from 1.
#[derive(Default, Clone)]
pub struct TokenResponder {
    issued: Arc<AtomicUsize>,
}

impl Respond for TokenResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": format!("access-{n}"),
            "refresh_token": format!("refresh-{n}"),
            "token_type": "bearer",
            "expires_in": 3600
        }))
    }
}

/// Mock portal serving the well-known document and the token endpoint.
/// Tests mount `info`, `connect` and `disconnect` as they need.
pub struct MockVpn {
    pub server: MockServer,
}

impl MockVpn {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("GET"))
            .and(path("/.well-known/vpn-user-portal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "api": {
                    "http://eduvpn.org/api#3": {
                        "api_endpoint": format!("{uri}/api/v3"),
                        "authorization_endpoint": format!("{uri}/oauth/authorize"),
                        "token_endpoint": format!("{uri}/oauth/token")
                    }
                },
                "v": "3.0.0"
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(TokenResponder::default())
            .mount(&server)
            .await;

        MockVpn { server }
    }

    /// Base URL the way the registry normalizes it.
    pub fn base_url(&self) -> String {
        format!("{}/", self.server.uri())
    }

    pub async fn mount_profiles(&self, profiles: Value) {
        Mock::given(method("GET"))
            .and(path("/api/v3/info"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({
                    "info": { "profile_list": profiles }
                })),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mount_config(&self, config: &str) {
        Mock::given(method("POST"))
            .and(path("/api/v3/connect"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(config.to_string(), OPENVPN_CONTENT_TYPE),
            )
            .mount(&self.server)
            .await;
    }

    /// Refresh grants fail with `invalid_grant`; code exchanges still succeed.
    pub async fn reject_refresh(&self) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "refresh token revoked"
            })))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// One OpenVPN profile and [`OPENVPN_CONFIG`].
    pub async fn mount_single_profile(&self) {
        self.mount_profiles(json!([profile("internet", "Internet")]))
            .await;
        self.mount_config(OPENVPN_CONFIG).await;
    }
}

pub fn profile(id: &str, name: &str) -> Value {
    json!({
        "profile_id": id,
        "display_name": name,
        "vpn_proto_list": ["openvpn"],
        "default_gateway": true
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserMode {
    /// Redirects back with the right state and issuer.
    Approve,
    WrongState,
    WrongIssuer,
    MissingIssuer,
    /// Never redirects; cancels through the handle instead.
    Cancel,
    /// Never redirects and never cancels, like a browser tab left open.
    Stall,
}

/// Plays the user's browser: reads the authorization URL and calls the
/// loopback redirect URI.
#[derive(Debug, Clone)]
pub struct Browser {
    pub issuer: String,
    pub mode: BrowserMode,
}

impl Browser {
    pub fn new(issuer: impl Into<String>, mode: BrowserMode) -> Self {
        Browser {
            issuer: issuer.into(),
            mode,
        }
    }

    fn visit(&self, authorization_url: &str, cancel: &CancelHandle) {
        match self.mode {
            BrowserMode::Cancel => {
                cancel.cancel();
                return;
            }
            BrowserMode::Stall => return,
            _ => {}
        }

        let url = Url::parse(authorization_url).expect("authorization URL parses");
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let state = match self.mode {
            BrowserMode::WrongState => String::from("forged-state"),
            _ => query["state"].clone(),
        };

        let mut redirect = Url::parse(&query["redirect_uri"]).expect("redirect URI parses");
        {
            let mut pairs = redirect.query_pairs_mut();
            pairs.append_pair("code", "authorization-code");
            pairs.append_pair("state", &state);
            match self.mode {
                BrowserMode::MissingIssuer => {}
                BrowserMode::WrongIssuer => {
                    pairs.append_pair("iss", "https://evil.example.org/");
                }
                _ => {
                    pairs.append_pair("iss", &self.issuer);
                }
            }
        }

        tokio::spawn(async move {
            let _ = reqwest::get(redirect).await;
        });
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub transitions: Vec<(StateId, StateId)>,
    pub errors: Vec<ErrorSummary>,
    pub authorization_urls: Vec<String>,
    pub offered_profiles: Vec<Vec<String>>,
    pub offered_locations: Vec<Vec<String>>,
}

/// Shared log of everything the state callback saw.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Recorded>>,
}

impl Recorder {
    pub fn transitions(&self) -> Vec<(StateId, StateId)> {
        self.inner.lock().unwrap().transitions.clone()
    }

    pub fn visited(&self) -> Vec<StateId> {
        self.transitions().into_iter().map(|(_, to)| to).collect()
    }

    pub fn errors(&self) -> Vec<ErrorSummary> {
        self.inner.lock().unwrap().errors.clone()
    }

    pub fn authorization_urls(&self) -> Vec<String> {
        self.inner.lock().unwrap().authorization_urls.clone()
    }

    pub fn offered_profiles(&self) -> Vec<Vec<String>> {
        self.inner.lock().unwrap().offered_profiles.clone()
    }

    pub fn offered_locations(&self) -> Vec<Vec<String>> {
        self.inner.lock().unwrap().offered_locations.clone()
    }
}

/// How the host answers questions asked through the state callback.
#[derive(Debug, Clone)]
pub struct Script {
    pub browser: Browser,
    pub profile_choice: Option<String>,
    pub location_choice: Option<String>,
}

impl Script {
    pub fn approve(issuer: impl Into<String>) -> Self {
        Script {
            browser: Browser::new(issuer, BrowserMode::Approve),
            profile_choice: None,
            location_choice: None,
        }
    }

    pub fn with_browser_mode(mut self, mode: BrowserMode) -> Self {
        self.browser.mode = mode;
        self
    }

    pub fn choosing_profile(mut self, profile_id: &str) -> Self {
        self.profile_choice = Some(profile_id.to_string());
        self
    }

    pub fn choosing_location(mut self, country_code: &str) -> Self {
        self.location_choice = Some(country_code.to_string());
        self
    }
}

pub fn callback(script: Script, recorder: Recorder) -> StateCallback {
    Box::new(move |old: StateId, new: StateId, data: &StateData| {
        let mut recorded = recorder.inner.lock().unwrap();
        recorded.transitions.push((old, new));

        match data {
            StateData::OAuthStarted { url, cancel, .. } => {
                recorded.authorization_urls.push(url.clone());
                script.browser.visit(url, cancel);
            }
            StateData::AskProfile { profiles, reply } => {
                recorded
                    .offered_profiles
                    .push(profiles.iter().map(|p| p.profile_id.clone()).collect());
                if let Some(choice) = &script.profile_choice {
                    reply.send(choice.clone());
                }
            }
            StateData::AskLocation { locations, reply } => {
                recorded.offered_locations.push(locations.clone());
                if let Some(choice) = &script.location_choice {
                    reply.send(choice.clone());
                }
            }
            StateData::Error(summary) => recorded.errors.push(summary.clone()),
            _ => {}
        }
        true
    })
}

pub async fn register(dir: &Path, script: Script, recorder: &Recorder) -> Client {
    register_with_discovery(dir, script, recorder, None).await
}

pub async fn register_with_discovery(
    dir: &Path,
    script: Script,
    recorder: &Recorder,
    discovery_url: Option<String>,
) -> Client {
    let mut settings = ClientSettings::new(APP_ID, dir);
    if let Some(url) = discovery_url {
        settings = settings.with_discovery_url(url);
    }
    Client::register_with(settings, callback(script, recorder.clone()))
        .await
        .expect("client registers")
}

pub fn token_set(access: &str, issuer: &str) -> TokenSet {
    TokenSet {
        access: RedactedToken::new(access),
        refresh: RedactedToken::new(format!("{access}-refresh")),
        expires_at: 4_000_000_000,
        issuer: issuer.to_string(),
    }
}

/// Like [`token_set`] but long expired, so it is refreshed before use.
pub fn expired_token_set(access: &str, issuer: &str) -> TokenSet {
    TokenSet {
        expires_at: 1,
        ..token_set(access, issuer)
    }
}

/// Writes a state file as a previous run would have left it.
pub fn write_state(dir: &Path, base_url: &str, profile: Option<&str>, token: Option<TokenSet>) {
    let state = PersistedState {
        servers: vec![PersistedServer {
            identity: base_url.to_string(),
            kind: ServerType::Custom,
            home_url: base_url.to_string(),
            base_url: base_url.to_string(),
            location: None,
            profile: profile.map(str::to_string),
            token: token.map(OAuthToken::new).unwrap_or_default(),
        }],
        current: Some(base_url.to_string()),
        ..PersistedState::default()
    };
    state.save(dir, APP_ID).expect("state file written");
}
