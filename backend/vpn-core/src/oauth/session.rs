use super::listener::{CallbackListener, CallbackParams};
use super::pkce::{CHALLENGE_METHOD, Pkce, generate_state};
use super::token::{TokenClient, TokenSet};
use crate::OAUTH_SCOPE;
use crate::error::OAuthError;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use tokio::sync::Notify;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    AwaitingCallback,
    Exchanging,
    Authorized,
    Failed,
    Cancelled,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancels a pending authorization. Cheap to clone; all clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancelHandle::cancel`] has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Checks the redirect parameters in order: `error`, presence of
/// `state`/`code`/`iss`, then the state nonce, then the issuer.
pub fn validate_callback(
    params: &CallbackParams,
    expected_state: &str,
    expected_issuer: &str,
) -> Result<String, OAuthError> {
    if let Some(error) = params.get("error") {
        let description = params.get("error_description").unwrap_or_default();
        return Err(OAuthError::authorization(format!(
            "authorization server returned '{error}' {description}"
        )));
    }

    let mut values = Vec::with_capacity(3);
    for key in ["state", "code", "iss"] {
        match params.get(key) {
            Some(value) if !value.is_empty() => values.push(value),
            _ => return Err(OAuthError::missing_parameter(key)),
        }
    }
    let (state, code, issuer) = (values[0], values[1], values[2]);

    if state != expected_state {
        return Err(OAuthError::state_mismatch(state));
    }

    if issuer.trim_end_matches('/') != expected_issuer.trim_end_matches('/') {
        return Err(OAuthError::issuer_mismatch(issuer, expected_issuer));
    }

    Ok(code.to_string())
}

/// One authorization attempt. Never reused; start a new one per attempt.
pub struct OAuthSession {
    pkce: Pkce,
    state: String,
    issuer: String,
    redirect_uri: String,
    authorization_url: Url,
    listener: Option<CallbackListener>,
    port: u16,
    cancel: CancelHandle,
    status: SessionStatus,
}

impl OAuthSession {
    /// Generates PKCE material and the state nonce, binds the loopback listener
    /// and builds the authorization URL.
    pub async fn start(
        issuer: &str,
        client_id: &str,
        authorization_endpoint: &Url,
    ) -> Result<Self, OAuthError> {
        let pkce = Pkce::generate();
        let state = generate_state();
        let listener = CallbackListener::bind().await?;
        let port = listener.port();
        let redirect_uri = listener.redirect_uri();

        let mut authorization_url = authorization_endpoint.clone();
        authorization_url
            .query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", OAUTH_SCOPE)
            .append_pair("code_challenge", pkce.challenge())
            .append_pair("code_challenge_method", CHALLENGE_METHOD)
            .append_pair("state", &state);

        info!("OAuth session started for {issuer} on port {port}");

        Ok(OAuthSession {
            pkce,
            state,
            issuer: issuer.to_string(),
            redirect_uri,
            authorization_url,
            listener: Some(listener),
            port,
            cancel: CancelHandle::new(),
            status: SessionStatus::Idle,
        })
    }

    pub fn authorization_url(&self) -> &Url {
        &self.authorization_url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Waits for the redirect and validates it. Cancellation wins the race.
    pub async fn wait_for_code(&mut self) -> Result<String, OAuthError> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| OAuthError::authorization("session already used"))?;
        self.status = SessionStatus::AwaitingCallback;

        let expected_state = self.state.clone();
        let expected_issuer = self.issuer.clone();
        let cancel = self.cancel.clone();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OAuthError::cancelled()),
            result = listener.wait_for_callback(|params| {
                validate_callback(params, &expected_state, &expected_issuer)
            }) => result,
        };

        match &result {
            Ok(_) => debug!("OAuth callback accepted"),
            Err(OAuthError::Cancelled { .. }) => {
                info!("OAuth session cancelled");
                self.status = SessionStatus::Cancelled;
            }
            Err(e) => {
                warn!("OAuth callback rejected: {e}");
                self.status = SessionStatus::Failed;
            }
        }
        result
    }

    /// Full attempt: wait for the code, then exchange it.
    pub async fn authorize(&mut self, tokens: &TokenClient) -> Result<TokenSet, OAuthError> {
        let code = self.wait_for_code().await?;
        self.status = SessionStatus::Exchanging;

        let exchanged = tokens
            .exchange(&code, &self.redirect_uri, self.pkce.verifier(), &self.issuer)
            .await;

        self.status = match exchanged {
            Ok(_) => SessionStatus::Authorized,
            Err(_) => SessionStatus::Failed,
        };
        exchanged
    }
}
