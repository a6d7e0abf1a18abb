//! Token storage and the token endpoint client.
//!
//! A server keeps its tokens in a [`TokenCell`]. Refreshes go through
//! [`TokenClient::refresh_cell`], which holds the cell's lock for the whole
//! round trip so concurrent callers queue behind one request and then reuse
//! its result.

use crate::error::OAuthError;

use common::{HttpStatusCode, RedactedToken};

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Access and refresh token of one authorization, always set together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access: RedactedToken,
    pub refresh: RedactedToken,
    /// Unix seconds.
    pub expires_at: u64,
    pub issuer: String,
}

impl TokenSet {
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// Either no authorization yet, or a complete [`TokenSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OAuthToken(Option<TokenSet>);

impl OAuthToken {
    pub fn new(tokens: TokenSet) -> Self {
        OAuthToken(Some(tokens))
    }

    pub fn get(&self) -> Option<&TokenSet> {
        self.0.as_ref()
    }

    pub fn set(&mut self, tokens: TokenSet) {
        self.0 = Some(tokens);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn access(&self) -> Option<&str> {
        self.0.as_ref().map(|tokens| tokens.access.expose())
    }
}

pub type TokenCell = Arc<Mutex<OAuthToken>>;

pub fn new_cell(token: OAuthToken) -> TokenCell {
    Arc::new(Mutex::new(token))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct TokenClient {
    client: Client,
    token_endpoint: Url,
    client_id: String,
}

impl TokenClient {
    pub fn new(client: Client, token_endpoint: Url, client_id: impl Into<String>) -> Self {
        TokenClient {
            client,
            token_endpoint,
            client_id: client_id.into(),
        }
    }

    pub async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &str,
        issuer: &str,
    ) -> Result<TokenSet, OAuthError> {
        debug!("Exchanging authorization code at {}", self.token_endpoint);
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier),
            ("client_id", self.client_id.as_str()),
        ];
        let response = self.post(&form).await?;
        let refresh = response
            .refresh_token
            .clone()
            .ok_or_else(|| OAuthError::missing_token("token response lacks refresh_token"))?;
        Ok(into_token_set(response, refresh, issuer))
    }

    /// Refreshes `current`. Keeps the old refresh token when the server does
    /// not rotate it.
    pub async fn refresh(&self, current: &TokenSet) -> Result<TokenSet, OAuthError> {
        debug!("Refreshing access token at {}", self.token_endpoint);
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", current.refresh.expose()),
            ("client_id", self.client_id.as_str()),
        ];
        let response = self.post(&form).await?;
        let refresh = response
            .refresh_token
            .clone()
            .unwrap_or_else(|| current.refresh.expose().to_string());
        Ok(into_token_set(response, refresh, &current.issuer))
    }

    /// Single-flight refresh of `cell`.
    ///
    /// `rejected_access` is the access token the caller saw fail. If the cell
    /// already holds a different one, another caller refreshed in the meantime
    /// and that result is returned without a request. `None` always refreshes.
    pub async fn refresh_cell(
        &self,
        cell: &TokenCell,
        rejected_access: Option<&str>,
    ) -> Result<TokenSet, OAuthError> {
        let mut token = cell.lock().await;
        let current = token
            .get()
            .cloned()
            .ok_or_else(|| OAuthError::missing_token("no token to refresh"))?;

        if let Some(rejected) = rejected_access
            && current.access.expose() != rejected
        {
            debug!("Access token already refreshed by another caller");
            return Ok(current);
        }

        let refreshed = self.refresh(&current).await?;
        token.set(refreshed.clone());
        info!("Access token refreshed");
        Ok(refreshed)
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<TokenResponse, OAuthError> {
        let response = self
            .client
            .post(self.token_endpoint.clone())
            .form(form)
            .send()
            .await?;

        let status = HttpStatusCode(response.status().as_u16());
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(error) => match error.error_description {
                    Some(description) => format!("{}: {description}", error.error),
                    None => error.error,
                },
                Err(_) => body,
            };
            return Err(OAuthError::token(status, message));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn into_token_set(response: TokenResponse, refresh: String, issuer: &str) -> TokenSet {
    let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
    TokenSet {
        access: RedactedToken::new(response.access_token),
        refresh: RedactedToken::new(refresh),
        expires_at: unix_now().saturating_add(expires_in),
        issuer: issuer.to_string(),
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
