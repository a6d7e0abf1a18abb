use super::Client;
use crate::error::CoreError;
use crate::fsm::{StateData, StateId};
use crate::oauth::OAuthSession;
use crate::server::AuthContext;

use log::{debug, info, warn};

impl Client {
    /// Leaves the machine in `Authorized` with a usable token for `auth`.
    ///
    /// No token runs the browser flow. An expired token is refreshed; if that
    /// fails the token is dropped and the browser flow runs once.
    pub(crate) async fn ensure_authorized(&self, auth: &AuthContext) -> Result<(), CoreError> {
        let current = auth.token.lock().await.get().cloned();

        match current {
            None => {
                debug!("No token for {}, starting authorization", auth.identity);
                self.authorize(auth).await
            }
            Some(tokens) if tokens.is_expired() => {
                match self
                    .token_client(auth)
                    .refresh_cell(&auth.token, Some(tokens.access.expose()))
                    .await
                {
                    Ok(_) => self.transition(StateId::Authorized, StateData::None).await,
                    Err(e) => {
                        if e.is_rejected_grant() {
                            info!("Refresh token for {} rejected, re-authorizing", auth.identity);
                        } else {
                            warn!("Refreshing expired token failed, re-authorizing: {e}");
                        }
                        auth.token.lock().await.clear();
                        self.authorize(auth).await
                    }
                }
            }
            Some(_) => self.transition(StateId::Authorized, StateData::None).await,
        }
    }

    /// Runs one authorization code attempt through `OAuthStarted` to `Authorized`.
    pub(crate) async fn authorize(&self, auth: &AuthContext) -> Result<(), CoreError> {
        let tokens = self.token_client(auth);

        let mut session = OAuthSession::start(
            &auth.issuer,
            &self.settings.app_id,
            &auth.endpoints.authorization,
        )
        .await?;

        let cancel = session.cancel_handle();
        self.pending.lock().await.oauth = Some(cancel.clone());

        let started = self
            .transition(
                StateId::OAuthStarted,
                StateData::OAuthStarted {
                    url: session.authorization_url().to_string(),
                    port: session.port(),
                    cancel,
                },
            )
            .await;
        if let Err(e) = started {
            self.pending.lock().await.oauth = None;
            return Err(e);
        }

        let result = session.authorize(&tokens).await;
        self.pending.lock().await.oauth = None;
        let token_set = result?;

        auth.token.lock().await.set(token_set);
        info!("Authorized with {}", auth.identity);
        self.transition(StateId::Authorized, StateData::None).await
    }
}
