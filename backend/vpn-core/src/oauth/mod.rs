//! OAuth 2.0 authorization code flow with PKCE over a loopback redirect.

pub mod listener;
pub mod pkce;
pub mod session;
pub mod token;

pub use listener::{CallbackListener, CallbackParams};
pub use pkce::Pkce;
pub use session::{CancelHandle, OAuthSession, SessionStatus, validate_callback};
pub use token::{OAuthToken, TokenCell, TokenClient, TokenSet};
