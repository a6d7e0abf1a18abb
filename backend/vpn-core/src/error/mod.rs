pub mod config;
pub mod discovery;
pub mod fsm;
pub mod oauth;
pub mod server;

pub use config::ConfigError;
pub use discovery::DiscoveryError;
pub use fsm::FsmError;
pub use oauth::OAuthError;
pub use server::ServerError;

use common::HttpStatusCode;
use models::ModelError;

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::Serialize;
use thiserror::Error;

/// Coarse classification hosts use to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Bad input: URLs, callback parameters, profile ids, settings.
    Validation,
    /// The peer answered, but not in a way we can use.
    Protocol,
    /// Transport failures talking to a server or discovery.
    Network,
    /// The operation does not fit the current client state.
    State,
    /// The user or host aborted a pending step.
    Cancellation,
    /// Reading or writing local files.
    Storage,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Protocol => "ProtocolError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::State => "StateError",
            ErrorKind::Cancellation => "CancellationError",
            ErrorKind::Storage => "StorageError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Fsm(#[from] FsmError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Fsm(error) => match error {
                FsmError::WaitCancelled { .. } => ErrorKind::Cancellation,
                FsmError::InvalidTransition { .. } | FsmError::NotRegistered { .. } => {
                    ErrorKind::State
                }
            },
            CoreError::OAuth(error) => match error {
                OAuthError::Cancelled { .. } => ErrorKind::Cancellation,
                OAuthError::Callback { .. } | OAuthError::UrlParse { .. } => ErrorKind::Validation,
                OAuthError::Listener { .. } | OAuthError::Http { .. } => ErrorKind::Network,
                OAuthError::MissingToken { .. } => ErrorKind::State,
                OAuthError::Authorization { .. }
                | OAuthError::Token { .. }
                | OAuthError::Json { .. } => ErrorKind::Protocol,
            },
            CoreError::Server(error) => match error {
                ServerError::InvalidUrl { .. } => ErrorKind::Validation,
                ServerError::NotFound { .. } => ErrorKind::State,
                ServerError::Metadata { .. } | ServerError::Http { .. } => ErrorKind::Network,
                ServerError::Api { .. }
                | ServerError::Unsupported { .. }
                | ServerError::Json { .. } => ErrorKind::Protocol,
            },
            CoreError::Discovery(error) => match error {
                DiscoveryError::NotFound { .. } | DiscoveryError::UrlParse { .. } => {
                    ErrorKind::Validation
                }
                DiscoveryError::Fetch { .. } | DiscoveryError::Http { .. } => ErrorKind::Network,
                DiscoveryError::Signature { .. } | DiscoveryError::Json { .. } => {
                    ErrorKind::Protocol
                }
            },
            CoreError::Config(error) => match error {
                ConfigError::ValidationError { .. } | ConfigError::ParseError { .. } => {
                    ErrorKind::Validation
                }
                _ => ErrorKind::Storage,
            },
            CoreError::Model(_) => ErrorKind::Validation,
        }
    }

    /// Bare message without the kind prefix or source location.
    pub fn message(&self) -> String {
        match self {
            CoreError::Fsm(error) => error.message().to_string(),
            CoreError::OAuth(error) => error.message().to_string(),
            CoreError::Server(error) => error.message().to_string(),
            CoreError::Discovery(error) => error.message().to_string(),
            CoreError::Config(error) => error.message(),
            CoreError::Model(error) => error.message().to_string(),
        }
    }

    pub fn status_code(&self) -> Option<HttpStatusCode> {
        match self {
            CoreError::OAuth(OAuthError::Token { status_code, .. })
            | CoreError::Discovery(DiscoveryError::Fetch { status_code, .. }) => {
                Some(*status_code)
            }
            CoreError::Server(error) => error.status_code(),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::OAuth(error) => error.is_retryable(),
            CoreError::Server(ServerError::Http { .. } | ServerError::Metadata { .. })
            | CoreError::Discovery(DiscoveryError::Http { .. }) => true,
            _ => self.status_code().is_some_and(|code| code.is_retryable()),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }
}
