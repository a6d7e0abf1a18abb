//! Errors of the authorization code flow and the token endpoint.
//!
//! Callback validation failures keep a bare, stable `message` so callers can
//! match on prefixes (`missing parameter '<key>'`, `failed matching state`,
//! `failed matching ISS`) without parsing the Display output.

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

pub const MISSING_PARAMETER_PREFIX: &str = "missing parameter";
pub const STATE_MISMATCH_MESSAGE: &str = "failed matching state";
pub const ISSUER_MISMATCH_MESSAGE: &str = "failed matching ISS";

#[derive(Debug, ThisError)]
pub enum OAuthError {
    #[error("OAuth Authorization Error: {message} {location}")]
    Authorization {
        message: String,
        location: ErrorLocation,
    },

    #[error("OAuth Callback Error: {message} {location}")]
    Callback {
        message: String,
        location: ErrorLocation,
    },

    #[error("OAuth Listener Error: {message} {location}")]
    Listener {
        message: String,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("OAuth Token Error: HTTP {status_code} - {message} {location}")]
    Token {
        message: String,
        status_code: HttpStatusCode,
        location: ErrorLocation,
    },

    #[error("HTTP Error: {message} {location}")]
    Http {
        message: String,
        is_timeout: bool,
        location: ErrorLocation,
    },

    #[error("JSON Error: {message} {location}")]
    Json {
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },

    #[error("OAuth Missing Token Error: {message} {location}")]
    MissingToken {
        message: String,
        location: ErrorLocation,
    },

    #[error("OAuth Cancelled {location}")]
    Cancelled { location: ErrorLocation },
}

impl OAuthError {
    #[track_caller]
    pub fn authorization(message: impl Into<String>) -> Self {
        OAuthError::Authorization {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn missing_parameter(key: &str) -> Self {
        OAuthError::Callback {
            message: format!("{MISSING_PARAMETER_PREFIX} '{key}'"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn state_mismatch(got: &str) -> Self {
        OAuthError::Callback {
            message: format!("{STATE_MISMATCH_MESSAGE}, got: '{got}'"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn issuer_mismatch(got: &str, expected: &str) -> Self {
        OAuthError::Callback {
            message: format!("{ISSUER_MISMATCH_MESSAGE}, got: '{got}', want: '{expected}'"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn listener(message: impl Into<String>, source: std::io::Error) -> Self {
        OAuthError::Listener {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    #[track_caller]
    pub fn token(status_code: HttpStatusCode, message: impl Into<String>) -> Self {
        OAuthError::Token {
            message: message.into(),
            status_code,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn missing_token(message: impl Into<String>) -> Self {
        OAuthError::MissingToken {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn cancelled() -> Self {
        OAuthError::Cancelled {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            OAuthError::Authorization { message, .. }
            | OAuthError::Callback { message, .. }
            | OAuthError::Listener { message, .. }
            | OAuthError::Token { message, .. }
            | OAuthError::Http { message, .. }
            | OAuthError::Json { message, .. }
            | OAuthError::UrlParse { message, .. }
            | OAuthError::MissingToken { message, .. } => message,
            OAuthError::Cancelled { .. } => "authorization cancelled",
        }
    }

    /// Whether the token endpoint rejected the grant itself, as opposed to
    /// failing for transport reasons.
    pub fn is_rejected_grant(&self) -> bool {
        matches!(self, OAuthError::Token { status_code, .. } if status_code.is_client_error())
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            OAuthError::Http { .. } => true,
            OAuthError::Token { status_code, .. } => status_code.is_retryable(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        OAuthError::Http {
            is_timeout: error.is_timeout(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for OAuthError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        OAuthError::Json {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for OAuthError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        OAuthError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
