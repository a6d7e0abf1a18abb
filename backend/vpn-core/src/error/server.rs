use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ServerError {
    #[error("Server URL Error: {message} {location}")]
    InvalidUrl {
        message: String,
        location: ErrorLocation,
    },

    #[error("Server Not Found Error: {message} {location}")]
    NotFound {
        message: String,
        location: ErrorLocation,
    },

    #[error("Server Metadata Error: {message} {location}")]
    Metadata {
        message: String,
        location: ErrorLocation,
    },

    #[error("Server API Error: HTTP {status_code} - {message} {location}")]
    Api {
        message: String,
        status_code: HttpStatusCode,
        location: ErrorLocation,
    },

    #[error("Server Unsupported Error: {message} {location}")]
    Unsupported {
        message: String,
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
}

impl ServerError {
    #[track_caller]
    pub fn invalid_url(message: impl Into<String>) -> Self {
        ServerError::InvalidUrl {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_found(identity: &str) -> Self {
        ServerError::NotFound {
            message: format!("no server with identity '{identity}'"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn metadata(message: impl Into<String>) -> Self {
        ServerError::Metadata {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn api(status_code: HttpStatusCode, message: impl Into<String>) -> Self {
        ServerError::Api {
            message: message.into(),
            status_code,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unsupported(message: impl Into<String>) -> Self {
        ServerError::Unsupported {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServerError::InvalidUrl { message, .. }
            | ServerError::NotFound { message, .. }
            | ServerError::Metadata { message, .. }
            | ServerError::Api { message, .. }
            | ServerError::Unsupported { message, .. }
            | ServerError::Http { message, .. }
            | ServerError::Json { message, .. } => message,
        }
    }

    pub fn status_code(&self) -> Option<HttpStatusCode> {
        match self {
            ServerError::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code().is_some_and(|code| code.is_unauthorized())
    }
}

impl From<url::ParseError> for ServerError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        ServerError::InvalidUrl {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for ServerError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        ServerError::Http {
            is_timeout: error.is_timeout(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for ServerError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ServerError::Json {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
