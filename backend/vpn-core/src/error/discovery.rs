use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DiscoveryError {
    #[error("Discovery Fetch Error: HTTP {status_code} - {message} {location}")]
    Fetch {
        message: String,
        status_code: HttpStatusCode,
        location: ErrorLocation,
    },

    #[error("Discovery Signature Error: {message} {location}")]
    Signature {
        message: String,
        location: ErrorLocation,
    },

    #[error("Discovery Lookup Error: {message} {location}")]
    NotFound {
        message: String,
        location: ErrorLocation,
    },

    #[error("HTTP Error: {message} {location}")]
    Http {
        message: String,
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
}

impl DiscoveryError {
    #[track_caller]
    pub fn fetch(status_code: HttpStatusCode, message: impl Into<String>) -> Self {
        DiscoveryError::Fetch {
            message: message.into(),
            status_code,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn signature(message: impl Into<String>) -> Self {
        DiscoveryError::Signature {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        DiscoveryError::NotFound {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DiscoveryError::Fetch { message, .. }
            | DiscoveryError::Signature { message, .. }
            | DiscoveryError::NotFound { message, .. }
            | DiscoveryError::Http { message, .. }
            | DiscoveryError::Json { message, .. }
            | DiscoveryError::UrlParse { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for DiscoveryError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        DiscoveryError::Http {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for DiscoveryError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        DiscoveryError::Json {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for DiscoveryError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        DiscoveryError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
