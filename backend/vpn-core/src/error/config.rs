use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Read Error: {path}: {source} {location}")]
    ReadError {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Parse Error: {path}: {reason} {location}")]
    ParseError {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    #[error("Config Write Error: {path}: {source} {location}")]
    WriteError {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Directory Not Found Error: {path} {location}")]
    DirectoryNotFound {
        location: ErrorLocation,
        path: PathBuf,
    },

    #[error("Config Serialization Error: {reason} {location}")]
    SerializeError {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Config Validation Error: {reason} {location}")]
    ValidationError {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Logger Error: {reason} {location}")]
    LoggerError {
        location: ErrorLocation,
        reason: String,
    },
}

impl ConfigError {
    pub fn message(&self) -> String {
        match self {
            ConfigError::ReadError { path, source, .. }
            | ConfigError::WriteError { path, source, .. } => {
                format!("{}: {source}", path.display())
            }
            ConfigError::ParseError { path, reason, .. } => {
                format!("{}: {reason}", path.display())
            }
            ConfigError::DirectoryNotFound { path, .. } => {
                format!("directory not found: {}", path.display())
            }
            ConfigError::SerializeError { reason, .. }
            | ConfigError::ValidationError { reason, .. }
            | ConfigError::LoggerError { reason, .. } => reason.clone(),
        }
    }
}
