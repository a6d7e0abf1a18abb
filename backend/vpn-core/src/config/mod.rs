pub mod settings;

pub use settings::ClientSettings;

use crate::error::config::ConfigError;
use crate::oauth::token::OAuthToken;

use common::ErrorLocation;
use models::ServerType;

use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedServer {
    pub identity: String,
    pub kind: ServerType,
    pub home_url: String,
    pub base_url: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub token: OAuthToken,
}

/// Servers, tokens and selections that survive restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub servers: Vec<PersistedServer>,

    #[serde(default)]
    pub current: Option<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            servers: Vec::new(),
            current: None,
        }
    }
}

fn default_version() -> u32 {
    STATE_VERSION
}

pub fn state_file(config_dir: &Path, app_id: &str) -> PathBuf {
    config_dir.join(format!("{app_id}.json"))
}

impl PersistedState {
    /// Load state from `{config_dir}/{app_id}.json`.
    ///
    /// A missing file yields the empty state. A file that exists but cannot be
    /// read, parsed or validated is an error.
    pub fn load(config_dir: &Path, app_id: &str) -> Result<Self, ConfigError> {
        let state_path = state_file(config_dir, app_id);

        if !state_path.exists() {
            info!("State file not found at {}, starting empty", state_path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&state_path).map_err(|e| {
            warn!("Failed to read state file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: state_path.clone(),
                source: e,
            }
        })?;

        let state: PersistedState = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse state JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: state_path.clone(),
                reason: e.to_string(),
            }
        })?;

        state.validate()?;

        info!("State loaded from {}", state_path.display());
        Ok(state)
    }

    /// Save state to `{config_dir}/{app_id}.json` through a temp file and rename.
    pub fn save(&self, config_dir: &Path, app_id: &str) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let state_path = state_file(config_dir, app_id);
        let temp_path = config_dir.join(format!("{app_id}.json.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &state_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: state_path.clone(),
            source: e,
        })?;

        info!("State saved to {}", state_path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > STATE_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, STATE_VERSION
                ),
            });
        }

        for (index, server) in self.servers.iter().enumerate() {
            if server.identity.is_empty() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("Server {index} has an empty identity"),
                });
            }

            for url in [&server.home_url, &server.base_url] {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::ValidationError {
                        location: ErrorLocation::from(Location::caller()),
                        reason: format!("Invalid URL format: {}", url),
                    });
                }
            }

            if self.servers[..index]
                .iter()
                .any(|other| other.identity == server.identity)
            {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("Duplicate server: {}", server.identity),
                });
            }
        }

        if let Some(current) = &self.current
            && !self.servers.iter().any(|server| &server.identity == current)
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Current server {current} is not stored"),
            });
        }

        Ok(())
    }
}
