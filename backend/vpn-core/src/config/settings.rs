use crate::DEFAULT_DISCOVERY_URL;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

const DEFAULT_LOCALE: &str = "en";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Host-provided settings of a client registration.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Doubles as the OAuth `client_id` and the state file name.
    pub app_id: String,
    /// Empty means `dirs::config_dir()/<app_id>`.
    pub config_dir: PathBuf,
    pub locale: String,
    pub debug: bool,
    pub discovery_url: String,
    pub http_timeout: Duration,
}

impl ClientSettings {
    pub fn new(app_id: impl Into<String>, config_dir: impl Into<PathBuf>) -> Self {
        ClientSettings {
            app_id: app_id.into(),
            config_dir: config_dir.into(),
            locale: String::from(DEFAULT_LOCALE),
            debug: false,
            discovery_url: String::from(DEFAULT_DISCOVERY_URL),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = url.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("app_id cannot be empty"),
            });
        }

        if self.app_id.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("app_id cannot contain path separators: {}", self.app_id),
            });
        }

        self.discovery_base()?;

        if self.http_timeout.is_zero() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("http_timeout must be non-zero"),
            });
        }

        Ok(())
    }

    /// Discovery URL as a directory so file names join below it.
    #[track_caller]
    pub fn discovery_base(&self) -> Result<Url, ConfigError> {
        let caller = ErrorLocation::caller();
        let invalid = |reason: String| ConfigError::ValidationError {
            location: caller,
            reason,
        };

        let mut url = Url::parse(&self.discovery_url)
            .map_err(|e| invalid(format!("Invalid discovery URL {}: {e}", self.discovery_url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "Invalid discovery URL format: {}",
                self.discovery_url
            )));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    #[track_caller]
    pub fn resolved_config_dir(&self) -> Result<PathBuf, ConfigError> {
        if !self.config_dir.as_os_str().is_empty() {
            return Ok(self.config_dir.clone());
        }

        dirs::config_dir()
            .map(|dir| dir.join(&self.app_id))
            .ok_or_else(|| ConfigError::DirectoryNotFound {
                location: ErrorLocation::from(Location::caller()),
                path: PathBuf::from(&self.app_id),
            })
    }
}
