use crate::{ConnectionProfile, ModelError, Protocol, RemoteEndpoint};

/// Builder for validated [`ConnectionProfile`] values.
#[derive(Debug, Default)]
pub struct ConnectionProfileBuilder {
    protocol: Option<Protocol>,
    config: Option<String>,
    remotes: Vec<RemoteEndpoint>,
}

impl ConnectionProfileBuilder {
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    pub fn with_remotes(mut self, remotes: Vec<RemoteEndpoint>) -> Self {
        self.remotes = remotes;
        self
    }

    pub fn with_remote(mut self, remote: RemoteEndpoint) -> Self {
        self.remotes.push(remote);
        self
    }

    #[track_caller]
    pub fn build(self) -> Result<ConnectionProfile, ModelError> {
        let protocol = self
            .protocol
            .ok_or_else(|| ModelError::validation("Protocol is required"))?;

        let config = self
            .config
            .ok_or_else(|| ModelError::validation("Config is required"))?;

        if config.trim().is_empty() {
            return Err(ModelError::validation("Config cannot be empty"));
        }

        if let Some(remote) = self.remotes.iter().find(|remote| remote.host.is_empty()) {
            return Err(ModelError::validation(format!(
                "Remote host cannot be empty: {remote}"
            )));
        }

        Ok(ConnectionProfile {
            protocol,
            config,
            remotes: self.remotes,
        })
    }
}
