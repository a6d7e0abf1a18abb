//! Pure data shared by the VPN core: server kinds, profiles, discovery
//! documents and the connection profile handed to the host. No I/O lives here.

pub mod connection_profile;
pub mod discovery;
pub mod error;
pub mod profile;
pub mod server;

#[cfg(test)]
mod tests;

pub use common::ErrorLocation;
pub use connection_profile::builder::ConnectionProfileBuilder;
pub use connection_profile::{ConnectionProfile, RemoteEndpoint, Transport};
pub use discovery::{
    DiscoveryServer, DisplayName, Organization, OrganizationList, ServerList,
};
pub use error::model_error::ModelError;
pub use profile::{Profile, ProfileList, Protocol};
pub use server::ServerType;
