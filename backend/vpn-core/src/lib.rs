pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fsm;
pub mod logger;
pub mod oauth;
pub mod server;
pub mod transport;

#[cfg(test)]
mod tests;

pub use client::Client;
pub use config::settings::ClientSettings;
pub use error::{CoreError, ErrorKind};
pub use fsm::{Fsm, StateCallback, StateData, StateId};

pub const LOOPBACK_HOST: &str = "127.0.0.1";
pub const LOOPBACK_BIND_ADDRESS: &str = const_format::concatcp!(LOOPBACK_HOST, ":0");
pub const LOOPBACK_BASE_URL: &str = const_format::concatcp!("http://", LOOPBACK_HOST);
pub const CALLBACK_PATH: &str = "/callback";

pub const OAUTH_SCOPE: &str = "config";
pub const WELL_KNOWN_PATH: &str = ".well-known/vpn-user-portal";
pub const API_V3_KEY: &str = "http://eduvpn.org/api#3";

pub const DEFAULT_DISCOVERY_URL: &str = "https://disco.eduvpn.org/v2/";
