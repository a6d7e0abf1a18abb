//! Shared primitives for the VPN client core.
//!
//! This crate holds the small building blocks every other crate leans on.
//! It has no knowledge of servers, tokens flows or the state machine.
//!
//! ## Architecture
//!
//! - **common** (this crate): error locations, HTTP status helpers, secrets
//! - **models**: Pure data structures (profiles, discovery documents)
//! - **vpn-core**: State machine, OAuth, server registry and the client facade

pub mod error;
pub mod http_status;
pub mod redacted_token;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use http_status::HttpStatusCode;
pub use redacted_token::RedactedToken;
