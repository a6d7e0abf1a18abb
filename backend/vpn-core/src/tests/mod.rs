mod config;
mod error;
mod fsm;
mod listener;
mod logger;
mod pkce;
mod registry;
mod transport;
