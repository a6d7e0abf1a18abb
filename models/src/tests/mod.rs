mod connection_profile;
mod discovery;
mod profile;
