use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::Serialize;

/// Every state the client can be in. `Deregistered` is initial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StateId {
    Deregistered,
    NoServer,
    AskLocation,
    ChosenLocation,
    LoadingServer,
    ChosenServer,
    OAuthStarted,
    Authorized,
    RequestConfig,
    AskProfile,
    ChosenProfile,
    GotConfig,
    Connecting,
    Disconnecting,
    Connected,
}

impl StateId {
    pub const ALL: [StateId; 15] = [
        StateId::Deregistered,
        StateId::NoServer,
        StateId::AskLocation,
        StateId::ChosenLocation,
        StateId::LoadingServer,
        StateId::ChosenServer,
        StateId::OAuthStarted,
        StateId::Authorized,
        StateId::RequestConfig,
        StateId::AskProfile,
        StateId::ChosenProfile,
        StateId::GotConfig,
        StateId::Connecting,
        StateId::Disconnecting,
        StateId::Connected,
    ];

    /// Stable name used in logs and the debug graph.
    pub fn name(&self) -> &'static str {
        match self {
            StateId::Deregistered => "Deregistered",
            StateId::NoServer => "No_Server",
            StateId::AskLocation => "Ask_Location",
            StateId::ChosenLocation => "Chosen_Location",
            StateId::LoadingServer => "Loading_Server",
            StateId::ChosenServer => "Chosen_Server",
            StateId::OAuthStarted => "OAuth_Started",
            StateId::Authorized => "Authorized",
            StateId::RequestConfig => "Request_Config",
            StateId::AskProfile => "Ask_Profile",
            StateId::ChosenProfile => "Chosen_Profile",
            StateId::GotConfig => "Got_Config",
            StateId::Connecting => "Connecting",
            StateId::Disconnecting => "Disconnecting",
            StateId::Connected => "Connected",
        }
    }
}

impl Display for StateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: StateId,
    pub description: &'static str,
}

const fn to(to: StateId, description: &'static str) -> Transition {
    Transition { to, description }
}

/// Allowed transitions per source state. Immutable once built.
#[derive(Debug, Clone)]
pub struct StateRegistry {
    transitions: BTreeMap<StateId, Vec<Transition>>,
}

impl StateRegistry {
    pub fn standard() -> Self {
        use StateId::*;

        let table: [(StateId, Vec<Transition>); 15] = [
            (Deregistered, vec![to(NoServer, "Client registers")]),
            (
                NoServer,
                vec![
                    to(LoadingServer, "User clicks a server in the UI"),
                    to(Connected, "The VPN is still active"),
                ],
            ),
            (
                AskLocation,
                vec![
                    to(ChosenLocation, "Location chosen"),
                    to(NoServer, "Go back or error"),
                    to(GotConfig, "Go back or error"),
                ],
            ),
            (
                ChosenLocation,
                vec![
                    to(ChosenServer, "Server has been chosen"),
                    to(NoServer, "Go back or error"),
                    to(GotConfig, "Go back or error"),
                ],
            ),
            (
                LoadingServer,
                vec![
                    to(ChosenServer, "Server info loaded"),
                    to(AskLocation, "User chooses a Secure Internet server but no location is configured"),
                    to(NoServer, "Go back or error"),
                    to(GotConfig, "Go back or error"),
                ],
            ),
            (
                ChosenServer,
                vec![
                    to(Authorized, "Found tokens in config"),
                    to(OAuthStarted, "No tokens found in config"),
                    to(NoServer, "Go back or error"),
                    to(GotConfig, "Go back or error"),
                ],
            ),
            (
                OAuthStarted,
                vec![
                    to(Authorized, "User authorizes with browser"),
                    to(NoServer, "Go back or error"),
                    to(GotConfig, "Go back or error"),
                ],
            ),
            (
                Authorized,
                vec![
                    to(OAuthStarted, "Re-authorize with OAuth"),
                    to(RequestConfig, "Client requests a config"),
                    to(NoServer, "Go back or error"),
                    to(GotConfig, "Go back or error"),
                ],
            ),
            (
                RequestConfig,
                vec![
                    to(AskProfile, "Multiple profiles found and no profile chosen"),
                    to(ChosenProfile, "Only one profile or profile already chosen"),
                    to(OAuthStarted, "Re-authorize"),
                    to(NoServer, "Go back or error"),
                    to(GotConfig, "Go back or error"),
                ],
            ),
            (
                AskProfile,
                vec![
                    to(ChosenProfile, "User chooses profile"),
                    to(NoServer, "Go back or error"),
                    to(GotConfig, "Go back or error"),
                ],
            ),
            (
                ChosenProfile,
                vec![
                    to(GotConfig, "Config received"),
                    to(NoServer, "Go back or error"),
                ],
            ),
            (
                GotConfig,
                vec![
                    to(NoServer, "User wants to choose a new server"),
                    to(LoadingServer, "User clicks a server in the UI"),
                    to(Connecting, "OS reports it is trying to connect"),
                ],
            ),
            (
                Connecting,
                vec![
                    to(GotConfig, "Cancel or error"),
                    to(Connected, "Done connecting"),
                ],
            ),
            (Connected, vec![to(Disconnecting, "App wants to disconnect")]),
            (
                Disconnecting,
                vec![
                    to(GotConfig, "Done disconnecting"),
                    to(Connected, "Cancel or error"),
                ],
            ),
        ];

        StateRegistry {
            transitions: table.into_iter().collect(),
        }
    }

    pub fn transitions(&self, from: StateId) -> &[Transition] {
        self.transitions
            .get(&from)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn allows(&self, from: StateId, to: StateId) -> bool {
        self.transitions(from)
            .iter()
            .any(|transition| transition.to == to)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, &Transition)> {
        self.transitions
            .iter()
            .flat_map(|(from, transitions)| transitions.iter().map(move |t| (*from, t)))
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        StateRegistry::standard()
    }
}
