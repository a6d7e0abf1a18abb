use crate::fsm::StateId;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum FsmError {
    #[error("FSM Error: {message} {location}")]
    InvalidTransition {
        from: StateId,
        to: StateId,
        message: String,
        location: ErrorLocation,
    },

    #[error("FSM Error: {message} {location}")]
    NotRegistered {
        message: String,
        location: ErrorLocation,
    },

    #[error("FSM Wait Cancelled Error: {message} {location}")]
    WaitCancelled {
        message: String,
        location: ErrorLocation,
    },
}

impl FsmError {
    #[track_caller]
    pub fn invalid_transition(from: StateId, to: StateId) -> Self {
        FsmError::InvalidTransition {
            from,
            to,
            message: format!("invalid transition from {from} to {to}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_registered() -> Self {
        FsmError::NotRegistered {
            message: String::from("client is not registered"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn wait_cancelled(what: &str) -> Self {
        FsmError::WaitCancelled {
            message: format!("waiting for {what} was cancelled"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FsmError::InvalidTransition { message, .. }
            | FsmError::NotRegistered { message, .. }
            | FsmError::WaitCancelled { message, .. } => message,
        }
    }
}
