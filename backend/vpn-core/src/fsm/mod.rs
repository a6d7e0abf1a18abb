//! Finite-state machine gating every client-visible state change.
//!
//! The machine owns the current state, the immutable transition table and a
//! single observer callback. A transition is applied only if the table allows
//! it; the callback then runs synchronously with `(old, new, &data)`.
//! The callback must not call back into the client that owns this machine.

pub mod data;
pub mod graph;
pub mod states;

pub use data::{ErrorSummary, Reply, StateData};
pub use states::{StateId, StateRegistry, Transition};

use crate::error::FsmError;

use std::path::PathBuf;

use log::{debug, warn};

/// Observer for state changes. The returned flag is informational only.
pub type StateCallback = Box<dyn FnMut(StateId, StateId, &StateData) -> bool + Send>;

pub struct Fsm {
    current: StateId,
    registry: StateRegistry,
    callback: StateCallback,
    graph_dir: Option<PathBuf>,
}

impl Fsm {
    pub fn new(callback: StateCallback) -> Self {
        Fsm {
            current: StateId::Deregistered,
            registry: StateRegistry::standard(),
            callback,
            graph_dir: None,
        }
    }

    /// Writes the Mermaid graph to `dir` after every transition.
    pub fn with_debug_graph(mut self, dir: PathBuf) -> Self {
        self.graph_dir = Some(dir);
        self.write_graph();
        self
    }

    pub fn current(&self) -> StateId {
        self.current
    }

    pub fn in_state(&self, state: StateId) -> bool {
        self.current == state
    }

    pub fn has_transition(&self, to: StateId) -> bool {
        self.registry.allows(self.current, to)
    }

    /// Applies the transition if allowed. Returns `false` and leaves the state
    /// untouched otherwise; the callback is not invoked in that case.
    pub fn transition(&mut self, to: StateId, data: StateData) -> bool {
        self.transition_with_veto(to, data).is_some()
    }

    /// Like [`Fsm::transition`] but hands back the callback's answer.
    pub fn transition_with_veto(&mut self, to: StateId, data: StateData) -> Option<bool> {
        if !self.has_transition(to) {
            warn!("Rejected state transition {} -> {}", self.current, to);
            return None;
        }

        let from = self.current;
        self.current = to;
        debug!("State transition {from} -> {to}");
        self.write_graph();

        let handled = (self.callback)(from, to, &data);
        if !handled {
            debug!("State callback did not handle {to}");
        }
        Some(handled)
    }

    #[track_caller]
    pub fn require(&mut self, to: StateId, data: StateData) -> Result<(), FsmError> {
        let from = self.current;
        if self.transition(to, data) {
            Ok(())
        } else {
            Err(FsmError::invalid_transition(from, to))
        }
    }

    fn write_graph(&self) {
        if let Some(dir) = &self.graph_dir
            && let Err(e) = graph::write(dir, &self.registry, self.current)
        {
            warn!("Failed to write FSM graph to {}: {e}", dir.display());
        }
    }
}
