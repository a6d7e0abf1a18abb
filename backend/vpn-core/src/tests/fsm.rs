use crate::fsm::graph::{GRAPH_FILE_NAME, render};
use crate::fsm::{Fsm, StateData, StateId, StateRegistry};

use std::sync::{Arc, Mutex};

type Seen = Arc<Mutex<Vec<(StateId, StateId)>>>;

fn recording_fsm() -> (Fsm, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let fsm = Fsm::new(Box::new(move |old: StateId, new: StateId, _data: &StateData| {
        sink.lock().unwrap().push((old, new));
        true
    }));
    (fsm, seen)
}

/// **VALUE**: Verifies that a transition missing from the table is refused without side effects.
///
/// **WHY THIS MATTERS**: The UI mirrors the state machine. A transition that changes the
/// state or fires the callback without being allowed would desynchronize host and core.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The state is updated before the table lookup
/// - The callback runs for rejected transitions
#[test]
fn given_deregistered_when_jumping_to_got_config_then_rejected_without_callback() {
    // GIVEN: A fresh machine
    let (mut fsm, seen) = recording_fsm();

    // WHEN: Attempting an illegal transition
    let applied = fsm.transition(StateId::GotConfig, StateData::None);

    // THEN: Nothing changed and nobody was told
    assert!(!applied);
    assert!(fsm.in_state(StateId::Deregistered));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn given_allowed_transition_when_applied_then_callback_sees_old_and_new() {
    // GIVEN
    let (mut fsm, seen) = recording_fsm();

    // WHEN
    assert!(fsm.transition(StateId::NoServer, StateData::None));
    assert!(fsm.transition(StateId::LoadingServer, StateData::None));

    // THEN
    assert_eq!(fsm.current(), StateId::LoadingServer);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (StateId::Deregistered, StateId::NoServer),
            (StateId::NoServer, StateId::LoadingServer),
        ]
    );
}

#[test]
fn given_callback_declines_when_transitioning_then_state_still_changes() {
    // GIVEN: A callback that reports it did not handle anything
    let mut fsm = Fsm::new(Box::new(|_: StateId, _: StateId, _: &StateData| false));

    // WHEN
    let handled = fsm.transition_with_veto(StateId::NoServer, StateData::None);

    // THEN: The answer is reported but does not block
    assert_eq!(handled, Some(false));
    assert!(fsm.in_state(StateId::NoServer));
}

#[test]
fn given_illegal_target_when_required_then_error_names_both_states() {
    let (mut fsm, _) = recording_fsm();

    let error = fsm.require(StateId::Connected, StateData::None).unwrap_err();

    assert_eq!(error.message(), "invalid transition from Deregistered to Connected");
}

/// **VALUE**: Pins the session cycle of the transition table.
///
/// **BUG THIS CATCHES**: Would catch edits to the table that break connect/disconnect.
#[test]
fn given_standard_registry_when_queried_then_session_cycle_is_allowed() {
    let registry = StateRegistry::standard();

    assert!(registry.allows(StateId::GotConfig, StateId::Connecting));
    assert!(registry.allows(StateId::Connecting, StateId::Connected));
    assert!(registry.allows(StateId::Connected, StateId::Disconnecting));
    assert!(registry.allows(StateId::Disconnecting, StateId::GotConfig));
    assert!(!registry.allows(StateId::Connected, StateId::NoServer));
    assert!(!registry.allows(StateId::ChosenProfile, StateId::OAuthStarted));
    assert!(registry.transitions(StateId::Deregistered).len() == 1);
}

#[test]
fn given_every_state_when_listing_transitions_then_each_has_an_exit() {
    let registry = StateRegistry::standard();

    for state in StateId::ALL {
        assert!(
            !registry.transitions(state).is_empty(),
            "{state} has no outgoing transition"
        );
    }
}

#[test]
fn given_registry_when_rendering_graph_then_mermaid_with_highlight() {
    // GIVEN/WHEN
    let graph = render(&StateRegistry::standard(), StateId::OAuthStarted);

    // THEN
    assert!(graph.starts_with("graph TD\n"));
    assert!(graph.contains("Deregistered(Deregistered) -->|Client registers| No_Server"));
    assert!(graph.contains("style OAuth_Started fill:cyan"));
}

#[test]
fn given_debug_graph_dir_when_transitioning_then_graph_file_tracks_current_state() {
    // GIVEN
    let dir = tempfile::tempdir().unwrap();
    let mut fsm = Fsm::new(Box::new(|_: StateId, _: StateId, _: &StateData| true)).with_debug_graph(dir.path().to_path_buf());

    // WHEN
    fsm.transition(StateId::NoServer, StateData::None);

    // THEN
    let graph = std::fs::read_to_string(dir.path().join(GRAPH_FILE_NAME)).unwrap();
    assert!(graph.contains("style No_Server fill:cyan"));
}
