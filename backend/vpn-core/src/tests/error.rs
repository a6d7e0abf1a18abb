use crate::error::{
    ConfigError, CoreError, DiscoveryError, ErrorKind, FsmError, OAuthError, ServerError,
};
use crate::fsm::{ErrorSummary, StateId};

use common::HttpStatusCode;
use models::ModelError;

/// **VALUE**: Verifies the kind each error family maps to.
///
/// **WHY THIS MATTERS**: Hosts pick their UI from the kind alone: a cancellation
/// is silent, a validation error points at user input, a network error offers retry.
///
/// **BUG THIS CATCHES**: Would catch a cancelled authorization being reported as a
/// protocol failure.
#[test]
fn given_each_error_family_when_classifying_then_expected_kind() {
    let cases: Vec<(CoreError, ErrorKind)> = vec![
        (OAuthError::cancelled().into(), ErrorKind::Cancellation),
        (FsmError::wait_cancelled("profile").into(), ErrorKind::Cancellation),
        (OAuthError::missing_parameter("iss").into(), ErrorKind::Validation),
        (OAuthError::state_mismatch("x").into(), ErrorKind::Validation),
        (
            OAuthError::token(HttpStatusCode(400), "invalid_grant").into(),
            ErrorKind::Protocol,
        ),
        (ServerError::invalid_url("bad").into(), ErrorKind::Validation),
        (ServerError::metadata("down").into(), ErrorKind::Network),
        (
            ServerError::api(HttpStatusCode(500), "boom").into(),
            ErrorKind::Protocol,
        ),
        (ServerError::not_found("x").into(), ErrorKind::State),
        (
            FsmError::invalid_transition(StateId::NoServer, StateId::Connected).into(),
            ErrorKind::State,
        ),
        (DiscoveryError::signature("bad sig").into(), ErrorKind::Protocol),
        (DiscoveryError::not_found("nl").into(), ErrorKind::Validation),
        (ModelError::validation("Config is required").into(), ErrorKind::Validation),
    ];

    for (error, expected) in cases {
        assert_eq!(error.kind(), expected, "{error}");
    }
}

#[test]
fn given_missing_parameter_when_displayed_then_kind_message_and_location() {
    let error = OAuthError::missing_parameter("state");

    let rendered = error.to_string();

    assert!(
        rendered.starts_with("OAuth Callback Error: missing parameter 'state' ["),
        "{rendered}"
    );
    assert!(rendered.contains("error.rs:"), "{rendered}");
}

#[test]
fn given_invalid_transition_when_messaging_then_names_both_states() {
    let error: CoreError = FsmError::invalid_transition(StateId::NoServer, StateId::Connected).into();

    assert_eq!(
        error.message(),
        "invalid transition from No_Server to Connected"
    );
}

#[test]
fn given_status_codes_when_checking_retry_then_only_transient_failures_retry() {
    let unavailable: CoreError = ServerError::api(HttpStatusCode(503), "later").into();
    let forbidden: CoreError = ServerError::api(HttpStatusCode(403), "no").into();
    let unauthorized = ServerError::api(HttpStatusCode::UNAUTHORIZED, "expired");

    assert!(unavailable.is_retryable());
    assert!(!forbidden.is_retryable());
    assert!(unauthorized.is_unauthorized());
    assert_eq!(forbidden.status_code(), Some(HttpStatusCode(403)));
}

#[test]
fn given_core_error_when_summarized_then_kind_and_bare_message() {
    let error: CoreError = OAuthError::cancelled().into();

    let summary = ErrorSummary::from(&error);

    assert_eq!(summary.kind, ErrorKind::Cancellation);
    assert_eq!(summary.message, "authorization cancelled");
    assert!(error.is_cancellation());
    assert_eq!(ErrorKind::Cancellation.to_string(), "CancellationError");
}

#[test]
fn given_logger_failure_when_classified_then_storage() {
    let error: CoreError = ConfigError::LoggerError {
        location: common::ErrorLocation::from(std::panic::Location::caller()),
        reason: String::from("disk full"),
    }
    .into();

    assert_eq!(error.kind(), ErrorKind::Storage);
}
