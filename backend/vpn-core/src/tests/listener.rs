use crate::error::OAuthError;
use crate::oauth::listener::{CallbackListener, CallbackParams, callback_query, parse_request_line};
use crate::oauth::session::{CancelHandle, validate_callback};

const STATE: &str = "expected-state";
const ISSUER: &str = "https://vpn.example.org/";

fn params(query: &str) -> CallbackParams {
    CallbackParams::parse(query)
}

fn callback_message(result: Result<String, OAuthError>) -> String {
    match result.unwrap_err() {
        error @ OAuthError::Callback { .. } => error.message().to_string(),
        other => panic!("expected callback error, got {other:?}"),
    }
}

#[test]
fn given_request_line_when_parsing_then_method_and_target_split() {
    assert_eq!(
        parse_request_line("GET /callback?code=1 HTTP/1.1"),
        Some(("GET", "/callback?code=1"))
    );
    assert_eq!(parse_request_line("garbage"), None);
    assert_eq!(callback_query("/callback?code=1&state=2"), Some("code=1&state=2"));
    assert_eq!(callback_query("/callback"), Some(""));
    assert_eq!(callback_query("/favicon.ico"), None);
}

#[test]
fn given_percent_encoded_query_when_parsing_then_values_decoded() {
    let parsed = params("iss=https%3A%2F%2Fvpn.example.org%2F&code=a+b");

    assert_eq!(parsed.get("iss"), Some(ISSUER));
    assert_eq!(parsed.get("code"), Some("a b"));
    assert_eq!(parsed.get("state"), None);
}

/// **VALUE**: Verifies the stable message for each missing redirect parameter.
///
/// **WHY THIS MATTERS**: Hosts match on the `missing parameter` prefix to show a
/// helpful message instead of a generic failure.
///
/// **BUG THIS CATCHES**: Would catch reordering of the presence checks or a changed prefix.
#[test]
fn given_missing_parameters_when_validating_then_first_missing_key_reported() {
    // GIVEN/WHEN/THEN: Each parameter missing in turn
    assert_eq!(
        callback_message(validate_callback(&params("code=c&iss=i"), STATE, ISSUER)),
        "missing parameter 'state'"
    );
    assert_eq!(
        callback_message(validate_callback(&params("state=s&iss=i"), STATE, ISSUER)),
        "missing parameter 'code'"
    );
    assert_eq!(
        callback_message(validate_callback(&params("state=s&code=c"), STATE, ISSUER)),
        "missing parameter 'iss'"
    );
}

#[test]
fn given_wrong_state_when_validating_then_state_mismatch_before_issuer_check() {
    // GIVEN: Both state and issuer are wrong
    let query = "state=other&code=c&iss=https%3A%2F%2Fevil.example%2F";

    // WHEN
    let message = callback_message(validate_callback(&params(query), STATE, ISSUER));

    // THEN: State is checked first
    assert!(message.starts_with("failed matching state"), "{message}");
}

#[test]
fn given_wrong_issuer_when_validating_then_issuer_mismatch() {
    let query = "state=expected-state&code=c&iss=https%3A%2F%2Fevil.example%2F";

    let message = callback_message(validate_callback(&params(query), STATE, ISSUER));

    assert!(message.starts_with("failed matching ISS"), "{message}");
}

#[test]
fn given_valid_redirect_when_validating_then_code_returned() {
    let query = "state=expected-state&code=the-code&iss=https%3A%2F%2Fvpn.example.org";

    let code = validate_callback(&params(query), STATE, ISSUER).unwrap();

    assert_eq!(code, "the-code");
}

#[test]
fn given_error_parameter_when_validating_then_authorization_error() {
    let result = validate_callback(&params("error=access_denied&state=s"), STATE, ISSUER);

    assert!(matches!(result, Err(OAuthError::Authorization { .. })));
}

/// **VALUE**: Exercises the real loopback listener: unrelated paths get 404 and the
/// wait continues until `/callback` arrives.
///
/// **WHY THIS MATTERS**: Browsers request `/favicon.ico` alongside the redirect. Treating
/// that as the callback would fail every authorization.
///
/// **BUG THIS CATCHES**: Would catch the listener returning on the first request.
#[tokio::test]
async fn given_listener_when_favicon_then_callback_requested_then_only_callback_resolves() {
    // GIVEN
    let listener = CallbackListener::bind().await.unwrap();
    let port = listener.port();
    assert_eq!(
        listener.redirect_uri(),
        format!("http://127.0.0.1:{port}/callback")
    );

    let waiter = tokio::spawn(listener.wait_for_callback(|params| {
        Ok::<_, OAuthError>(params.get("code").map(str::to_string))
    }));

    // WHEN
    let client = reqwest::Client::new();
    let favicon = client
        .get(format!("http://127.0.0.1:{port}/favicon.ico"))
        .send()
        .await
        .unwrap();
    let callback = client
        .get(format!("http://127.0.0.1:{port}/callback?code=xyz"))
        .send()
        .await
        .unwrap();

    // THEN
    assert_eq!(favicon.status().as_u16(), 404);
    assert_eq!(callback.status().as_u16(), 200);
    assert_eq!(waiter.await.unwrap().unwrap(), Some(String::from("xyz")));
}

#[tokio::test]
async fn given_cancel_before_wait_when_awaiting_cancelled_then_resolves_immediately() {
    let handle = CancelHandle::new();
    let clone = handle.clone();

    clone.cancel();

    tokio::time::timeout(std::time::Duration::from_secs(1), handle.cancelled())
        .await
        .unwrap();
    assert!(handle.is_cancelled());
}
