use crate::client_tests::helpers::{BrowserMode, MockVpn, Recorder, Script, register};

use vpn_core::ErrorKind;
use vpn_core::fsm::StateId;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(5);

async fn run_with_browser(mode: BrowserMode) -> (vpn_core::CoreError, StateId, Recorder) {
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let script = Script::approve(vpn.base_url()).with_browser_mode(mode);
    let client = register(temp_dir.path(), script, &recorder).await;
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    let error = client.get_config(&identity, false, None).await.unwrap_err();
    let state = client.current_state().await;
    assert!(client.token(&identity).await.unwrap().is_none());
    (error, state, recorder)
}

/// **VALUE**: Cancelling while the browser is open aborts the flow with a
/// cancellation error.
///
/// **WHY THIS MATTERS**: Users close the browser. The client must not keep a
/// listener open forever or report a scary protocol error.
///
/// **BUG THIS CATCHES**: Would catch the cancel handle not waking the listener,
/// or the failure being classified as anything but a cancellation.
#[tokio::test]
async fn given_oauth_started_when_cancelled_then_cancellation_error_and_no_server() {
    // GIVEN/WHEN
    let (error, state, recorder) = run_with_browser(BrowserMode::Cancel).await;

    // THEN
    assert_eq!(error.kind(), ErrorKind::Cancellation);
    assert!(error.is_cancellation());
    assert_eq!(state, StateId::NoServer);
    assert_eq!(recorder.errors()[0].kind, ErrorKind::Cancellation);
    assert_eq!(
        recorder.transitions().last(),
        Some(&(StateId::OAuthStarted, StateId::NoServer))
    );
}

/// **VALUE**: A redirect carrying someone else's state nonce is rejected.
///
/// **WHY THIS MATTERS**: The state nonce is the CSRF protection of the
/// authorization code flow.
///
/// **BUG THIS CATCHES**: Would catch the state check being skipped.
#[tokio::test]
async fn given_forged_state_when_redirected_then_state_mismatch() {
    let (error, state, _) = run_with_browser(BrowserMode::WrongState).await;

    assert_eq!(error.kind(), ErrorKind::Validation);
    assert!(error.message().starts_with("failed matching state"), "{error}");
    assert_eq!(state, StateId::NoServer);
}

#[tokio::test]
async fn given_foreign_issuer_when_redirected_then_issuer_mismatch() {
    let (error, _, _) = run_with_browser(BrowserMode::WrongIssuer).await;

    assert!(error.message().starts_with("failed matching ISS"), "{error}");
}

#[tokio::test]
async fn given_redirect_without_issuer_when_redirected_then_missing_parameter() {
    let (error, _, recorder) = run_with_browser(BrowserMode::MissingIssuer).await;

    assert_eq!(error.message(), "missing parameter 'iss'");
    assert_eq!(recorder.errors()[0].message, "missing parameter 'iss'");
}

#[tokio::test]
async fn given_no_pending_authorization_when_cancelling_then_false() {
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let client = register(temp_dir.path(), Script::approve("http://unused/"), &recorder).await;

    assert!(!client.cancel_oauth().await);
}

/// **VALUE**: While the browser is open, host getters answer and the host can
/// cancel through the client.
///
/// **WHY THIS MATTERS**: A UI keeps listing servers and showing the token state
/// while the user is logging in. If those calls wait for the login, the UI
/// freezes until the browser tab is closed.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The server stays locked for the whole authorization wait
/// - `Client::cancel_oauth` does not reach the pending listener
/// - Cancelling leaves the machine anywhere but `NoServer`
#[tokio::test]
async fn given_pending_authorization_when_host_queries_and_cancels_then_answers_and_no_server() {
    // GIVEN: A flow waiting on a browser that never redirects
    let vpn = MockVpn::start().await;
    vpn.mount_single_profile().await;
    let temp_dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let script = Script::approve(vpn.base_url()).with_browser_mode(BrowserMode::Stall);
    let client = Arc::new(register(temp_dir.path(), script, &recorder).await);
    let identity = client.add_custom_server(&vpn.server.uri()).await.unwrap();

    let flow = tokio::spawn({
        let client = Arc::clone(&client);
        let identity = identity.clone();
        async move { client.get_config(&identity, false, None).await }
    });
    timeout(WAIT, async {
        while client.current_state().await != StateId::OAuthStarted {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("authorization starts");

    // WHEN: The host reads state while the browser is open
    let servers = timeout(WAIT, client.servers()).await.expect("servers answers");
    let current = timeout(WAIT, client.current_server()).await.expect("current answers");
    let profiles = timeout(WAIT, client.profiles(&identity)).await.expect("profiles answers");
    let token = timeout(WAIT, client.token(&identity)).await.expect("token answers");

    // THEN
    assert_eq!(servers.len(), 1);
    assert_eq!(current.unwrap().identity, identity);
    assert!(profiles.unwrap().is_empty());
    assert!(token.unwrap().is_none());

    // WHEN: The host cancels
    assert!(client.cancel_oauth().await);
    let error = timeout(WAIT, flow)
        .await
        .expect("flow ends after cancel")
        .unwrap()
        .unwrap_err();

    // THEN
    assert_eq!(error.kind(), ErrorKind::Cancellation);
    assert_eq!(client.current_state().await, StateId::NoServer);
    assert_eq!(
        recorder.visited(),
        vec![
            StateId::NoServer,
            StateId::LoadingServer,
            StateId::ChosenServer,
            StateId::OAuthStarted,
            StateId::NoServer,
        ]
    );
    assert!(!client.cancel_oauth().await);
}
