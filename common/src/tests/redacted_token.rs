use crate::RedactedToken;

/// **VALUE**: Verifies that token values never leak through `Debug` or `Display`.
///
/// **WHY THIS MATTERS**: Servers, token cells and errors are logged with `{:?}`. A leaked
/// refresh token in a log file is a long-lived credential in plain text.
///
/// **BUG THIS CATCHES**: Would catch a derived `Debug` replacing the manual impl.
#[test]
fn given_token_when_formatted_then_value_is_redacted() {
    // GIVEN: A token with a recognizable value
    let token = RedactedToken::new("super-secret-access");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{:?}", token);
    let display = format!("{}", token);

    // THEN: Neither output contains the secret
    assert!(!debug.contains("super-secret-access"));
    assert!(!display.contains("super-secret-access"));
    assert_eq!(token.expose(), "super-secret-access");
    assert_eq!(token.len(), 19);
}

#[test]
fn given_token_when_serialized_then_persists_raw_value() {
    // GIVEN: A token
    let token = RedactedToken::new("refresh-1");

    // WHEN: Serializing and reading it back
    let json = serde_json::to_string(&token).unwrap();
    let back: RedactedToken = serde_json::from_str(&json).unwrap();

    // THEN: The raw value survives persistence
    assert_eq!(json, "\"refresh-1\"");
    assert_eq!(back, token);
}
