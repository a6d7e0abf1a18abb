use crate::oauth::pkce::{Pkce, challenge_for, generate_state};

/// **VALUE**: Checks the S256 challenge against the RFC 7636 appendix B example.
///
/// **WHY THIS MATTERS**: A wrong challenge makes every token exchange fail with
/// `invalid_grant`, which is hard to trace back to the encoding.
///
/// **BUG THIS CATCHES**: Would catch padding in the base64url output or hashing the wrong input.
#[test]
fn given_rfc_verifier_when_deriving_challenge_then_matches_reference() {
    // GIVEN: The verifier from RFC 7636 appendix B
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

    // WHEN
    let challenge = challenge_for(verifier);

    // THEN
    assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
}

#[test]
fn given_generated_pkce_when_inspected_then_verifier_is_43_url_safe_chars() {
    let pkce = Pkce::generate();

    assert_eq!(pkce.verifier().len(), 43);
    assert!(
        pkce.verifier()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
    assert_eq!(pkce.challenge(), challenge_for(pkce.verifier()));
    assert!(!format!("{pkce:?}").contains(pkce.verifier()));
}

#[test]
fn given_two_sessions_when_generating_material_then_values_differ() {
    assert_ne!(Pkce::generate().verifier(), Pkce::generate().verifier());
    assert_ne!(generate_state(), generate_state());
}
