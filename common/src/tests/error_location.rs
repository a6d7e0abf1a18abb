use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures the calling file and position.
///
/// **WHY THIS MATTERS**: Every error in the workspace carries an ErrorLocation. If it stops
/// pointing at the right place, diagnostics for OAuth and config failures lose their value.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` stops being propagated or the
/// file/line/column extraction breaks.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN/WHEN: Creating ErrorLocation from the current position
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture file, line, and column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert!(location.line > 0, "Should capture line number");
    assert!(location.column > 0, "Should capture column number");
}

#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting as string
    let formatted = format!("{}", location);

    // THEN: Should produce "[file:line:column]"
    assert!(formatted.starts_with('['));
    assert!(formatted.ends_with(']'));
    assert!(formatted.contains(&format!(":{}:", location.line)));
    assert_eq!(formatted.matches(':').count(), 2);
}

/// **VALUE**: `ErrorLocation::caller()` reports the line of the call, not its own body.
///
/// **BUG THIS CATCHES**: Would catch `#[track_caller]` being dropped from `caller()`,
/// which would make every location point into error_location.rs of the common crate.
#[test]
fn given_track_caller_when_capturing_caller_then_points_at_call_site() {
    // GIVEN/WHEN
    let expected_line = line!() + 1;
    let location = ErrorLocation::caller();

    // THEN
    assert_eq!(location.line, expected_line);
    assert!(location.file.contains("tests"), "{}", location.file);
}
