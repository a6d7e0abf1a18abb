use crate::logger::{LOG_FILE_NAME, initialize, level_for};

use log::LevelFilter;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn given_debug_flag_when_choosing_level_then_debug_or_info() {
    assert_eq!(level_for(true), LevelFilter::Debug);
    assert_eq!(level_for(false), LevelFilter::Info);
}

/// **VALUE**: Verifies repeated initialization is harmless.
///
/// **WHY THIS MATTERS**: `register` initializes logging, and hosts may register,
/// deregister and register again in one process.
///
/// **BUG THIS CATCHES**: Would catch the second call surfacing fern's
/// "logger already set" failure.
#[test]
#[serial]
fn given_logger_initialized_when_initializing_again_then_ok_and_log_file_exists() {
    // GIVEN
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");

    // WHEN
    let first = initialize(&log_dir, true);
    let second = initialize(&log_dir, false);

    // THEN
    assert!(first.is_ok(), "{first:?}");
    assert!(second.is_ok(), "{second:?}");
    assert!(log_dir.join(LOG_FILE_NAME).exists());
}
