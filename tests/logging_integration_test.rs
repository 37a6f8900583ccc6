//! Integration tests for logging functionality

use pg_obfuscator::config::LoggingConfig;
use pg_obfuscator::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_level_is_rejected() {
    assert!(init_logging("verbose", &LoggingConfig::default()).is_err());
}

// The global subscriber can only be installed once per process, so the
// file layer is checked in a single test.
#[test]
fn test_file_logging_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().into_owned(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("debug", &config).unwrap();
    tracing::info!(table = "users", "Exporting table");
    drop(guard);

    assert!(log_path.exists());
    assert!(log_path.join("pg-obfuscator.log").exists());
}
