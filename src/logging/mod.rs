//! Logging and observability
//!
//! Structured logging through `tracing`, plus a few macros that keep the
//! per-table pipeline events consistent.
//!
//! # Example
//!
//! ```no_run
//! use pg_obfuscator::logging::init_logging;
//! use pg_obfuscator::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(table = "users", "Exporting table");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a pipeline stage for one table
///
/// # Example
///
/// ```no_run
/// use pg_obfuscator::log_table_start;
///
/// log_table_start!("users", "export");
/// ```
#[macro_export]
macro_rules! log_table_start {
    ($table:expr, $stage:expr) => {
        tracing::info!(
            table = %$table,
            stage = %$stage,
            "Processing table"
        );
    };
}

/// Log the completion of a pipeline stage for one table
///
/// # Example
///
/// ```no_run
/// use pg_obfuscator::log_table_complete;
/// use std::time::Duration;
///
/// log_table_complete!("users", "merge", 1200, Duration::from_millis(850));
/// ```
#[macro_export]
macro_rules! log_table_complete {
    ($table:expr, $stage:expr, $rows:expr, $duration:expr) => {
        tracing::info!(
            table = %$table,
            stage = %$stage,
            rows = $rows,
            duration_ms = $duration.as_millis() as u64,
            "Table stage completed"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use pg_obfuscator::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, 2000u64, "Connection closed");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
