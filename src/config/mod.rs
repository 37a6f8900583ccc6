//! Configuration management for pg-obfuscator.
//!
//! This module loads the application settings file (`pg-obfuscator.toml`).
//! The generated obfuscation document lives in [`crate::obfuscation`].
//!
//! # Overview
//!
//! The settings file supports:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PGOBF_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section on load
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [source]
//! connection_string = "${PGOBF_SOURCE_URL}"
//! schema = "public"
//!
//! [target]
//! connection_string = "postgresql://app@staging-db:5432/app"
//!
//! [pipeline]
//! concurrency = 4
//!
//! [delegate]
//! binary = "clickhouse-obfuscator"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DatabaseConfig, DelegateConfig, LoggingConfig, ObfuscatorConfig,
    PathsConfig, PipelineConfig, RetryConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
